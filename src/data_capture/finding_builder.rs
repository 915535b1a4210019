use chrono::Local;
use log::debug;

use super::extractor::FieldExtractor;
use super::types::CapturedFrame;
use crate::storage::types::Finding;

/// Turns a keyword-matching frame into a [`Finding`].
///
/// The builder stamps every finding with the timezone of the monitored host,
/// resolved once when the builder is created.
#[derive(Debug, Clone)]
pub struct FindingBuilder {
    extractor: FieldExtractor,
    timezone_id: String,
}

impl FindingBuilder {
    pub fn new(extractor: FieldExtractor) -> Self {
        Self::with_timezone(extractor, local_timezone_id())
    }

    pub fn with_timezone(extractor: FieldExtractor, timezone_id: String) -> Self {
        Self {
            extractor,
            timezone_id,
        }
    }

    pub fn timezone_id(&self) -> &str {
        &self.timezone_id
    }

    /// Builds the finding for `frame` from its rendered `text`.
    ///
    /// Returns `None` when none of the three fields could be extracted: such a
    /// frame matched a keyword but carries nothing worth reviewing.
    pub fn build(&self, frame: &CapturedFrame, text: &str) -> Option<Finding> {
        let fields = self.extractor.extract(text);
        let finding = Finding {
            captured_at_epoch_millis: frame.captured_at.timestamp_millis(),
            timezone_id: self.timezone_id.clone(),
            request_path: fields.request_path.map(String::into_bytes),
            host: fields.host.map(String::into_bytes),
            referer: fields.referer.map(String::into_bytes),
        };

        if !finding.is_persistence_worthy() {
            debug!(
                "frame #{} matched but has no request path, host or referer",
                frame.sequence
            );
            return None;
        }
        Some(finding)
    }
}

/// IANA name of the local timezone, or its current UTC offset when the
/// system does not expose a name.
pub fn local_timezone_id() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|e| {
        debug!("Local timezone name unavailable ({}), using UTC offset", e);
        Local::now().offset().to_string()
    })
}
