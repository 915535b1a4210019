use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistable record of the metadata extracted from one matching frame.
///
/// Field values are kept as raw bytes so they survive storage byte-for-byte,
/// whatever the frame contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Capture time of the frame, milliseconds since the Unix epoch
    pub captured_at_epoch_millis: i64,
    /// Timezone of the monitored host at capture time (e.g. "Europe/Paris")
    pub timezone_id: String,
    /// Request target following the GET marker
    pub request_path: Option<Vec<u8>>,
    /// Value of the Host header
    pub host: Option<Vec<u8>>,
    /// Value of the Referer header
    pub referer: Option<Vec<u8>>,
}

/// The part of a [`Finding`] that identifies it for deduplication.
///
/// Capture time and timezone are deliberately left out: the same request
/// seen twice is one finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FindingKey {
    pub request_path: Option<Vec<u8>>,
    pub host: Option<Vec<u8>>,
    pub referer: Option<Vec<u8>>,
}

impl Finding {
    pub fn key(&self) -> FindingKey {
        FindingKey {
            request_path: self.request_path.clone(),
            host: self.host.clone(),
            referer: self.referer.clone(),
        }
    }

    /// A finding is worth storing only if at least one field was extracted.
    pub fn is_persistence_worthy(&self) -> bool {
        [&self.request_path, &self.host, &self.referer]
            .iter()
            .any(|field| field.as_ref().is_some_and(|v| !v.is_empty()))
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.captured_at_epoch_millis)
    }
}

/// Criteria used when reviewing stored findings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingFilter {
    /// Keep findings captured at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Keep findings captured at or before this instant
    pub until: Option<DateTime<Utc>>,
    /// Keep findings whose Host value equals this string
    pub host: Option<String>,
}
