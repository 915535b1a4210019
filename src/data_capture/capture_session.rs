//! Bounded capture sessions.
//!
//! A [`CaptureSession`] opens one capture handle, reads frames until the
//! frame budget is spent or the handle runs dry, then pushes every retained
//! frame through the pipeline:
//!
//! ```text
//! frame ──▶ render ──▶ ignored site? ──▶ keyword? ──▶ build ──▶ dedup ──▶ batch
//! ```
//!
//! Everything runs synchronously on the calling thread; callers wanting to
//! keep an async context responsive run the session inside `spawn_blocking`.
//!
//! Minimal usage
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use keepwatch::configuration::types::CaptureConfig;
//! use keepwatch::data_capture::{CaptureSession, FieldExtractor, FindingBuilder, KeywordMatcher, PcapOpener};
//! use keepwatch::network::{InterfaceSelector, PcapInterfaceProvider};
//!
//! # fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = CaptureSession::new(
//!     CaptureConfig::default(),
//!     KeywordMatcher::new(vec!["bad".into()]),
//!     FindingBuilder::new(FieldExtractor::new()),
//!     Arc::new(PcapOpener),
//!     CancellationToken::new(),
//! );
//! let interface = InterfaceSelector::new(&PcapInterfaceProvider).select()?;
//! let batch = session.run(interface.as_ref())?;
//! println!("{} finding(s)", batch.len());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::dedup::DedupSet;
use super::finding_builder::FindingBuilder;
use super::frame_source::CaptureOpener;
use super::matcher::KeywordMatcher;
use super::renderer::render;
use super::types::{CapturedFrame, FrameRead};
use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::CaptureError;
use crate::network::types::NetworkInterface;
use crate::storage::storage_trait::Storage;
use crate::storage::types::Finding;

pub struct CaptureSession {
    /// Unique session identifier (used to correlate logs and persisted data).
    id: Uuid,
    settings: CaptureConfig,
    matcher: KeywordMatcher,
    builder: FindingBuilder,
    opener: Arc<dyn CaptureOpener>,
    /// Checked before every read; a cancelled session emits nothing.
    cancel: CancellationToken,
}

impl CaptureSession {
    pub fn new(
        settings: CaptureConfig,
        matcher: KeywordMatcher,
        builder: FindingBuilder,
        opener: Arc<dyn CaptureOpener>,
        cancel: CancellationToken,
    ) -> Self {
        let id = Uuid::new_v4();
        debug!("[{}] CaptureSession created", id);
        Self {
            id,
            settings,
            matcher,
            builder,
            opener,
            cancel,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Captures on `interface` and returns the deduplicated batch of findings.
    ///
    /// Without an interface nothing is opened and the batch is empty.
    ///
    /// Errors
    /// - [`CaptureError::HandleOpen`] / [`CaptureError::HandleRead`] when the
    ///   capture handle fails.
    /// - [`CaptureError::Cancelled`] when the token fired before the batch was
    ///   complete.
    pub fn run(&self, interface: Option<&NetworkInterface>) -> Result<Vec<Finding>, CaptureError> {
        let Some(interface) = interface else {
            warn!("[{}] No usable network interface, skipping capture", self.id);
            return Ok(Vec::new());
        };
        if self.matcher.is_empty() {
            debug!("[{}] Keyword set is empty, nothing can match", self.id);
        }

        let frames = self.capture_frames(interface)?;
        let captured = frames.len();
        let batch = self.process_frames(frames);

        if self.cancel.is_cancelled() {
            info!("[{}] Cancelled after processing, dropping batch", self.id);
            return Err(CaptureError::Cancelled);
        }
        info!(
            "[{}] Session complete: {} frame(s), {} distinct finding(s)",
            self.id,
            captured,
            batch.len()
        );
        Ok(batch)
    }

    /// Runs the session and hands the batch to `sink` in a single call.
    ///
    /// Returns the number of findings handed over. A sink failure ends the
    /// session with [`CaptureError::StorageError`]; nothing is retried.
    pub fn run_to_sink(
        &self,
        interface: Option<&NetworkInterface>,
        sink: &dyn Storage,
    ) -> Result<usize, CaptureError> {
        let batch = self.run(interface)?;
        sink.save_findings(self.id, &batch).map_err(|e| {
            error!("[{}] Unable to hand {} finding(s) to storage: {}", self.id, batch.len(), e);
            CaptureError::StorageError(e)
        })?;
        Ok(batch.len())
    }

    fn capture_frames(
        &self,
        interface: &NetworkInterface,
    ) -> Result<BTreeMap<u64, CapturedFrame>, CaptureError> {
        let mut source = self.opener.open(interface, &self.settings)?;
        info!(
            "[{}] Capturing up to {} frame(s) on {}",
            self.id, self.settings.max_frames, interface.name
        );

        let mut frames = BTreeMap::new();
        let mut next_sequence: u64 = 0;
        while frames.len() < self.settings.max_frames {
            if self.cancel.is_cancelled() {
                info!(
                    "[{}] Cancelled after {} frame(s), dropping capture",
                    self.id,
                    frames.len()
                );
                return Err(CaptureError::Cancelled);
            }
            match source.next_frame()? {
                FrameRead::Frame(raw) => {
                    let sequence = next_sequence;
                    next_sequence += 1;
                    frames.insert(
                        sequence,
                        CapturedFrame {
                            sequence,
                            captured_at: raw.timestamp,
                            data: raw.data,
                        },
                    );
                }
                FrameRead::Timeout => {
                    trace!("[{}] read timeout, still waiting", self.id);
                }
                FrameRead::EndOfCapture => {
                    debug!("[{}] capture handle reported end of capture", self.id);
                    break;
                }
            }
        }

        if self.cancel.is_cancelled() {
            return Err(CaptureError::Cancelled);
        }
        info!("[{}] Captured {} frame(s)", self.id, frames.len());
        Ok(frames)
    }

    /// Runs every frame through the pipeline in sequence order.
    fn process_frames(&self, frames: BTreeMap<u64, CapturedFrame>) -> Vec<Finding> {
        let mut dedup = DedupSet::new();
        for frame in frames.into_values() {
            if let Some(finding) = self.process_frame(&frame) {
                if !dedup.insert(finding) {
                    debug!("[{}] frame #{} duplicates an earlier finding", self.id, frame.sequence);
                }
            }
        }
        dedup.drain()
    }

    /// Render, filter and build a single frame. `None` means the frame
    /// contributes nothing to the batch.
    fn process_frame(&self, frame: &CapturedFrame) -> Option<Finding> {
        let Some(text) = render(frame) else {
            debug!("[{}] frame #{} has no renderable payload", self.id, frame.sequence);
            return None;
        };
        if self.matcher.is_ignored(&text) {
            debug!("[{}] frame #{} concerns an ignored site", self.id, frame.sequence);
            return None;
        }
        let keyword = self.matcher.first_match(&text)?;
        debug!(
            "[{}] frame #{} matched keyword {:?}",
            self.id, frame.sequence, keyword
        );
        self.builder.build(frame, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_capture::extractor::FieldExtractor;
    use crate::test_support::{frame, single_ethernet, MemStorage, ScriptedOpener};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session_with(
        keywords: &[&str],
        opener: Arc<ScriptedOpener>,
        max_frames: usize,
        cancel: CancellationToken,
    ) -> CaptureSession {
        let _ = env_logger::builder().is_test(true).try_init();
        let settings = CaptureConfig {
            max_frames,
            ..Default::default()
        };
        CaptureSession::new(
            settings,
            KeywordMatcher::new(keywords.iter().map(|k| k.to_string()).collect()),
            FindingBuilder::with_timezone(FieldExtractor::new(), "UTC".into()),
            opener,
            cancel,
        )
    }

    #[test]
    fn test_no_interface_means_no_capture() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![b"bad Host: x.com".to_vec()]));
        let session = session_with(&["bad"], opener.clone(), 2000, CancellationToken::new());

        let batch = session.run(None).unwrap();
        assert!(batch.is_empty());
        assert_eq!(opener.open_count(), 0);
    }

    #[test]
    fn test_only_matching_frames_produce_findings() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"...bad stuff Host: x.com...".to_vec(),
            b"...clean...".to_vec(),
        ]));
        let session = session_with(&["bad"], opener.clone(), 2000, CancellationToken::new());

        let batch = session.run(Some(&single_ethernet())).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].host, Some(b"x.com...".to_vec()));
        assert_eq!(opener.open_count(), 1);
    }

    #[test]
    fn test_clean_frame_with_headers_is_not_extracted() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"GET /news HTTP/1.1\r\nHost: clean.example\r\n\r\n".to_vec(),
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        assert!(session.run(Some(&single_ethernet())).unwrap().is_empty());
    }

    #[test]
    fn test_matching_frame_without_fields_is_dropped() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"a bad word in a chat message".to_vec(),
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        assert!(session.run(Some(&single_ethernet())).unwrap().is_empty());
    }

    #[test]
    fn test_identical_triples_collapse_to_one() {
        let request = b"GET /bad HTTP/1.1\r\nHost: x.com\r\nReferer: http://r\r\n\r\n".to_vec();
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            request.clone(),
            request.clone(),
            b"GET /other-bad HTTP/1.1\r\nHost: x.com\r\n\r\n".to_vec(),
            request,
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());

        let batch = session.run(Some(&single_ethernet())).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].request_path, Some(b"/bad".to_vec()));
        assert_eq!(batch[1].request_path, Some(b"/other-bad".to_vec()));
    }

    #[test]
    fn test_frames_sharing_a_timestamp_are_all_kept() {
        // every scripted frame carries the same timestamp
        let opener = Arc::new(ScriptedOpener::with_payloads(
            (0..5)
                .map(|i| format!("GET /bad/{} HTTP/1.1\r\n", i).into_bytes())
                .collect(),
        ));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());

        let batch = session.run(Some(&single_ethernet())).unwrap();
        let paths: Vec<_> = batch.iter().map(|f| f.request_path.clone().unwrap()).collect();
        assert_eq!(
            paths,
            (0..5).map(|i| format!("/bad/{}", i).into_bytes()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_paths_survive_raw_header_prefix() {
        // last TCP option byte renders as a letter right before GET
        let with_header = |path: &str| {
            let mut data = vec![0x45, 0x00, 0x01, 0x08, 0x0a, 0x3c, 0x9e, 0x4b];
            data.extend_from_slice(format!("GET {} HTTP/1.1\r\nHost: x.com\r\n\r\n", path).as_bytes());
            data
        };
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            with_header("/bad/one"),
            with_header("/bad/two"),
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());

        let batch = session.run(Some(&single_ethernet())).unwrap();
        let paths: Vec<_> = batch.iter().map(|f| f.request_path.clone()).collect();
        assert_eq!(
            paths,
            vec![Some(b"/bad/one".to_vec()), Some(b"/bad/two".to_vec())]
        );
    }

    #[test]
    fn test_stops_after_max_frames() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = reads.clone();
        let opener = Arc::new(ScriptedOpener::new(move || {
            let counter = counter.clone();
            Ok(crate::test_support::source(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Ok(frame(format!("GET /bad/{} HTTP/1.1\r\n", n % 3).as_bytes()))
            }))
        }));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());

        let batch = session.run(Some(&single_ethernet())).unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 2000);
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_timeouts_do_not_end_capture() {
        let opener = Arc::new(ScriptedOpener::with_reads(vec![
            FrameRead::Timeout,
            frame(b"GET /bad HTTP/1.1\r\n"),
            FrameRead::Timeout,
            FrameRead::Timeout,
            frame(b"GET /worse-bad HTTP/1.1\r\n"),
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        assert_eq!(session.run(Some(&single_ethernet())).unwrap().len(), 2);
    }

    #[test]
    fn test_open_failure_propagates() {
        let opener = Arc::new(ScriptedOpener::failing("eth0: permission denied"));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        let err = session.run(Some(&single_ethernet())).unwrap_err();
        assert!(matches!(err, CaptureError::HandleOpen(_)));
    }

    #[test]
    fn test_read_failure_propagates_without_batch() {
        let opener = Arc::new(ScriptedOpener::new(|| {
            let mut served = false;
            Ok(crate::test_support::source(move || {
                if served {
                    Err(CaptureError::HandleRead("device went away".into()))
                } else {
                    served = true;
                    Ok(frame(b"GET /bad HTTP/1.1\r\n"))
                }
            }))
        }));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        let err = session.run(Some(&single_ethernet())).unwrap_err();
        assert!(matches!(err, CaptureError::HandleRead(_)));
    }

    #[test]
    fn test_cancellation_emits_nothing() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let opener = Arc::new(ScriptedOpener::new(move || {
            let trigger = trigger.clone();
            let mut reads = 0;
            Ok(crate::test_support::source(move || {
                reads += 1;
                if reads == 3 {
                    trigger.cancel();
                    return Ok(FrameRead::Timeout);
                }
                Ok(frame(b"GET /bad HTTP/1.1\r\n"))
            }))
        }));
        let session = session_with(&["bad"], opener, 2000, cancel);
        let err = session.run(Some(&single_ethernet())).unwrap_err();
        assert!(matches!(err, CaptureError::Cancelled));
    }

    #[test]
    fn test_ignored_sites_are_skipped() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"GET /bad HTTP/1.1\r\nHost: intranet.local\r\n".to_vec(),
            b"GET /bad HTTP/1.1\r\nHost: x.com\r\n".to_vec(),
        ]));
        let mut session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        session.matcher = session
            .matcher
            .clone()
            .with_ignored_sites(vec!["intranet.local".into()]);

        let batch = session.run(Some(&single_ethernet())).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].host, Some(b"x.com".to_vec()));
    }

    #[test]
    fn test_empty_keyword_set_yields_empty_batch() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"GET /bad HTTP/1.1\r\nHost: x.com\r\n".to_vec(),
        ]));
        let session = session_with(&[], opener, 2000, CancellationToken::new());
        assert!(session.run(Some(&single_ethernet())).unwrap().is_empty());
    }

    #[test]
    fn test_batch_is_handed_to_sink_once() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"GET /bad HTTP/1.1\r\nHost: x.com\r\n".to_vec(),
            b"GET /bad HTTP/1.1\r\nHost: x.com\r\n".to_vec(),
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        let sink = MemStorage::new();

        let saved = session.run_to_sink(Some(&single_ethernet()), &sink).unwrap();
        assert_eq!(saved, 1);
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, session.id());
    }

    #[test]
    fn test_sink_failure_ends_session() {
        let opener = Arc::new(ScriptedOpener::with_payloads(vec![
            b"GET /bad HTTP/1.1\r\n".to_vec(),
        ]));
        let session = session_with(&["bad"], opener, 2000, CancellationToken::new());
        let err = session
            .run_to_sink(Some(&single_ethernet()), &MemStorage::failing())
            .unwrap_err();
        assert!(matches!(err, CaptureError::StorageError(_)));
    }
}
