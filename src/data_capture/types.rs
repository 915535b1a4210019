//! Common data types used across the data_capture subsystem.

use chrono::{DateTime, Utc};

/// One frame as delivered by a capture handle, before the session numbers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Captured bytes (at most the configured snapshot length)
    pub data: Vec<u8>,
    /// Capture timestamp reported by the handle
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one read attempt on a capture handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameRead {
    /// A frame was captured.
    Frame(RawFrame),
    /// The read timeout elapsed without traffic; the handle is still usable.
    Timeout,
    /// The handle has nothing more to deliver.
    EndOfCapture,
}

/// A frame retained by a capture session.
///
/// Frames are identified by `sequence`, never by timestamp: several frames
/// routinely share a timestamp at capture resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Position of the frame within its session, starting at 0
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub data: Vec<u8>,
}

/// The three values pulled out of a rendered frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub request_path: Option<String>,
    pub host: Option<String>,
    pub referer: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.request_path.is_none() && self.host.is_none() && self.referer.is_none()
    }
}
