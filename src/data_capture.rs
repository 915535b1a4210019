//! Live capture and frame analysis.
//!
//! Components:
//! - `frame_source`: capture handle traits and the libpcap implementation.
//! - `capture_session`: one bounded capture followed by batch processing.
//! - `renderer`, `matcher`, `extractor`: turn a frame into text, test it
//!   against the keyword set and pull out request metadata.
//! - `finding_builder`, `dedup`: assemble findings and collapse repeats.

pub mod capture_session;
pub mod dedup;
pub mod extractor;
pub mod finding_builder;
pub mod frame_source;
pub mod matcher;
pub mod renderer;
pub mod types;

pub use capture_session::CaptureSession;
pub use dedup::DedupSet;
pub use extractor::FieldExtractor;
pub use finding_builder::{local_timezone_id, FindingBuilder};
pub use frame_source::{CaptureOpener, FrameSource, PcapOpener};
pub use matcher::KeywordMatcher;
pub use types::{CapturedFrame, ExtractedFields, FrameRead, RawFrame};
