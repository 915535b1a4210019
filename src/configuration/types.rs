use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_SNAPSHOT_LEN: i32 = 65536;
pub const DEFAULT_READ_TIMEOUT_MS: i32 = 5000;
pub const DEFAULT_MAX_FRAMES: usize = 2000;

/// Live capture settings consumed by the capture session.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Name of the interface to capture on. When absent, the first interface
    /// with a non-loopback IPv4 address is used.
    pub interface: Option<String>,
    /// Maximum number of bytes kept per frame
    pub snapshot_len: i32,
    pub promiscuous: bool,
    /// Maximum blocking time of a single read, in milliseconds
    pub read_timeout_ms: i32,
    /// Number of frames after which a session stops capturing and processes
    pub max_frames: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: None,
            snapshot_len: DEFAULT_SNAPSHOT_LEN,
            promiscuous: false,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Run sessions back to back until shutdown instead of a single one
    pub continuous: bool,
    /// Pause between two sessions
    pub pause_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            continuous: true,
            pause_secs: 0,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    File,
    Database,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Base directory for the file backend, SQLite file for the database backend
    pub path: PathBuf,
}
