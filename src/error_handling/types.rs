use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
    DirectoryDoesNotExist(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum StorageError {
    ConnectionFailed,
    WriteFailed,
    ReadFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed => write!(f, "Storage connection failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
            StorageError::ReadFailed => write!(f, "Storage read failed"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Session-level failures of the capture pipeline.
///
/// Per-frame problems (undecodable payload, missing fields) never show up
/// here; they only mean "no finding for this frame".
#[derive(Debug)]
pub enum CaptureError {
    /// Interfaces could not be listed (usually missing capture privileges).
    InterfaceEnumeration(String),
    /// The live capture handle could not be opened on the interface.
    HandleOpen(String),
    /// Reading from an open capture handle failed.
    HandleRead(String),
    /// The session was cancelled from outside; no batch was emitted.
    Cancelled,
    /// The batch could not be handed to the storage backend.
    StorageError(StorageError),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::InterfaceEnumeration(e) => {
                write!(f, "Network interface enumeration failed: {}", e)
            }
            CaptureError::HandleOpen(e) => write!(f, "Unable to open capture handle: {}", e),
            CaptureError::HandleRead(e) => write!(f, "Capture handle read error: {}", e),
            CaptureError::Cancelled => write!(f, "Capture session cancelled"),
            CaptureError::StorageError(e) => write!(f, "Capture storage error: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    CaptureError(CaptureError),
    StorageError(StorageError),
    TaskFailed(String),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::CaptureError(e) => write!(f, "Capture error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::TaskFailed(e) => write!(f, "Background task failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<CaptureError> for ControllerError {
    fn from(err: CaptureError) -> Self {
        ControllerError::CaptureError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}
