use thiserror::Error;

/// Errors that can occur while capturing playback audio to disk.
///
/// Payloads are rendered strings so the error stays `Clone` and can be
/// stored as the session's last error and handed to delegates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("failed to open capture file: {0}")]
    FileOpen(String),

    #[error("failed to write capture file: {0}")]
    FileWrite(String),

    #[error("downmix buffer allocation failed: {0}")]
    AllocationFailed(String),

    #[error("invalid audio batch: {0}")]
    InvalidBatch(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("playback source failed: {0}")]
    SourceFailed(String),
}
