use thiserror::Error;

use voice_capture_core::CaptureError;

/// Errors surfaced by the console recorder.
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("console input failed: {0}")]
    Console(#[from] std::io::Error),
}
