use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CapturePhase;

/// Event delegate for capture session notifications.
///
/// Phase changes and finished recordings are reported from the control
/// thread. `on_error` may also fire on the host audio thread when a write
/// fails mid-stream, so implementations must return quickly and not block.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session moves between idle and recording.
    fn on_phase_changed(&self, phase: CapturePhase);

    /// Called when an operation fails.
    fn on_error(&self, error: &CaptureError);

    /// Called when a recording is stopped and its file finalized.
    fn on_capture_finished(&self, result: &RecordingResult);
}
