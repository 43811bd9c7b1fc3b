use std::sync::Arc;

use crate::models::audio_batch::AudioFrameBatch;
use crate::models::error::CaptureError;

/// Callback invoked by the host engine once per playback quantum.
///
/// Runs on the engine's real-time thread: no blocking, no unbounded work.
pub type PlaybackCallback = Arc<dyn Fn(&AudioFrameBatch<'_>) + Send + Sync + 'static>;

/// Host audio engine delivering mixed playback audio.
///
/// Implemented by the voice engine integration (or a synthetic engine in
/// the host crate); the capture session only ever sees the callback.
pub trait PlaybackSource: Send {
    /// Whether the source can currently deliver audio.
    fn is_available(&self) -> bool;

    /// Start delivering batches to `callback`.
    fn start(&mut self, callback: PlaybackCallback) -> Result<(), CaptureError>;

    /// Stop delivering batches. No callback runs after this returns.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Human-readable description of the source.
    fn description(&self) -> String;
}
