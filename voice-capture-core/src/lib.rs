//! # voice-capture-core
//!
//! Records a voice engine's mixed playback audio to a stereo WAV file.
//!
//! The host engine delivers one [`AudioFrameBatch`] per playback quantum:
//! 16-bit samples at 48 kHz, any number of interleaved channels, each tagged
//! with a speaker bitmask. [`CaptureSession`] downmixes every batch to stereo
//! and appends it to a streaming WAV file whose header is finalized on stop.
//!
//! ## Architecture
//!
//! ```text
//! voice-capture-core (this crate)
//! ├── traits/       ← PlaybackSource, CaptureDelegate
//! ├── models/       ← AudioFrameBatch, CaptureError, CapturePhase, CaptureConfiguration, etc.
//! ├── processing/   ← speaker routing, FrameDownmixer, WAV header format
//! ├── session/      ← CaptureSession (idle/recording state machine)
//! └── storage/      ← WavFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_batch::AudioFrameBatch;
pub use models::audio_models::{AudioChannel, AudioTrack, AudioTrackType, CaptureSessionDiagnostics, SpeakerLayout};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::CapturePhase;
pub use processing::downmixer::FrameDownmixer;
pub use processing::speaker_router::{route, speaker, OutputMembership};
pub use processing::wav_format::WavHeader;
pub use session::capture_session::CaptureSession;
pub use storage::wav_writer::{FinalizedFile, WavFileWriter};
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::playback_source::{PlaybackCallback, PlaybackSource};
