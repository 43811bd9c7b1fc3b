//! # voice-capture-host
//!
//! Host-side pieces for driving `voice-capture-core` outside a voice client:
//!
//! - `SyntheticPlaybackEngine`: a `PlaybackSource` that renders multi-channel
//!   test tones on a real-time style thread, one quantum per callback
//! - `commands`: the console command set (record toggle, status, quit)
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use voice_capture_core::{CaptureConfiguration, CaptureSession, PlaybackSource, SpeakerLayout};
//! use voice_capture_host::SyntheticPlaybackEngine;
//!
//! let session = Arc::new(CaptureSession::new(CaptureConfiguration::default())?);
//! let mut engine = SyntheticPlaybackEngine::new(SpeakerLayout::Surround71, 220.0, Duration::from_millis(10));
//! engine.start(session.playback_callback())?;
//! session.toggle()?;
//! ```

pub mod commands;
pub mod error;
pub mod synthetic_engine;

pub use commands::{Command, Flow};
pub use error::HostError;
pub use synthetic_engine::{SyntheticPlaybackEngine, ToneGenerator};
