use serde::{Deserialize, Serialize};

use crate::processing::speaker_router::speaker;

/// Type of audio captured into a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTrackType {
    Playback,
}

/// Channel placement of a track in the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioChannel {
    #[serde(rename = "L")]
    Left,
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "LR")]
    Stereo,
}

/// An audio track in a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    #[serde(rename = "type")]
    pub track_type: AudioTrackType,
    pub channel: AudioChannel,
}

/// Common host speaker layouts, in the channel order the engine delivers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeakerLayout {
    Mono,
    Stereo,
    Quad,
    Surround51,
    Surround71,
}

impl SpeakerLayout {
    /// Per-channel speaker masks for this layout.
    pub fn channel_masks(&self) -> &'static [u32] {
        use speaker::*;
        match self {
            Self::Mono => &[FRONT_CENTER],
            Self::Stereo => &[FRONT_LEFT, FRONT_RIGHT],
            Self::Quad => &[FRONT_LEFT, FRONT_RIGHT, BACK_LEFT, BACK_RIGHT],
            Self::Surround51 => &[
                FRONT_LEFT,
                FRONT_RIGHT,
                FRONT_CENTER,
                LOW_FREQUENCY,
                BACK_LEFT,
                BACK_RIGHT,
            ],
            Self::Surround71 => &[
                FRONT_LEFT,
                FRONT_RIGHT,
                FRONT_CENTER,
                LOW_FREQUENCY,
                BACK_LEFT,
                BACK_RIGHT,
                SIDE_LEFT,
                SIDE_RIGHT,
            ],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_masks().len()
    }
}

/// Counters for debugging a capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureSessionDiagnostics {
    /// Every callback, in any phase.
    pub batches_received: u64,
    /// Batches downmixed and accepted by a successful file write.
    pub batches_recorded: u64,
    /// Empty batches, or batches arriving while a start/stop held the writer.
    pub batches_skipped: u64,
    /// Batches lost to allocation or write failures.
    pub batches_dropped: u64,
    /// Stereo frames and audio bytes from successful writes only.
    pub frames_written: u64,
    pub bytes_written: u64,
}
