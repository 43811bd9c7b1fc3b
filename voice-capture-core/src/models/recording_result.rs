use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::{AudioChannel, AudioTrack, AudioTrackType};
use crate::processing::wav_format::{CAPTURE_BITS_PER_SAMPLE, CAPTURE_SAMPLE_RATE};

/// Result returned when a recording is stopped and its file finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub data_bytes: u32,
    pub frames: u64,
    pub duration_secs: f64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside a recording as a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub data_bytes: u32,
    pub checksum: String,
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub tracks: Vec<AudioTrack>,
}

impl RecordingMetadata {
    /// Metadata for a stereo downmix of the host playback mix.
    pub fn new_playback(duration_secs: f64, file_path: &str, data_bytes: u32, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            file_path: file_path.to_string(),
            duration_secs,
            data_bytes,
            checksum: checksum.to_string(),
            sample_rate: CAPTURE_SAMPLE_RATE,
            bit_depth: CAPTURE_BITS_PER_SAMPLE,
            tracks: vec![AudioTrack {
                track_type: AudioTrackType::Playback,
                channel: AudioChannel::Stereo,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_metadata_describes_stereo_capture() {
        let metadata = RecordingMetadata::new_playback(1.5, "out.wav", 288_000, "abc");

        assert_eq!(metadata.sample_rate, 48000);
        assert_eq!(metadata.bit_depth, 16);
        assert_eq!(metadata.tracks.len(), 1);
        assert_eq!(metadata.tracks[0].channel, AudioChannel::Stereo);
        assert!(uuid::Uuid::parse_str(&metadata.id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&metadata.created_at).is_ok());
    }
}
