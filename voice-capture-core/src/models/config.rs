use std::path::PathBuf;

use crate::processing::wav_format::CAPTURE_SAMPLE_RATE;

/// Default file name used when no output path is configured.
pub const DEFAULT_OUTPUT_FILE: &str = "recordedvoices.wav";

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Destination WAV file. Truncated every time recording starts.
    pub output_path: PathBuf,

    /// Largest batch (in sample periods) the host engine is expected to deliver.
    /// The downmix scratch buffer is pre-sized to this so the audio thread does
    /// not allocate in the steady state (default: 100 ms at 48 kHz).
    pub max_batch_frames: usize,

    /// Ceiling on downmix scratch growth. Batches longer than this are
    /// dropped as an allocation failure (default: 1 s at 48 kHz).
    pub max_scratch_frames: usize,

    /// Write a `<file>.metadata.json` sidecar when a recording is finalized.
    pub write_metadata: bool,
}

impl CaptureConfiguration {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.output_path.as_os_str().is_empty() {
            return Err("output path must not be empty".into());
        }
        if self.max_batch_frames == 0 {
            return Err("max batch frames must be positive".into());
        }
        if self.max_scratch_frames < self.max_batch_frames {
            return Err("max scratch frames must be at least max batch frames".into());
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            max_batch_frames: CAPTURE_SAMPLE_RATE as usize / 10,
            max_scratch_frames: CAPTURE_SAMPLE_RATE as usize,
            write_metadata: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = CaptureConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_batch_frames, 4800);
        assert_eq!(config.max_scratch_frames, 48_000);
        assert_eq!(config.output_path, PathBuf::from("recordedvoices.wav"));
    }

    #[test]
    fn rejects_empty_path() {
        let config = CaptureConfiguration::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch_frames() {
        let config = CaptureConfiguration {
            max_batch_frames: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err("max batch frames must be positive".to_string())
        );
    }

    #[test]
    fn rejects_scratch_limit_below_batch_size() {
        let config = CaptureConfiguration {
            max_batch_frames: 480,
            max_scratch_frames: 240,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
