//! WAV file format utilities.
//!
//! Builds and parses the 44-byte RIFF/WAVE header used for capture files.

use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Capture output format: 48 kHz, 16-bit, stereo linear PCM.
pub const CAPTURE_SAMPLE_RATE: u32 = 48_000;
pub const CAPTURE_BITS_PER_SAMPLE: u16 = 16;
pub const CAPTURE_CHANNELS: u16 = 2;
pub const BYTES_PER_SAMPLE: usize = CAPTURE_BITS_PER_SAMPLE as usize / 8;

const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// In-memory form of the WAV header.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    riff_length = 44 + data_length - 8
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
/// [32-33]  block_align = channels * bits_per_sample / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_length
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_length: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_length: u32,
}

impl WavHeader {
    /// Placeholder header written when a capture file is opened.
    ///
    /// Both length fields are zero until the writer finalizes the file.
    pub fn capture_placeholder() -> Self {
        Self {
            riff_length: 0,
            channels: CAPTURE_CHANNELS,
            sample_rate: CAPTURE_SAMPLE_RATE,
            bits_per_sample: CAPTURE_BITS_PER_SAMPLE,
            data_length: 0,
        }
    }

    /// Final header for a capture holding `data_length` bytes of audio.
    pub fn capture_finalized(data_length: u32) -> Self {
        Self {
            riff_length: riff_length_for(data_length),
            data_length,
            ..Self::capture_placeholder()
        }
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 / 8
    }

    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Whether the declared RIFF length matches the declared data length.
    pub fn is_consistent(&self) -> bool {
        self.riff_length == riff_length_for(self.data_length)
    }

    pub fn to_bytes(&self) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        // RIFF chunk descriptor
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_length.to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        // fmt sub-chunk
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        header[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        // data sub-chunk
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_length.to_le_bytes());

        header
    }

    /// Parse a header previously produced by [`WavHeader::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(CaptureError::StorageError(format!(
                "wav header too short: {} bytes",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(CaptureError::StorageError("not a RIFF/WAVE file".into()));
        }
        if &bytes[12..16] != b"fmt " || &bytes[36..40] != b"data" {
            return Err(CaptureError::StorageError("unexpected wav chunk layout".into()));
        }
        if read_u16(bytes, 20) != PCM_FORMAT_TAG {
            return Err(CaptureError::StorageError("wav file is not linear PCM".into()));
        }

        Ok(Self {
            riff_length: read_u32(bytes, 4),
            channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            bits_per_sample: read_u16(bytes, 34),
            data_length: read_u32(bytes, 40),
        })
    }
}

/// RIFF chunk size for a file carrying `data_length` audio bytes
/// (total file size minus the 8-byte RIFF preamble).
pub fn riff_length_for(data_length: u32) -> u32 {
    (WAV_HEADER_SIZE as u32 - 8).saturating_add(data_length)
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}
