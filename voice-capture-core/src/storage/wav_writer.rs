use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::error::CaptureError;
use crate::processing::downmixer::OUTPUT_CHANNELS;
use crate::processing::wav_format::{WavHeader, BYTES_PER_SAMPLE, WAV_HEADER_SIZE};

/// Streaming stereo WAV writer.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [interleaved 16-bit LE stereo PCM...]
/// ```
///
/// The header is written with zero lengths on open and rewritten in place by
/// [`close`](Self::close). A writer dropped without `close` leaves the
/// placeholder header on disk.
///
/// Each append is encoded into a reusable byte buffer and handed to the OS
/// in one write, so `data_length` only counts bytes the file accepted.
pub struct WavFileWriter {
    file_path: PathBuf,
    file: File,
    encoded: Vec<u8>,
    data_length: u32,
}

/// Outcome of finalizing a capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedFile {
    pub file_path: PathBuf,
    pub header: WavHeader,
}

impl FinalizedFile {
    pub fn data_length(&self) -> u32 {
        self.header.data_length
    }

    pub fn frames(&self) -> u64 {
        (self.header.data_length as usize / (OUTPUT_CHANNELS * BYTES_PER_SAMPLE)) as u64
    }
}

impl WavFileWriter {
    /// Create (or truncate) `file_path` and write the placeholder header.
    ///
    /// The header is on disk when this returns.
    pub fn open(file_path: impl Into<PathBuf>) -> Result<Self, CaptureError> {
        let file_path = file_path.into();

        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::FileOpen(format!("failed to create directory {}: {}", parent.display(), e))
            })?;
        }

        let mut file = File::create(&file_path)
            .map_err(|e| CaptureError::FileOpen(format!("{}: {}", file_path.display(), e)))?;

        file.write_all(&WavHeader::capture_placeholder().to_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| CaptureError::FileOpen(format!("{}: header write failed: {}", file_path.display(), e)))?;

        log::debug!("Opened capture file {}", file_path.display());
        Ok(Self::from_file(file_path, file))
    }

    pub(crate) fn from_file(file_path: PathBuf, file: File) -> Self {
        Self {
            file_path,
            file,
            encoded: Vec::new(),
            data_length: 0,
        }
    }

    /// Append interleaved stereo samples `[L0, R0, L1, R1, ...]`.
    ///
    /// A trailing half frame is ignored. Appends that would push the data
    /// chunk past the 32-bit RIFF size limit are rejected before writing.
    /// A failed write truncates the file back to the last complete append,
    /// keeping it consistent with `data_length`.
    pub fn append_frames(&mut self, stereo: &[i16]) -> Result<(), CaptureError> {
        let frames = stereo.len() / OUTPUT_CHANNELS;
        if frames == 0 {
            return Ok(());
        }
        let stereo = &stereo[..frames * OUTPUT_CHANNELS];
        let byte_len = stereo.len() * BYTES_PER_SAMPLE;

        let new_length = u32::try_from(byte_len)
            .ok()
            .and_then(|bytes| self.data_length.checked_add(bytes))
            .filter(|&len| len <= u32::MAX - WAV_HEADER_SIZE as u32)
            .ok_or_else(|| CaptureError::FileWrite("data chunk would exceed the 4 GiB WAV limit".into()))?;

        self.encoded.clear();
        self.encoded
            .try_reserve(byte_len)
            .map_err(|e| CaptureError::AllocationFailed(format!("{} byte write buffer: {}", byte_len, e)))?;
        for sample in stereo {
            self.encoded.extend_from_slice(&sample.to_le_bytes());
        }

        if let Err(e) = self.file.write_all(&self.encoded) {
            self.discard_partial_write();
            return Err(CaptureError::FileWrite(format!("write failed: {}", e)));
        }
        self.data_length = new_length;
        Ok(())
    }

    /// Finalize the header with the real lengths and release the file.
    pub fn close(mut self) -> Result<FinalizedFile, CaptureError> {
        let header = WavHeader::capture_finalized(self.data_length);

        self.rewrite_header(&header)
            .map_err(|e| CaptureError::FileWrite(format!("{}: header finalize failed: {}", self.file_path.display(), e)))?;

        log::debug!(
            "Finalized capture file {} ({} data bytes)",
            self.file_path.display(),
            header.data_length
        );
        Ok(FinalizedFile {
            file_path: self.file_path,
            header,
        })
    }

    /// Audio bytes appended so far (excluding the header).
    pub fn data_length(&self) -> u32 {
        self.data_length
    }

    pub fn frames_written(&self) -> u64 {
        (self.data_length as usize / (OUTPUT_CHANNELS * BYTES_PER_SAMPLE)) as u64
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn rewrite_header(&mut self, header: &WavHeader) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()
    }

    fn discard_partial_write(&mut self) {
        let end = WAV_HEADER_SIZE as u64 + self.data_length as u64;
        let restored = self
            .file
            .set_len(end)
            .and_then(|()| self.file.seek(SeekFrom::Start(end)).map(|_| ()));
        if let Err(e) = restored {
            log::warn!(
                "Could not trim partial write from {}, file is not finalizable: {}",
                self.file_path.display(),
                e
            );
        }
    }
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path)
        .map_err(|e| CaptureError::StorageError(format!("failed to open file for checksum: {}", e)))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
