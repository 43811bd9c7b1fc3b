//! Multi-channel to stereo downmix of host playback batches.
//!
//! Each output side is the truncated mean of the filled input channels routed
//! to it (see [`speaker_router`](super::speaker_router)), clipped to 16 bits.
//! A side with no contributors is silent.

use crate::models::audio_batch::AudioFrameBatch;
use crate::models::error::CaptureError;

use super::speaker_router;

/// Output is always interleaved stereo `[L0, R0, L1, R1, ...]`.
pub const OUTPUT_CHANNELS: usize = 2;

/// Only channels addressable by the 32-bit fill mask can contribute.
const MAX_ROUTED_CHANNELS: usize = u32::BITS as usize;

/// Downmixer owning a reusable stereo scratch buffer.
///
/// The buffer is sized up front for the largest expected batch so the audio
/// callback does not allocate in the steady state. Growth past `limit_frames`
/// is refused.
#[derive(Debug)]
pub struct FrameDownmixer {
    scratch: Vec<i16>,
    limit_frames: usize,
}

impl FrameDownmixer {
    /// Downmixer that may grow without bound.
    pub fn with_capacity(max_frames: usize) -> Self {
        Self::with_limit(max_frames, usize::MAX)
    }

    /// Downmixer pre-sized to `max_frames` that never grows past `limit_frames`.
    pub fn with_limit(max_frames: usize, limit_frames: usize) -> Self {
        Self {
            scratch: vec![0; max_frames * OUTPUT_CHANNELS],
            limit_frames: limit_frames.max(max_frames),
        }
    }

    /// Number of stereo frames the scratch buffer holds without growing.
    pub fn capacity_frames(&self) -> usize {
        self.scratch.len() / OUTPUT_CHANNELS
    }

    /// Downmix `batch` into the scratch buffer and return the stereo frames.
    ///
    /// Returns an empty slice for an empty batch. A batch larger than the
    /// current capacity grows the buffer with a fallible reservation; if that
    /// fails, or the batch exceeds the growth limit, the batch is rejected with
    /// `AllocationFailed`.
    pub fn downmix(&mut self, batch: &AudioFrameBatch<'_>) -> Result<&[i16], CaptureError> {
        if batch.is_empty() {
            return Ok(&[]);
        }

        let needed = batch
            .sample_count()
            .checked_mul(OUTPUT_CHANNELS)
            .ok_or_else(|| CaptureError::AllocationFailed(format!("{} frames overflows", batch.sample_count())))?;

        if batch.sample_count() > self.limit_frames {
            return Err(CaptureError::AllocationFailed(format!(
                "{} frames exceeds the {} frame downmix limit",
                batch.sample_count(),
                self.limit_frames
            )));
        }

        if needed > self.scratch.len() {
            let additional = needed - self.scratch.len();
            self.scratch
                .try_reserve_exact(additional)
                .map_err(|e| CaptureError::AllocationFailed(format!("{} frames: {}", batch.sample_count(), e)))?;
            self.scratch.resize(needed, 0);
            log::debug!("Downmix buffer grown to {} frames", batch.sample_count());
        }

        let out = &mut self.scratch[..needed];
        downmix_into(batch, out);
        Ok(out)
    }
}

/// Downmix `batch` into `out` (interleaved stereo) and return the number of
/// frames produced.
///
/// At most `out.len() / 2` frames are written. Channels whose fill bit is
/// clear are never read.
pub fn downmix_into(batch: &AudioFrameBatch<'_>, out: &mut [i16]) -> usize {
    if batch.is_empty() {
        return 0;
    }
    let frames = batch.sample_count().min(out.len() / OUTPUT_CHANNELS);
    let out = &mut out[..frames * OUTPUT_CHANNELS];

    // Layout is stable within a batch: classify channels once.
    let routed_channels = batch.channel_count().min(MAX_ROUTED_CHANNELS);
    let mut left_channels: u32 = 0;
    let mut right_channels: u32 = 0;
    for (channel, &mask) in batch.channel_speakers()[..routed_channels].iter().enumerate() {
        if !batch.is_channel_filled(channel) {
            continue;
        }
        let membership = speaker_router::route(mask);
        if membership.left {
            left_channels |= 1 << channel;
        }
        if membership.right {
            right_channels |= 1 << channel;
        }
    }

    let left_count = left_channels.count_ones() as i32;
    let right_count = right_channels.count_ones() as i32;
    if left_count == 0 && right_count == 0 {
        out.fill(0);
        return frames;
    }

    for (frame, stereo) in out.chunks_exact_mut(OUTPUT_CHANNELS).enumerate() {
        let mut left_sum: i32 = 0;
        let mut right_sum: i32 = 0;
        for channel in 0..routed_channels {
            let bit = 1u32 << channel;
            if (left_channels | right_channels) & bit == 0 {
                continue;
            }
            let sample = batch.sample(frame, channel) as i32;
            if left_channels & bit != 0 {
                left_sum += sample;
            }
            if right_channels & bit != 0 {
                right_sum += sample;
            }
        }
        stereo[0] = average_and_clip(left_sum, left_count);
        stereo[1] = average_and_clip(right_sum, right_count);
    }

    frames
}

/// Mean of `count` contributors truncated toward zero and saturated to 16 bits.
/// No contributors means silence.
#[inline]
pub(crate) fn average_and_clip(sum: i32, count: i32) -> i16 {
    if count == 0 {
        return 0;
    }
    saturate(sum / count)
}

#[inline]
fn saturate(value: i32) -> i16 {
    if value >= i16::MAX as i32 {
        i16::MAX
    } else if value <= i16::MIN as i32 {
        i16::MIN
    } else {
        value as i16
    }
}
