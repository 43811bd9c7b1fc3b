use super::error::CaptureError;

/// One quantum of mixed playback audio handed over by the host engine.
///
/// Borrowed for the duration of a single callback. Samples are 16-bit signed
/// at 48 kHz, interleaved by channel within each sample period:
/// `[c0 t0, c1 t0, ..., cN t0, c0 t1, ...]`.
#[derive(Debug, Clone, Copy)]
pub struct AudioFrameBatch<'a> {
    samples: &'a [i16],
    sample_count: usize,
    channel_count: usize,
    channel_speakers: &'a [u32],
    channel_fill_mask: u32,
}

impl<'a> AudioFrameBatch<'a> {
    /// Build a batch, checking that the buffers match the declared shape.
    ///
    /// Bit `i` of `channel_fill_mask` marks channel `i` as carrying valid data.
    /// Channels with an index of 32 or above cannot be flagged and are treated
    /// as unfilled.
    pub fn new(
        samples: &'a [i16],
        sample_count: usize,
        channel_count: usize,
        channel_speakers: &'a [u32],
        channel_fill_mask: u32,
    ) -> Result<Self, CaptureError> {
        let expected = sample_count.checked_mul(channel_count).ok_or_else(|| {
            CaptureError::InvalidBatch(format!(
                "{} samples x {} channels overflows",
                sample_count, channel_count
            ))
        })?;
        if samples.len() != expected {
            return Err(CaptureError::InvalidBatch(format!(
                "expected {} samples ({} x {}), got {}",
                expected,
                sample_count,
                channel_count,
                samples.len()
            )));
        }
        if channel_speakers.len() != channel_count {
            return Err(CaptureError::InvalidBatch(format!(
                "expected {} speaker masks, got {}",
                channel_count,
                channel_speakers.len()
            )));
        }
        Ok(Self {
            samples,
            sample_count,
            channel_count,
            channel_speakers,
            channel_fill_mask,
        })
    }

    /// A batch with no audio, as delivered when playback is idle.
    pub fn empty() -> Self {
        Self {
            samples: &[],
            sample_count: 0,
            channel_count: 0,
            channel_speakers: &[],
            channel_fill_mask: 0,
        }
    }

    pub fn samples(&self) -> &'a [i16] {
        self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn channel_speakers(&self) -> &'a [u32] {
        self.channel_speakers
    }

    pub fn channel_fill_mask(&self) -> u32 {
        self.channel_fill_mask
    }

    /// True when the batch carries no audio and must not reach the writer.
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0 || self.channel_count == 0
    }

    /// Whether channel `channel` holds defined data this batch.
    pub fn is_channel_filled(&self, channel: usize) -> bool {
        channel < u32::BITS as usize && self.channel_fill_mask & (1 << channel) != 0
    }

    /// Sample of `channel` at sample period `frame`.
    pub fn sample(&self, frame: usize, channel: usize) -> i16 {
        self.samples[frame * self.channel_count + channel]
    }
}
