//! Synthetic playback engine.
//!
//! Stands in for the voice engine's mixer: a dedicated thread renders one
//! quantum of multi-channel 48 kHz audio at a time and hands it to the
//! playback callback, the same way the engine invokes its mixed-playback
//! hook. Subwoofer channels are left undefined (fill bit clear), as the
//! engine does when it has no low-frequency content.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use voice_capture_core::models::error::CaptureError;
use voice_capture_core::processing::wav_format::CAPTURE_SAMPLE_RATE;
use voice_capture_core::speaker::LOW_FREQUENCY;
use voice_capture_core::traits::playback_source::{PlaybackCallback, PlaybackSource};
use voice_capture_core::{AudioFrameBatch, SpeakerLayout};

/// Peak amplitude of the rendered tones.
const TONE_AMPLITUDE: f32 = 8000.0;

/// Renders per-channel sine tones for a speaker layout.
///
/// Channel `n` plays `base_hz * (n + 1)` so each speaker is distinguishable
/// in the downmix.
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    layout: SpeakerLayout,
    base_hz: f32,
    phases: Vec<f32>,
}

impl ToneGenerator {
    pub fn new(layout: SpeakerLayout, base_hz: f32) -> Self {
        Self {
            layout,
            base_hz,
            phases: vec![0.0; layout.channel_count()],
        }
    }

    pub fn layout(&self) -> SpeakerLayout {
        self.layout
    }

    /// Fill mask for the layout: every channel except subwoofers.
    pub fn fill_mask(&self) -> u32 {
        self.layout
            .channel_masks()
            .iter()
            .enumerate()
            .filter(|&(_, &mask)| mask & LOW_FREQUENCY == 0)
            .fold(0, |acc, (channel, _)| acc | (1 << channel))
    }

    /// Render `frames` sample periods into `out` (resized to fit) and return
    /// the fill mask. Unfilled channels are written as zero.
    pub fn render(&mut self, frames: usize, out: &mut Vec<i16>) -> u32 {
        let masks = self.layout.channel_masks();
        let channels = masks.len();
        let fill_mask = self.fill_mask();
        out.clear();
        out.resize(frames * channels, 0);

        for (channel, phase) in self.phases.iter_mut().enumerate() {
            if fill_mask & (1 << channel) == 0 {
                continue;
            }
            let step = TAU * self.base_hz * (channel + 1) as f32 / CAPTURE_SAMPLE_RATE as f32;
            for frame in 0..frames {
                out[frame * channels + channel] = (phase.sin() * TONE_AMPLITUDE) as i16;
                *phase = (*phase + step) % TAU;
            }
        }
        fill_mask
    }
}

/// Playback source backed by a [`ToneGenerator`] on a dedicated thread.
pub struct SyntheticPlaybackEngine {
    generator: ToneGenerator,
    quantum: Duration,
    running: Arc<AtomicBool>,
    render_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl SyntheticPlaybackEngine {
    pub fn new(layout: SpeakerLayout, base_hz: f32, quantum: Duration) -> Self {
        Self {
            generator: ToneGenerator::new(layout, base_hz),
            quantum,
            running: Arc::new(AtomicBool::new(false)),
            render_handle: Mutex::new(None),
        }
    }

    /// Sample periods per quantum.
    pub fn quantum_frames(&self) -> usize {
        (CAPTURE_SAMPLE_RATE as u128 * self.quantum.as_micros() / 1_000_000) as usize
    }
}

impl PlaybackSource for SyntheticPlaybackEngine {
    fn is_available(&self) -> bool {
        self.quantum_frames() > 0
    }

    fn start(&mut self, callback: PlaybackCallback) -> Result<(), CaptureError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(CaptureError::SourceFailed("synthetic engine already running".into()));
        }
        if !self.is_available() {
            return Err(CaptureError::SourceFailed(format!(
                "quantum of {:?} holds no samples",
                self.quantum
            )));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let mut generator = self.generator.clone();
        let quantum = self.quantum;
        let frames = self.quantum_frames();

        let handle = thread::Builder::new()
            .name("synthetic-playback".into())
            .spawn(move || {
                render_loop(&running, &mut generator, frames, quantum, &callback);
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| CaptureError::SourceFailed(format!("failed to spawn playback thread: {}", e)))?;

        *self.render_handle.lock() = Some(handle);
        log::info!("Synthetic playback started ({:?}, {} frames per quantum)", self.generator.layout(), frames);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.render_handle.lock().take() {
            handle
                .join()
                .map_err(|_| CaptureError::SourceFailed("playback thread panicked".into()))?;
            log::info!("Synthetic playback stopped");
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!(
            "synthetic {:?} playback, {} ms quantum",
            self.generator.layout(),
            self.quantum.as_millis()
        )
    }
}

impl Drop for SyntheticPlaybackEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Failed to stop synthetic playback: {}", e);
        }
    }
}

/// Render and deliver quanta on a fixed schedule until `running` clears.
fn render_loop(
    running: &AtomicBool,
    generator: &mut ToneGenerator,
    frames: usize,
    quantum: Duration,
    callback: &PlaybackCallback,
) {
    let speakers = generator.layout().channel_masks();
    let mut samples = Vec::with_capacity(frames * speakers.len());
    let mut deadline = Instant::now();

    while running.load(Ordering::SeqCst) {
        let fill_mask = generator.render(frames, &mut samples);
        match AudioFrameBatch::new(&samples, frames, speakers.len(), speakers, fill_mask) {
            Ok(batch) => callback(&batch),
            Err(e) => {
                log::error!("Synthetic engine produced a malformed batch: {}", e);
                break;
            }
        }

        deadline += quantum;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            // Fell behind; resync instead of bursting.
            deadline = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn subwoofer_is_left_unfilled() {
        let generator = ToneGenerator::new(SpeakerLayout::Surround51, 220.0);
        // FL FR FC LFE BL BR
        assert_eq!(generator.fill_mask(), 0b11_0111);

        let stereo = ToneGenerator::new(SpeakerLayout::Stereo, 220.0);
        assert_eq!(stereo.fill_mask(), 0b11);
    }

    #[test]
    fn render_produces_interleaved_quantum() {
        let mut generator = ToneGenerator::new(SpeakerLayout::Surround71, 220.0);
        let mut samples = Vec::new();

        let fill_mask = generator.render(480, &mut samples);

        assert_eq!(samples.len(), 480 * 8);
        assert_eq!(fill_mask & (1 << 3), 0);
        // LFE channel stays zero, others carry signal.
        assert!(samples.chunks_exact(8).all(|frame| frame[3] == 0));
        assert!(samples.chunks_exact(8).any(|frame| frame[0] != 0));
        assert!(samples.iter().all(|s| s.unsigned_abs() <= TONE_AMPLITUDE as u16));
    }

    #[test]
    fn phase_is_continuous_across_quanta() {
        let mut split = ToneGenerator::new(SpeakerLayout::Mono, 440.0);
        let mut whole = ToneGenerator::new(SpeakerLayout::Mono, 440.0);
        let (mut a, mut b, mut c) = (Vec::new(), Vec::new(), Vec::new());

        split.render(100, &mut a);
        split.render(100, &mut b);
        whole.render(200, &mut c);

        a.extend_from_slice(&b);
        let max_diff = a.iter().zip(&c).map(|(x, y)| (*x as i32 - *y as i32).abs()).max().unwrap();
        assert!(max_diff <= 1);
    }

    #[test]
    fn quantum_frames_at_48khz() {
        let engine = SyntheticPlaybackEngine::new(SpeakerLayout::Stereo, 220.0, Duration::from_millis(10));
        assert_eq!(engine.quantum_frames(), 480);

        let empty = SyntheticPlaybackEngine::new(SpeakerLayout::Stereo, 220.0, Duration::ZERO);
        assert!(!empty.is_available());
    }

    #[test]
    fn delivers_batches_until_stopped() {
        let mut engine = SyntheticPlaybackEngine::new(SpeakerLayout::Quad, 220.0, Duration::from_millis(2));
        let delivered = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&delivered);
        let callback: PlaybackCallback = Arc::new(move |batch: &AudioFrameBatch<'_>| {
            assert_eq!(batch.channel_count(), 4);
            assert_eq!(batch.sample_count(), 96);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.start(callback.clone()).unwrap();
        assert!(engine.start(callback).is_err());
        thread::sleep(Duration::from_millis(30));
        engine.stop().unwrap();

        let after_stop = delivered.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(delivered.load(Ordering::SeqCst), after_stop);
    }
}
