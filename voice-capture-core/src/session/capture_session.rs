use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_batch::AudioFrameBatch;
use crate::models::audio_models::CaptureSessionDiagnostics;
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::CapturePhase;
use crate::processing::downmixer::{FrameDownmixer, OUTPUT_CHANNELS};
use crate::processing::wav_format::{BYTES_PER_SAMPLE, CAPTURE_SAMPLE_RATE};
use crate::storage::metadata;
use crate::storage::wav_writer::{self, WavFileWriter};
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::playback_source::PlaybackCallback;

/// Writer and downmix scratch, handed between the control and audio threads.
struct Recorder {
    writer: Option<WavFileWriter>,
    downmixer: FrameDownmixer,
}

#[derive(Default)]
struct Counters {
    batches_received: AtomicU64,
    batches_recorded: AtomicU64,
    batches_skipped: AtomicU64,
    batches_dropped: AtomicU64,
    frames_written: AtomicU64,
    bytes_written: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CaptureSessionDiagnostics {
        CaptureSessionDiagnostics {
            batches_received: self.batches_received.load(Ordering::Relaxed),
            batches_recorded: self.batches_recorded.load(Ordering::Relaxed),
            batches_skipped: self.batches_skipped.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            frames_written: self.frames_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// Records the host engine's playback mix to a stereo WAV file.
///
/// Two phases, idle and recording. The control thread drives
/// [`request_start`](Self::request_start) / [`request_stop`](Self::request_stop);
/// the host audio thread calls [`on_audio_batch`](Self::on_audio_batch) every
/// quantum regardless of phase.
///
/// ```text
/// [host engine] ─batch─▶ on_audio_batch ─▶ [FrameDownmixer] ─stereo─▶ [WavFileWriter]
///                             ▲
/// [control] ── start/stop ────┘ (atomic phase + writer handoff)
/// ```
///
/// The phase is an atomic flag, so idle batches never touch a lock. The
/// writer sits behind a mutex that the audio thread only ever `try_lock`s:
/// a batch arriving while a start or stop holds the writer is skipped rather
/// than blocking the callback. Stop swaps the writer out under that lock, so
/// a writer is never finalized while a batch is mid-append.
pub struct CaptureSession {
    config: CaptureConfiguration,
    recording: AtomicBool,
    recorder: Mutex<Recorder>,
    counters: Counters,
    last_error: Mutex<Option<CaptureError>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,
}

impl CaptureSession {
    pub fn new(config: CaptureConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let downmixer = FrameDownmixer::with_limit(config.max_batch_frames, config.max_scratch_frames);
        log::debug!(
            "Capture session created (output {}, scratch {} frames)",
            config.output_path.display(),
            downmixer.capacity_frames()
        );

        Ok(Self {
            config,
            recording: AtomicBool::new(false),
            recorder: Mutex::new(Recorder {
                writer: None,
                downmixer,
            }),
            counters: Counters::default(),
            last_error: Mutex::new(None),
            delegate: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &CaptureConfiguration {
        &self.config
    }

    pub fn phase(&self) -> CapturePhase {
        CapturePhase::from_flag(self.recording.load(Ordering::Acquire))
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        self.counters.snapshot()
    }

    /// Most recent failure, if any operation has failed.
    pub fn last_error(&self) -> Option<CaptureError> {
        self.last_error.lock().clone()
    }

    /// Callback to hand to a [`PlaybackSource`](crate::PlaybackSource).
    pub fn playback_callback(self: &Arc<Self>) -> PlaybackCallback {
        let session = Arc::clone(self);
        let callback: PlaybackCallback = Arc::new(move |batch: &AudioFrameBatch<'_>| session.on_audio_batch(batch));
        callback
    }

    /// Start recording. Idempotent: a no-op while already recording.
    ///
    /// The output file is created (or truncated) and its placeholder header
    /// written before the session turns to recording. If the file cannot be
    /// opened the session stays idle.
    pub fn request_start(&self) -> Result<(), CaptureError> {
        {
            let mut recorder = self.recorder.lock();
            if recorder.writer.is_some() {
                log::debug!("Start requested while already recording");
                return Ok(());
            }

            match WavFileWriter::open(&self.config.output_path) {
                Ok(writer) => {
                    recorder.writer = Some(writer);
                    self.recording.store(true, Ordering::Release);
                }
                Err(e) => {
                    drop(recorder);
                    log::error!("Failed to start recording: {}", e);
                    self.report_error(&e);
                    return Err(e);
                }
            }
        }

        log::info!("Started recording to {}", self.config.output_path.display());
        self.notify_phase(CapturePhase::Recording);
        Ok(())
    }

    /// Stop recording and finalize the file. Idempotent: returns `Ok(None)`
    /// while idle.
    ///
    /// The session is idle once this returns, even if finalizing fails.
    pub fn request_stop(&self) -> Result<Option<RecordingResult>, CaptureError> {
        let writer = {
            let mut recorder = self.recorder.lock();
            self.recording.store(false, Ordering::Release);
            recorder.writer.take()
        };
        let Some(writer) = writer else {
            return Ok(None);
        };

        self.notify_phase(CapturePhase::Idle);
        match self.finish(writer) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                log::error!("Failed to finalize recording: {}", e);
                self.report_error(&e);
                Err(e)
            }
        }
    }

    /// The user-facing record command: start when idle, stop when recording.
    /// Returns the phase after the command.
    pub fn toggle(&self) -> Result<CapturePhase, CaptureError> {
        if self.phase().is_recording() {
            self.request_stop()?;
        } else {
            self.request_start()?;
        }
        Ok(self.phase())
    }

    /// Finalize any open recording. Called automatically on drop.
    pub fn shutdown(&self) {
        match self.request_stop() {
            Ok(Some(result)) => log::info!("Recording finalized at shutdown: {}", result.file_path.display()),
            Ok(None) => {}
            Err(e) => log::error!("Failed to finalize recording at shutdown: {}", e),
        }
    }

    /// Hot path, invoked by the host engine once per playback quantum.
    ///
    /// Never blocks and never propagates errors. A write failure stops the
    /// recording (the file is finalized best-effort) and is reported through
    /// the log, [`last_error`](Self::last_error) and the delegate.
    pub fn on_audio_batch(&self, batch: &AudioFrameBatch<'_>) {
        Counters::bump(&self.counters.batches_received, 1);

        if !self.recording.load(Ordering::Acquire) {
            return;
        }
        if batch.is_empty() {
            Counters::bump(&self.counters.batches_skipped, 1);
            return;
        }

        let Some(mut recorder) = self.recorder.try_lock() else {
            log::trace!("Writer busy with start/stop, skipping batch");
            Counters::bump(&self.counters.batches_skipped, 1);
            return;
        };
        let Recorder { writer, downmixer } = &mut *recorder;
        let Some(active) = writer.as_mut() else {
            // Stopped between the flag check and the lock.
            Counters::bump(&self.counters.batches_skipped, 1);
            return;
        };

        let stereo = match downmixer.downmix(batch) {
            Ok(stereo) => stereo,
            Err(e) => {
                Counters::bump(&self.counters.batches_dropped, 1);
                log::warn!("Dropping batch of {} frames: {}", batch.sample_count(), e);
                self.report_error(&e);
                return;
            }
        };

        // TODO: hand stereo frames to a writer thread over a bounded SPSC queue
        // instead of doing file I/O on the audio thread.
        match active.append_frames(stereo) {
            Ok(()) => {
                let frames = stereo.len() / OUTPUT_CHANNELS;
                Counters::bump(&self.counters.batches_recorded, 1);
                Counters::bump(&self.counters.frames_written, frames as u64);
                Counters::bump(
                    &self.counters.bytes_written,
                    (frames * OUTPUT_CHANNELS * BYTES_PER_SAMPLE) as u64,
                );
            }
            Err(e @ CaptureError::AllocationFailed(_)) => {
                Counters::bump(&self.counters.batches_dropped, 1);
                log::warn!("Dropping batch of {} frames: {}", batch.sample_count(), e);
                self.report_error(&e);
            }
            Err(e) => {
                Counters::bump(&self.counters.batches_dropped, 1);
                log::error!(
                    "Capture write to {} failed, stopping recording: {}",
                    active.file_path().display(),
                    e
                );
                let failed = writer.take();
                self.recording.store(false, Ordering::Release);
                drop(recorder);

                self.report_error(&e);
                self.notify_phase(CapturePhase::Idle);

                if let Some(failed) = failed {
                    if let Err(close_err) = failed.close() {
                        log::error!("Interrupted recording left unfinalized: {}", close_err);
                    }
                }
            }
        }
    }

    // --- Internal helpers ---

    fn finish(&self, writer: WavFileWriter) -> Result<RecordingResult, CaptureError> {
        let finalized = writer.close()?;
        let checksum = wav_writer::sha256_file(&finalized.file_path)?;
        let frames = finalized.frames();
        let duration_secs = frames as f64 / CAPTURE_SAMPLE_RATE as f64;

        let metadata = RecordingMetadata::new_playback(
            duration_secs,
            &finalized.file_path.to_string_lossy(),
            finalized.data_length(),
            &checksum,
        );
        if self.config.write_metadata {
            metadata::write_metadata(&metadata, &finalized.file_path)?;
        }

        let result = RecordingResult {
            file_path: finalized.file_path.clone(),
            data_bytes: finalized.data_length(),
            frames,
            duration_secs,
            checksum,
            metadata,
        };

        log::info!(
            "Stopped recording: {} ({:.2}s, {} bytes)",
            result.file_path.display(),
            result.duration_secs,
            result.data_bytes
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_finished(&result);
        }
        Ok(result)
    }

    /// Never blocks: the audio thread reports through here too.
    fn report_error(&self, error: &CaptureError) {
        match self.last_error.try_lock() {
            Some(mut last) => *last = Some(error.clone()),
            None => log::trace!("Error slot busy, not recording: {}", error),
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    fn notify_phase(&self, phase: CapturePhase) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_phase_changed(phase);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use crate::processing::speaker_router::speaker::*;
    use crate::processing::wav_format::WavHeader;

    #[derive(Default)]
    struct RecordingDelegate {
        events: Mutex<Vec<String>>,
    }

    impl CaptureDelegate for RecordingDelegate {
        fn on_phase_changed(&self, phase: CapturePhase) {
            self.events.lock().push(format!("phase:{}", phase));
        }

        fn on_error(&self, _error: &CaptureError) {
            self.events.lock().push("error".into());
        }

        fn on_capture_finished(&self, result: &RecordingResult) {
            self.events.lock().push(format!("finished:{}", result.data_bytes));
        }
    }

    fn temp_file_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("voice_capture_session_test_{}_{}", std::process::id(), name))
    }

    fn session_for(name: &str) -> (CaptureSession, PathBuf) {
        let path = temp_file_path(name);
        let config = CaptureConfiguration {
            output_path: path.clone(),
            max_batch_frames: 8,
            max_scratch_frames: 8,
            write_metadata: false,
        };
        (CaptureSession::new(config).unwrap(), path)
    }

    fn stereo_batch<'a>(samples: &'a [i16], speakers: &'a [u32]) -> AudioFrameBatch<'a> {
        AudioFrameBatch::new(samples, samples.len() / speakers.len(), speakers.len(), speakers, 0b11).unwrap()
    }

    fn header_of(path: &PathBuf) -> WavHeader {
        WavHeader::from_bytes(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn starts_idle_and_ignores_batches() {
        let (session, path) = session_for("idle.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.on_audio_batch(&stereo_batch(&[1, 2, 3, 4], &speakers));

        assert!(session.phase().is_idle());
        assert!(!path.exists());
        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.batches_received, 1);
        assert_eq!(diagnostics.batches_recorded, 0);
    }

    #[test]
    fn records_batches_between_start_and_stop() {
        let (session, path) = session_for("record.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        assert!(session.phase().is_recording());
        session.on_audio_batch(&stereo_batch(&[1, 2, 3, 4], &speakers));
        session.on_audio_batch(&stereo_batch(&[5, 6], &speakers));

        let result = session.request_stop().unwrap().unwrap();
        assert!(session.phase().is_idle());
        assert_eq!(result.frames, 3);
        assert_eq!(result.data_bytes, 12);
        assert_eq!(result.checksum.len(), 64);

        let header = header_of(&path);
        assert_eq!(header.data_length, 12);
        assert!(header.is_consistent());
        assert_eq!(fs::metadata(&path).unwrap().len(), 44 + 12);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn empty_batches_never_reach_the_writer() {
        let (session, path) = session_for("empty.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        session.on_audio_batch(&AudioFrameBatch::empty());
        session.on_audio_batch(&AudioFrameBatch::new(&[], 0, 2, &speakers, 0b11).unwrap());

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.batches_skipped, 2);
        assert_eq!(diagnostics.bytes_written, 0);

        let result = session.request_stop().unwrap().unwrap();
        assert_eq!(result.data_bytes, 0);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (session, path) = session_for("idempotent.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&[1, 2], &speakers));
        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&[3, 4], &speakers));

        // Second start did not truncate the file.
        let result = session.request_stop().unwrap().unwrap();
        assert_eq!(result.frames, 2);

        assert!(session.request_stop().unwrap().is_none());
        assert!(session.phase().is_idle());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn restart_creates_fresh_file() {
        let (session, path) = session_for("restart.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&[1, 2, 3, 4, 5, 6], &speakers));
        session.request_stop().unwrap();
        assert_eq!(header_of(&path).data_length, 12);

        session.request_start().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 44);
        session.on_audio_batch(&stereo_batch(&[7, 8], &speakers));
        let result = session.request_stop().unwrap().unwrap();

        assert_eq!(result.data_bytes, 4);
        assert_eq!(header_of(&path).data_length, 4);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn toggle_alternates_phases() {
        let (session, path) = session_for("toggle.wav");

        assert_eq!(session.toggle().unwrap(), CapturePhase::Recording);
        assert_eq!(session.toggle().unwrap(), CapturePhase::Idle);
        assert!(header_of(&path).is_consistent());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn failed_open_stays_idle() {
        let blocker = temp_file_path("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let config = CaptureConfiguration {
            output_path: blocker.join("capture.wav"),
            max_batch_frames: 8,
            max_scratch_frames: 8,
            write_metadata: false,
        };
        let delegate = Arc::new(RecordingDelegate::default());
        let mut session = CaptureSession::new(config).unwrap();
        session.set_delegate(delegate.clone());

        let err = session.request_start().unwrap_err();

        assert!(matches!(err, CaptureError::FileOpen(_)));
        assert!(session.phase().is_idle());
        assert_eq!(session.last_error(), Some(err));
        assert_eq!(*delegate.events.lock(), vec!["error".to_string()]);

        fs::remove_file(&blocker).ok();
    }

    #[test]
    fn delegate_sees_lifecycle() {
        let (mut session, path) = session_for("delegate.wav");
        let delegate = Arc::new(RecordingDelegate::default());
        session.set_delegate(delegate.clone());
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&[1, 2], &speakers));
        session.request_stop().unwrap();

        assert_eq!(
            *delegate.events.lock(),
            vec![
                "phase:recording".to_string(),
                "phase:idle".to_string(),
                "finished:4".to_string(),
            ]
        );

        fs::remove_file(&path).ok();
    }

    #[test]
    fn drop_finalizes_open_recording() {
        let (session, path) = session_for("drop.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&[1, 2, 3, 4], &speakers));
        drop(session);

        let header = header_of(&path);
        assert_eq!(header.data_length, 8);
        assert!(header.is_consistent());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn writes_metadata_sidecar_when_enabled() {
        let path = temp_file_path("sidecar.wav");
        let session = CaptureSession::new(CaptureConfiguration::new(&path)).unwrap();

        session.request_start().unwrap();
        let result = session.request_stop().unwrap().unwrap();

        let loaded = metadata::read_metadata(&path).unwrap();
        assert_eq!(loaded, result.metadata);
        assert_eq!(loaded.checksum, result.checksum);

        fs::remove_file(metadata::metadata_path(&path)).ok();
        fs::remove_file(&path).ok();
    }

    #[test]
    fn write_failure_moves_session_to_idle() {
        let (mut session, path) = session_for("write_failure.wav");
        let delegate = Arc::new(RecordingDelegate::default());
        session.set_delegate(delegate.clone());
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        // Swap in a handle the OS refuses to write through.
        let read_only = fs::File::open(&path).unwrap();
        session.recorder.lock().writer = Some(WavFileWriter::from_file(path.clone(), read_only));

        session.on_audio_batch(&stereo_batch(&[1, 2, 3, 4], &speakers));

        assert!(session.phase().is_idle());
        assert!(matches!(session.last_error(), Some(CaptureError::FileWrite(_))));
        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.batches_dropped, 1);
        assert_eq!(diagnostics.batches_recorded, 0);
        assert_eq!(diagnostics.bytes_written, 0);
        assert_eq!(
            *delegate.events.lock(),
            vec![
                "phase:recording".to_string(),
                "error".to_string(),
                "phase:idle".to_string(),
            ]
        );

        // Later batches are ignored and there is nothing left to stop.
        session.on_audio_batch(&stereo_batch(&[5, 6], &speakers));
        assert_eq!(session.diagnostics().batches_dropped, 1);
        assert!(session.request_stop().unwrap().is_none());
        assert_eq!(fs::metadata(&path).unwrap().len(), 44);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn oversized_batch_is_dropped_and_recording_continues() {
        let (session, path) = session_for("oversized.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];
        let oversized: Vec<i16> = vec![100; 2 * 16];

        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&oversized, &speakers));

        assert!(session.phase().is_recording());
        assert!(matches!(session.last_error(), Some(CaptureError::AllocationFailed(_))));
        assert_eq!(session.diagnostics().batches_dropped, 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), 44);

        session.on_audio_batch(&stereo_batch(&[7, 8], &speakers));
        let result = session.request_stop().unwrap().unwrap();

        assert_eq!(result.data_bytes, 4);
        let samples = fs::read(&path).unwrap()[44..].to_vec();
        assert_eq!(samples, [7i16.to_le_bytes(), 8i16.to_le_bytes()].concat());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn counters_track_bytes_on_disk() {
        let (session, path) = session_for("counters.wav");
        let speakers = [FRONT_LEFT, FRONT_RIGHT];

        session.request_start().unwrap();
        session.on_audio_batch(&stereo_batch(&[1, 2, 3, 4, 5, 6], &speakers));

        let on_disk = fs::metadata(&path).unwrap().len() - 44;
        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.bytes_written, on_disk);
        assert_eq!(diagnostics.frames_written, 3);

        session.request_stop().unwrap();
        fs::remove_file(&path).ok();
    }

    #[test]
    fn rejects_invalid_configuration() {
        let config = CaptureConfiguration {
            max_batch_frames: 0,
            ..Default::default()
        };
        assert!(matches!(
            CaptureSession::new(config),
            Err(CaptureError::ConfigurationFailed(_))
        ));
    }
}
