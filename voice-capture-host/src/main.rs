use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use voice_capture_core::{CaptureConfiguration, CaptureSession, PlaybackSource, SpeakerLayout};
use voice_capture_host::commands::{self, Command, Flow};
use voice_capture_host::{HostError, SyntheticPlaybackEngine};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayoutArg {
    Mono,
    Stereo,
    Quad,
    #[value(name = "5.1")]
    Surround51,
    #[value(name = "7.1")]
    Surround71,
}

impl From<LayoutArg> for SpeakerLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Mono => Self::Mono,
            LayoutArg::Stereo => Self::Stereo,
            LayoutArg::Quad => Self::Quad,
            LayoutArg::Surround51 => Self::Surround51,
            LayoutArg::Surround71 => Self::Surround71,
        }
    }
}

/// Record a synthetic voice playback mix to a stereo WAV file.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Destination WAV file (truncated on every record start).
    #[arg(short, long, default_value = "recordedvoices.wav")]
    output: PathBuf,

    /// Speaker layout rendered by the synthetic engine.
    #[arg(short, long, value_enum, default_value_t = LayoutArg::Surround71)]
    layout: LayoutArg,

    /// Playback quantum in milliseconds.
    #[arg(long, default_value_t = 10)]
    quantum_ms: u64,

    /// Base tone frequency in Hz; channel n plays base * (n + 1).
    #[arg(long, default_value_t = 220.0)]
    tone_hz: f32,

    /// Skip the `.metadata.json` sidecar.
    #[arg(long)]
    no_metadata: bool,

    /// Record for this many seconds and exit instead of reading commands.
    #[arg(long)]
    record_secs: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), HostError> {
    let quantum = Duration::from_millis(args.quantum_ms);
    let mut engine = SyntheticPlaybackEngine::new(args.layout.into(), args.tone_hz, quantum);

    let defaults = CaptureConfiguration::default();
    let quantum_frames = engine.quantum_frames().max(1);
    let config = CaptureConfiguration {
        output_path: args.output,
        max_batch_frames: quantum_frames,
        max_scratch_frames: defaults.max_scratch_frames.max(quantum_frames),
        write_metadata: !args.no_metadata,
    };
    let session = Arc::new(CaptureSession::new(config)?);

    log::info!("Playback source: {}", engine.description());
    engine.start(session.playback_callback())?;

    let outcome = match args.record_secs {
        Some(secs) => record_for(&session, Duration::from_secs(secs)),
        None => console_loop(&session),
    };

    // Engine first, so no batch is in flight when the recording is finalized.
    engine.stop()?;
    session.shutdown();
    outcome
}

fn record_for(session: &CaptureSession, duration: Duration) -> Result<(), HostError> {
    session.request_start()?;
    thread::sleep(duration);
    if let Some(result) = session.request_stop()? {
        println!(
            "Recorded {:.2}s to {} (sha256 {})",
            result.duration_secs,
            result.file_path.display(),
            result.checksum
        );
    }
    println!("{}", commands::status_line(session));
    Ok(())
}

fn console_loop(session: &CaptureSession) -> Result<(), HostError> {
    println!("{}", commands::HELP);
    for line in io::stdin().lock().lines() {
        let line = line?;
        let Some(command) = Command::parse(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command, [h] for help");
            }
            continue;
        };
        let (flow, message) = commands::execute(session, command);
        println!("{}", message);
        if flow == Flow::Exit {
            break;
        }
    }
    Ok(())
}
