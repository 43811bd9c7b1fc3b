//! Console commands for the interactive recorder.

use voice_capture_core::{CapturePhase, CaptureSession};

/// One line of console input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Toggle recording to the configured WAV file.
    Record,
    /// Print phase and diagnostics.
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse a console line. Unknown input yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "r" | "R" | "record" => Some(Self::Record),
            "s" | "status" => Some(Self::Status),
            "h" | "?" | "help" => Some(Self::Help),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub const HELP: &str = "[r] - Record sound to wav (toggle)\n[s] - Show recording status\n[h] - Help\n[q] - Quit";

/// Whether the console loop should keep reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Execute `command` against `session` and return the text to show the user.
pub fn execute(session: &CaptureSession, command: Command) -> (Flow, String) {
    match command {
        Command::Record => {
            let message = match session.toggle() {
                Ok(CapturePhase::Recording) => {
                    format!("Started recording sound to {}", session.config().output_path.display())
                }
                Ok(CapturePhase::Idle) => {
                    format!("Stopped recording sound to {}", session.config().output_path.display())
                }
                Err(e) => format!("Error toggling recording: {}", e),
            };
            (Flow::Continue, message)
        }
        Command::Status => (Flow::Continue, status_line(session)),
        Command::Help => (Flow::Continue, HELP.to_string()),
        Command::Quit => (Flow::Exit, "Quitting".to_string()),
    }
}

pub fn status_line(session: &CaptureSession) -> String {
    let d = session.diagnostics();
    let mut line = format!(
        "phase: {}, batches: {} received / {} recorded / {} skipped / {} dropped, {} frames ({} bytes) written",
        session.phase(),
        d.batches_received,
        d.batches_recorded,
        d.batches_skipped,
        d.batches_dropped,
        d.frames_written,
        d.bytes_written
    );
    if let Some(e) = session.last_error() {
        line.push_str(&format!(", last error: {}", e));
    }
    line
}
