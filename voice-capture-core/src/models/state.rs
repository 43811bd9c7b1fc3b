/// Capture session phase.
///
/// State transitions:
/// ```text
/// idle ──request_start──▶ recording
///  ▲                          │
///  └── request_stop / write failure / shutdown
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    Idle,
    Recording,
}

impl CapturePhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub(crate) fn from_flag(recording: bool) -> Self {
        if recording {
            Self::Recording
        } else {
            Self::Idle
        }
    }
}

impl std::fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Recording => f.write_str("recording"),
        }
    }
}
