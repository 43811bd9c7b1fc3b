pub mod capture_delegate;
pub mod playback_source;
