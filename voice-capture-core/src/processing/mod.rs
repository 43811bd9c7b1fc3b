pub mod downmixer;
pub mod speaker_router;
pub mod wav_format;
