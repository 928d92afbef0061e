//! AI Module
//!
//! Transcription of uploaded media into timed caption segments.

#[cfg(feature = "ai-providers")]
pub mod gemini;
pub mod prompts;
pub mod transcription;

#[cfg(feature = "ai-providers")]
pub use gemini::GeminiTranscriber;
pub use prompts::build_instruction;
pub use transcription::{
    dominant_language, ensure_captions, language_display_name, parse_segments, parse_time,
    LanguageMode, MockTranscriber, TranscriptionOptions, TranscriptionResult,
    TranscriptionService,
};
