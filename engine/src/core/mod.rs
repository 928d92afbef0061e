//! CapGen Core Engine
//!
//! Caption rendering and synchronized export pipeline.
//! Handles caption timing, style resolution, frame compositing, motion/cue
//! control, export sequencing and the FFmpeg/transcription collaborators.

pub mod ai;
pub mod captions;
pub mod export;
pub mod ffmpeg;
pub mod motion;
pub mod process;
pub mod render;
pub mod settings;
pub mod studio;
pub mod style;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
