//! Caption System Module
//!
//! Provides the caption data model and time-based lookup:
//! - Caption segments with per-segment scale/placement/color hints
//! - Active caption and active word resolution for a playback time
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caption System                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  models.rs     - Caption, CaptionPosition, WordCategory         │
//! │  index.rs      - lookup(t), ActiveCaption (progress, word idx)  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod index;
pub mod models;

pub use index::{active_word_index, caption_progress, lookup, resolve, ActiveCaption};
pub use models::*;
