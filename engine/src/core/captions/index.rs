//! Caption Index
//!
//! Time-based lookup of the active caption and the active word within it.
//!
//! Lookup is a linear scan by range containment, not by position: caption
//! lists are expected to be ordered and non-overlapping, but nothing
//! enforces it, and when segments do overlap the first one in list order wins.
//! The active-word index is derived from the caption's own time window only,
//! so overlapping segments are not reconciled with each other.

use crate::core::TimeSec;

use super::Caption;

/// Returns the first caption whose closed interval `[start, end]` contains `time`.
pub fn lookup(time: TimeSec, captions: &[Caption]) -> Option<&Caption> {
    captions.iter().find(|c| c.contains(time))
}

/// Active caption plus word-level timing at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCaption<'a> {
    pub caption: &'a Caption,
    /// Fraction of the caption's window elapsed, in `[0, 1]`
    pub progress: f64,
    /// Whitespace-split words of the raw text
    pub words: Vec<&'a str>,
    /// Index of the word being spoken, always in `[0, words.len() - 1]`
    pub active_word_index: usize,
}

impl<'a> ActiveCaption<'a> {
    /// Builds the word timing for `caption` at `time`.
    ///
    /// Returns `None` when the caption has no words.
    pub fn at(caption: &'a Caption, time: TimeSec) -> Option<Self> {
        let words: Vec<&str> = caption.words().collect();
        if words.is_empty() {
            return None;
        }

        let progress = caption_progress(caption, time);
        let active_word_index = active_word_index(progress, words.len());

        Some(Self {
            caption,
            progress,
            words,
            active_word_index,
        })
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Progress within the active word's own slot, in `[0, 1]`
    pub fn word_progress(&self) -> f64 {
        let slot = self.progress * self.words.len() as f64 - self.active_word_index as f64;
        slot.clamp(0.0, 1.0)
    }
}

/// Finds the active caption at `time` and computes its word timing.
///
/// Returns `None` when the list is empty, no caption contains `time`, or the
/// matching caption has no words.
pub fn resolve(time: TimeSec, captions: &[Caption]) -> Option<ActiveCaption<'_>> {
    lookup(time, captions).and_then(|caption| ActiveCaption::at(caption, time))
}

/// `clamp((t - start) / (end - start), 0, 1)`; a zero-length window counts as complete.
pub fn caption_progress(caption: &Caption, time: TimeSec) -> f64 {
    let duration = caption.duration();
    if duration <= 0.0 || !duration.is_finite() {
        return 1.0;
    }
    let progress = (time - caption.start_time) / duration;
    if progress.is_nan() {
        return 1.0;
    }
    progress.clamp(0.0, 1.0)
}

/// `floor(progress * word_count)` clamped to the last word.
pub fn active_word_index(progress: f64, word_count: usize) -> usize {
    if word_count == 0 {
        return 0;
    }
    let raw = (progress.clamp(0.0, 1.0) * word_count as f64).floor() as usize;
    raw.min(word_count - 1)
}
