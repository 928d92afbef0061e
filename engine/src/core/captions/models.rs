//! Caption Data Models
//!
//! Defines the timed caption segment produced by transcription and the
//! per-segment hints (scale, placement, word colors) the compositor honors.

use serde::{Deserialize, Serialize};

use crate::core::{CaptionId, Color, TimeSec};

// =============================================================================
// Caption Positioning
// =============================================================================

/// Vertical placement hint attached to a caption segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptionPosition {
    /// Upper band (15% of height)
    Top,
    /// Vertical center (50%)
    Middle,
    /// Lower band (85%, default for narration)
    #[default]
    Bottom,
    /// Leave the user's stored position untouched
    Custom,
}

impl CaptionPosition {
    /// Vertical anchor as a percentage of canvas height, if this placement fixes one
    pub fn vertical_percent(&self) -> Option<f64> {
        match self {
            CaptionPosition::Top => Some(15.0),
            CaptionPosition::Middle => Some(50.0),
            CaptionPosition::Bottom => Some(85.0),
            CaptionPosition::Custom => None,
        }
    }

    /// Parses the loose upper-case labels returned by transcription
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "TOP" => Some(CaptionPosition::Top),
            "MIDDLE" | "CENTER" => Some(CaptionPosition::Middle),
            "BOTTOM" => Some(CaptionPosition::Bottom),
            "CUSTOM" => Some(CaptionPosition::Custom),
            _ => None,
        }
    }
}

/// Delivery mood tagged by transcription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Energetic,
    Calm,
    Serious,
    Joyful,
}

impl Sentiment {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "energetic" => Some(Sentiment::Energetic),
            "calm" => Some(Sentiment::Calm),
            "serious" => Some(Sentiment::Serious),
            "joyful" => Some(Sentiment::Joyful),
            _ => None,
        }
    }
}

// =============================================================================
// Smart Word Colors
// =============================================================================

/// Semantic category assigned to each word for viral-style coloring
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WordCategory {
    /// Filler words, pronouns, connectors
    #[default]
    Neutral,
    /// Key nouns and adjectives
    Emphasis,
    Positive,
    Negative,
    /// Numbers, stats, digital terms
    Tech,
    /// Verbs of action
    Action,
}

impl WordCategory {
    /// Parses a category label; unknown labels fall back to neutral
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "emphasis" => WordCategory::Emphasis,
            "positive" => WordCategory::Positive,
            "negative" => WordCategory::Negative,
            "tech" => WordCategory::Tech,
            "action" => WordCategory::Action,
            _ => WordCategory::Neutral,
        }
    }

    /// Fill color used for this category
    pub fn color(&self) -> Color {
        match self {
            WordCategory::Neutral => Color::hex(0xFFFFFF),
            WordCategory::Emphasis => Color::hex(0xFACC15),
            WordCategory::Positive => Color::hex(0x4ADE80),
            WordCategory::Negative => Color::hex(0xEF4444),
            WordCategory::Tech => Color::hex(0x60A5FA),
            WordCategory::Action => Color::hex(0xFB923C),
        }
    }
}

// =============================================================================
// Caption Entry
// =============================================================================

/// One transcribed utterance segment.
///
/// Created in bulk from a transcription result and treated as immutable;
/// the whole list is replaced when a new video is loaded or regenerated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    /// Stable identifier, used to detect caption transitions
    pub id: CaptionId,
    /// Start time in seconds
    pub start_time: TimeSec,
    /// End time in seconds
    pub end_time: TimeSec,
    /// Raw segment text; words are split on whitespace at render time
    pub text: String,
    /// Language code reported for this segment
    #[serde(default = "default_language")]
    pub language: String,
    /// Transcription confidence (0-100)
    #[serde(default)]
    pub confidence: f64,
    /// Indices of key words to emphasize
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight_indices: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Suggested placement reported by transcription
    #[serde(default)]
    pub position: CaptionPosition,
    /// Font size multiplier for this segment (auto-adjust only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_scale: Option<f64>,
    /// Vertical placement override (auto-adjust only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_position: Option<CaptionPosition>,
    /// Per-word fill colors, index-aligned to the whitespace-split words (viral styles only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_colors: Vec<Color>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Caption {
    /// Creates a new caption with the given text and timing
    pub fn new(id: &str, start_time: TimeSec, end_time: TimeSec, text: &str) -> Self {
        Self {
            id: id.to_string(),
            start_time,
            end_time,
            text: text.to_string(),
            language: default_language(),
            confidence: 0.0,
            highlight_indices: None,
            sentiment: None,
            position: CaptionPosition::Bottom,
            custom_scale: None,
            custom_position: None,
            word_colors: Vec::new(),
        }
    }

    pub fn with_custom_scale(mut self, scale: f64) -> Self {
        self.custom_scale = Some(scale);
        self
    }

    pub fn with_custom_position(mut self, position: CaptionPosition) -> Self {
        self.custom_position = Some(position);
        self
    }

    pub fn with_word_colors(mut self, colors: Vec<Color>) -> Self {
        self.word_colors = colors;
        self
    }

    /// Returns the duration of this caption in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_time - self.start_time
    }

    /// Returns true if `time` lies in the closed interval `[start, end]`
    pub fn contains(&self, time: TimeSec) -> bool {
        time >= self.start_time && time <= self.end_time
    }

    /// Whitespace-separated words of the raw text
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// Whether this segment was flagged as emphatic (large scale hint)
    pub fn is_emphatic(&self) -> bool {
        self.custom_scale.is_some_and(|s| s > 1.2)
    }

    /// Per-word color at `index`, if one was supplied
    pub fn word_color(&self, index: usize) -> Option<Color> {
        self.word_colors.get(index).copied()
    }
}
