//! Style Data Models
//!
//! Visual preset description shared by the catalog, the resolver and the
//! compositor.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{Color, CoreError, CoreResult};

// =============================================================================
// Enumerations
// =============================================================================

/// Preset family, used for filtering and behavioral gating
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StyleCategory {
    Bold,
    Neon,
    Minimal,
    Art,
    Glow,
    Highlight,
    /// Enables per-word smart coloring from transcription tags
    Viral,
    Custom,
}

impl StyleCategory {
    pub const ALL: [StyleCategory; 8] = [
        StyleCategory::Bold,
        StyleCategory::Neon,
        StyleCategory::Minimal,
        StyleCategory::Art,
        StyleCategory::Glow,
        StyleCategory::Highlight,
        StyleCategory::Viral,
        StyleCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleCategory::Bold => "BOLD",
            StyleCategory::Neon => "NEON",
            StyleCategory::Minimal => "MINIMAL",
            StyleCategory::Art => "ART",
            StyleCategory::Glow => "GLOW",
            StyleCategory::Highlight => "HIGHLIGHT",
            StyleCategory::Viral => "VIRAL",
            StyleCategory::Custom => "CUSTOM",
        }
    }
}

impl FromStr for StyleCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        StyleCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown style category: {}", s)))
    }
}

/// Per-word animation strategy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimationKind {
    #[default]
    None,
    Pop,
    ScaleUp,
    Karaoke,
    Typewriter,
}

/// How much of the caption is visible at once
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayMode {
    /// One word at a time
    Word,
    /// Full wrapped segment with the active word distinguished
    #[default]
    Block,
}

/// Horizontal alignment of a wrapped line around the anchor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for TextAlign {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(TextAlign::Left),
            "center" => Ok(TextAlign::Center),
            "right" => Ok(TextAlign::Right),
            _ => Err(CoreError::ValidationError(format!("Unknown text alignment: {}", s))),
        }
    }
}

// =============================================================================
// Style Components
// =============================================================================

/// Text outline
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Width in preset units (scaled by the frame's scale factor)
    pub width: f32,
    pub color: Color,
}

/// Drop shadow applied to strokes and fills
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

// =============================================================================
// StyleConfig
// =============================================================================

/// A named visual preset.
///
/// The resolver produces values of the same shape; every field the
/// compositor reads is concrete, so there is nothing left to default at draw time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    pub name: String,
    pub category: StyleCategory,
    /// CSS-style family list, e.g. `"Montserrat, sans-serif"`
    pub font_family: String,
    /// Font size in units of 1/1000 of the canvas height
    pub font_size: f32,
    pub font_weight: u16,
    pub text_color: Color,
    pub text_align: TextAlign,
    pub active_text_color: Option<Color>,
    pub stroke: Option<Stroke>,
    pub shadow: Option<Shadow>,
    pub background: Option<Color>,
    pub background_padding: f32,
    pub background_radius: f32,
    pub gradient_colors: Vec<Color>,
    /// Maximum per-word tilt in degrees; catalog data only, never rendered
    pub rotation_variance: f32,
    /// Background drawn behind the active word only
    pub active_background_color: Option<Color>,
    /// Inactive words are outlined, not filled
    pub use_outline_for_inactive: bool,
    /// Alpha applied to inactive words
    pub opacity_inactive: Option<f32>,
    pub animation: AnimationKind,
    pub display_mode: DisplayMode,
    pub uppercase: bool,
}

impl StyleConfig {
    /// Background padding used when a preset does not specify one
    pub const DEFAULT_BACKGROUND_PADDING: f32 = 12.0;
    /// Corner radius used when a preset does not specify one
    pub const DEFAULT_BACKGROUND_RADIUS: f32 = 8.0;

    /// Starts a preset with only the mandatory fields set
    pub fn new(
        name: &str,
        category: StyleCategory,
        font_family: &str,
        font_size: f32,
        font_weight: u16,
        text_color: Color,
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            font_family: font_family.to_string(),
            font_size,
            font_weight,
            text_color,
            text_align: TextAlign::Center,
            active_text_color: None,
            stroke: None,
            shadow: None,
            background: None,
            background_padding: Self::DEFAULT_BACKGROUND_PADDING,
            background_radius: Self::DEFAULT_BACKGROUND_RADIUS,
            gradient_colors: Vec::new(),
            rotation_variance: 0.0,
            active_background_color: None,
            use_outline_for_inactive: false,
            opacity_inactive: None,
            animation: AnimationKind::None,
            display_mode: DisplayMode::Block,
            uppercase: false,
        }
    }

    pub fn active_color(mut self, color: Color) -> Self {
        self.active_text_color = Some(color);
        self
    }

    pub fn stroke(mut self, width: f32, color: Color) -> Self {
        self.stroke = Some(Stroke { width, color });
        self
    }

    pub fn shadow(mut self, color: Color, blur: f32, offset_x: f32, offset_y: f32) -> Self {
        self.shadow = Some(Shadow {
            color,
            blur,
            offset_x,
            offset_y,
        });
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn padding(mut self, padding: f32) -> Self {
        self.background_padding = padding;
        self
    }

    pub fn radius(mut self, radius: f32) -> Self {
        self.background_radius = radius;
        self
    }

    pub fn gradient(mut self, stops: &[Color]) -> Self {
        self.gradient_colors = stops.to_vec();
        self
    }

    pub fn rotation_variance(mut self, degrees: f32) -> Self {
        self.rotation_variance = degrees;
        self
    }

    pub fn active_background(mut self, color: Color) -> Self {
        self.active_background_color = Some(color);
        self
    }

    pub fn outline_inactive(mut self) -> Self {
        self.use_outline_for_inactive = true;
        self
    }

    pub fn inactive_opacity(mut self, opacity: f32) -> Self {
        self.opacity_inactive = Some(opacity);
        self
    }

    pub fn animation(mut self, animation: AnimationKind) -> Self {
        self.animation = animation;
        self
    }

    pub fn word_by_word(mut self) -> Self {
        self.display_mode = DisplayMode::Word;
        self
    }

    pub fn uppercase(mut self) -> Self {
        self.uppercase = true;
        self
    }

    pub fn is_viral(&self) -> bool {
        self.category == StyleCategory::Viral
    }

    /// Stroke width, zero when the style has no outline
    pub fn stroke_width(&self) -> f32 {
        self.stroke.map(|s| s.width).unwrap_or(0.0)
    }
}

impl fmt::Display for StyleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {}px/{} {:?}/{:?}",
            self.name,
            self.category.as_str(),
            self.font_family,
            self.font_size,
            self.font_weight,
            self.display_mode,
            self.animation
        )
    }
}
