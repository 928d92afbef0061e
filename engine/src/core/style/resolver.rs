//! Style Resolver
//!
//! Merges a named preset with the user-settable overrides into the active
//! render configuration the compositor draws with.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::{preset, PresetKey};
use super::models::{Shadow, StyleConfig, Stroke, TextAlign};
use crate::core::Color;

/// Active render configuration: a fully-resolved [`StyleConfig`]
pub type ActiveRenderConfig = StyleConfig;

// =============================================================================
// Overrides
// =============================================================================

/// User-settable design fields.
///
/// `None` means "use the preset's value". Selecting a preset resets every
/// field to that preset's own value via [`StyleOverrides::from_preset`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOverrides {
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub font_weight: Option<u16>,
    #[serde(default)]
    pub text_color: Option<Color>,
    #[serde(default)]
    pub text_align: Option<TextAlign>,
    #[serde(default)]
    pub stroke_width: Option<f32>,
    #[serde(default)]
    pub stroke_color: Option<Color>,
    #[serde(default)]
    pub shadow_blur: Option<f32>,
    #[serde(default)]
    pub shadow_offset_y: Option<f32>,
    #[serde(default)]
    pub background_enabled: Option<bool>,
    #[serde(default)]
    pub background_color: Option<Color>,
    #[serde(default)]
    pub background_padding: Option<f32>,
    #[serde(default)]
    pub background_radius: Option<f32>,
    #[serde(default)]
    pub uppercase: Option<bool>,
}

impl StyleOverrides {
    /// Shadow color used when overrides add a shadow to a preset without one
    pub const OVERRIDE_SHADOW_ALPHA: f32 = 0.8;
    /// Background color used when overrides enable a background with no color
    pub const FALLBACK_BACKGROUND_ALPHA: f32 = 0.5;

    /// Overrides that reproduce `style` exactly
    pub fn from_preset(style: &StyleConfig) -> Self {
        Self {
            font_family: Some(style.font_family.clone()),
            font_weight: Some(style.font_weight),
            text_color: Some(style.text_color),
            text_align: Some(style.text_align),
            stroke_width: Some(style.stroke_width()),
            stroke_color: style.stroke.map(|s| s.color),
            shadow_blur: style.shadow.map(|s| s.blur),
            shadow_offset_y: style.shadow.map(|s| s.offset_y),
            background_enabled: Some(style.background.is_some()),
            background_color: style.background,
            background_padding: Some(style.background_padding),
            background_radius: Some(style.background_radius),
            uppercase: Some(style.uppercase),
        }
    }

    /// Overlays these overrides on `base`
    pub fn apply(&self, base: &StyleConfig) -> StyleConfig {
        let mut style = base.clone();

        if let Some(family) = &self.font_family {
            style.font_family = family.clone();
        }
        style.font_weight = self.font_weight.unwrap_or(base.font_weight);
        style.text_color = self.text_color.unwrap_or(base.text_color);
        style.text_align = self.text_align.unwrap_or(base.text_align);

        let stroke_width = self.stroke_width.unwrap_or(base.stroke_width());
        style.stroke = if stroke_width > 0.0 {
            Some(Stroke {
                width: stroke_width,
                color: self
                    .stroke_color
                    .or(base.stroke.map(|s| s.color))
                    .unwrap_or(Color::BLACK),
            })
        } else {
            None
        };

        style.shadow = match base.shadow {
            Some(shadow) => Some(Shadow {
                blur: self.shadow_blur.unwrap_or(shadow.blur),
                offset_y: self.shadow_offset_y.unwrap_or(shadow.offset_y),
                ..shadow
            }),
            None if self.shadow_blur.is_some() || self.shadow_offset_y.is_some() => {
                Some(Shadow {
                    color: Color::with_css_alpha(0, 0, 0, Self::OVERRIDE_SHADOW_ALPHA),
                    blur: self.shadow_blur.unwrap_or(0.0),
                    offset_x: 0.0,
                    offset_y: self.shadow_offset_y.unwrap_or(0.0),
                })
            }
            None => None,
        };

        let background_enabled = self
            .background_enabled
            .unwrap_or(base.background.is_some());
        style.background = if background_enabled {
            Some(
                self.background_color
                    .or(base.background)
                    .unwrap_or(Color::with_css_alpha(0, 0, 0, Self::FALLBACK_BACKGROUND_ALPHA)),
            )
        } else {
            None
        };
        style.background_padding = self.background_padding.unwrap_or(base.background_padding);
        style.background_radius = self.background_radius.unwrap_or(base.background_radius);
        style.uppercase = self.uppercase.unwrap_or(base.uppercase);

        style
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Pure resolution of the active configuration.
///
/// With auto-adjust on, the preset is used verbatim (AI hints drive the
/// per-caption variation instead); with it off, or for the custom
/// pseudo-preset, the overrides are overlaid.
pub fn resolve(
    key: PresetKey,
    overrides: &StyleOverrides,
    auto_adjust: bool,
) -> ActiveRenderConfig {
    let base = preset(key);
    if !auto_adjust || key == PresetKey::Custom {
        overrides.apply(base)
    } else {
        base.clone()
    }
}

#[derive(Clone, Debug, PartialEq)]
struct ResolveKey {
    preset: PresetKey,
    overrides: StyleOverrides,
    auto_adjust: bool,
}

/// Memoizing wrapper around [`resolve`], keyed on the full input tuple.
///
/// The compositor asks for the configuration every frame; it is only
/// recomputed when one of the contributing inputs changes.
#[derive(Debug, Default)]
pub struct StyleResolver {
    last: Option<(ResolveKey, Arc<ActiveRenderConfig>)>,
}

impl StyleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        key: PresetKey,
        overrides: &StyleOverrides,
        auto_adjust: bool,
    ) -> Arc<ActiveRenderConfig> {
        if let Some((cached_key, config)) = &self.last {
            if cached_key.preset == key
                && cached_key.auto_adjust == auto_adjust
                && &cached_key.overrides == overrides
            {
                return Arc::clone(config);
            }
        }

        debug!(
            "Resolving style {} (auto_adjust={})",
            key.as_str(),
            auto_adjust
        );
        let config = Arc::new(resolve(key, overrides, auto_adjust));
        self.last = Some((
            ResolveKey {
                preset: key,
                overrides: overrides.clone(),
                auto_adjust,
            },
            Arc::clone(&config),
        ));
        config
    }

    /// Drops the cached configuration
    pub fn invalidate(&mut self) {
        self.last = None;
    }
}
