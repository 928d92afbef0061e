//! Per-Word Effects
//!
//! One strategy per [`AnimationKind`]. Each turns the word's timing state
//! into a local scale, an alpha and a fill flag; none of them move the word.

use std::f64::consts::PI;

use crate::core::style::{AnimationKind, StyleConfig};

/// Active-word scale for `POP`
pub const POP_SCALE: f32 = 1.15;
/// Peak extra scale for `SCALE_UP`
pub const SCALE_UP_AMPLITUDE: f64 = 0.15;
/// Alpha of not-yet-spoken words under `KARAOKE`
pub const KARAOKE_FUTURE_ALPHA: f32 = 0.55;
/// Fraction of the word slot over which `TYPEWRITER` fades a word in
pub const TYPEWRITER_FADE_SPAN: f64 = 1.0 / 3.0;

/// Timing state of one word within the active caption
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordTiming {
    pub index: usize,
    pub active_index: usize,
    /// Progress through the active word's slot, 0..=1
    pub word_progress: f64,
}

impl WordTiming {
    pub fn is_active(&self) -> bool {
        self.index == self.active_index
    }

    pub fn is_future(&self) -> bool {
        self.index > self.active_index
    }
}

/// Local modulation applied around the word's center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordEffect {
    pub scale: f32,
    pub alpha: f32,
    /// `false` draws the outline only
    pub fill: bool,
}

impl Default for WordEffect {
    fn default() -> Self {
        Self {
            scale: 1.0,
            alpha: 1.0,
            fill: true,
        }
    }
}

impl WordEffect {
    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
    }
}

trait WordAnimation {
    fn effect(&self, timing: &WordTiming) -> WordEffect;
}

impl WordAnimation for AnimationKind {
    fn effect(&self, timing: &WordTiming) -> WordEffect {
        match self {
            AnimationKind::None => WordEffect::default(),
            AnimationKind::Pop => pop(timing),
            AnimationKind::ScaleUp => scale_up(timing),
            AnimationKind::Karaoke => karaoke(timing),
            AnimationKind::Typewriter => typewriter(timing),
        }
    }
}

fn pop(timing: &WordTiming) -> WordEffect {
    WordEffect {
        scale: if timing.is_active() { POP_SCALE } else { 1.0 },
        ..Default::default()
    }
}

fn scale_up(timing: &WordTiming) -> WordEffect {
    let scale = if timing.is_active() {
        let p = timing.word_progress.clamp(0.0, 1.0);
        (1.0 + SCALE_UP_AMPLITUDE * (PI * p).sin()) as f32
    } else {
        1.0
    };
    WordEffect {
        scale,
        ..Default::default()
    }
}

fn karaoke(timing: &WordTiming) -> WordEffect {
    WordEffect {
        alpha: if timing.is_future() {
            KARAOKE_FUTURE_ALPHA
        } else {
            1.0
        },
        ..Default::default()
    }
}

fn typewriter(timing: &WordTiming) -> WordEffect {
    let alpha = if timing.is_future() {
        0.0
    } else if timing.is_active() {
        (timing.word_progress / TYPEWRITER_FADE_SPAN).clamp(0.0, 1.0) as f32
    } else {
        1.0
    };
    WordEffect {
        alpha,
        ..Default::default()
    }
}

/// Animation strategy combined with the style's inactive-word treatment
pub fn word_effect(style: &StyleConfig, timing: &WordTiming) -> WordEffect {
    let mut effect = style.animation.effect(timing);
    if !timing.is_active() {
        if let Some(opacity) = style.opacity_inactive {
            effect.alpha *= opacity.clamp(0.0, 1.0);
        }
        if style.use_outline_for_inactive {
            effect.fill = false;
        }
    }
    effect
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::style::{preset, PresetKey};
    use crate::core::Color;

    fn timing(index: usize, active_index: usize, word_progress: f64) -> WordTiming {
        WordTiming {
            index,
            active_index,
            word_progress,
        }
    }

    #[test]
    fn test_pop_scales_active_only() {
        assert_eq!(AnimationKind::Pop.effect(&timing(1, 1, 0.5)).scale, POP_SCALE);
        assert_eq!(AnimationKind::Pop.effect(&timing(0, 1, 0.5)).scale, 1.0);
    }

    #[test]
    fn test_scale_up_pulses() {
        let start = AnimationKind::ScaleUp.effect(&timing(0, 0, 0.0));
        let mid = AnimationKind::ScaleUp.effect(&timing(0, 0, 0.5));
        let end = AnimationKind::ScaleUp.effect(&timing(0, 0, 1.0));
        assert!((start.scale - 1.0).abs() < 1e-6);
        assert!((mid.scale - 1.15).abs() < 1e-6);
        assert!((end.scale - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_karaoke_dims_future_words() {
        assert_eq!(AnimationKind::Karaoke.effect(&timing(2, 1, 0.0)).alpha, KARAOKE_FUTURE_ALPHA);
        assert_eq!(AnimationKind::Karaoke.effect(&timing(1, 1, 0.0)).alpha, 1.0);
        assert_eq!(AnimationKind::Karaoke.effect(&timing(0, 1, 0.0)).alpha, 1.0);
    }

    #[test]
    fn test_typewriter_hides_future_and_fades_active() {
        assert!(!AnimationKind::Typewriter.effect(&timing(3, 1, 0.9)).is_visible());
        let fading = AnimationKind::Typewriter.effect(&timing(1, 1, 1.0 / 6.0));
        assert!((fading.alpha - 0.5).abs() < 1e-5);
        assert_eq!(AnimationKind::Typewriter.effect(&timing(1, 1, 0.8)).alpha, 1.0);
        assert_eq!(AnimationKind::Typewriter.effect(&timing(0, 1, 0.0)).alpha, 1.0);
    }

    #[test]
    fn test_inactive_treatment_from_style() {
        let style = StyleConfig::new("T", crate::core::style::StyleCategory::Highlight, "Inter", 60.0, 700, Color::WHITE)
            .inactive_opacity(0.5)
            .outline_inactive();

        let inactive = word_effect(&style, &timing(0, 1, 0.0));
        assert_eq!(inactive.alpha, 0.5);
        assert!(!inactive.fill);

        let active = word_effect(&style, &timing(1, 1, 0.0));
        assert_eq!(active.alpha, 1.0);
        assert!(active.fill);
    }

    #[test]
    fn test_effects_never_hide_active_plain_word() {
        let style = preset(PresetKey::Default);
        let effect = word_effect(style, &timing(0, 0, 0.0));
        assert_eq!(effect, WordEffect::default());
    }
}
