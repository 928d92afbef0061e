//! Frame Compositor
//!
//! Turns one decoded video frame, the active render configuration and the
//! active caption into pixels on a [`RenderSurface`]. Draw order:
//!
//! 1. clear
//! 2. the video frame, scaled about the canvas center by the smoothed zoom
//! 3. the caption (word or block mode), one word at a time
//! 4. the export watermark, on top of everything

use tracing::trace;

use super::animation::{word_effect, WordEffect, WordTiming};
use super::layout::{layout_block, layout_word, CaptionLayout, WordBox};
use super::surface::{FontSpec, RenderSurface, ShadowSpec, TextAnchor, VideoFrame};
use crate::core::captions::{ActiveCaption, Caption};
use crate::core::style::{ActiveRenderConfig, DisplayMode, StyleConfig};
use crate::core::Color;

/// Canvas height that preset sizes are expressed against
pub const REFERENCE_HEIGHT: f32 = 1000.0;

// =============================================================================
// Inputs
// =============================================================================

/// User placement settings for the caption anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionPlacement {
    /// Global font scale
    pub font_scale: f64,
    /// Anchor height, percent of the canvas height
    pub vertical_percent: f64,
    /// Anchor x, percent of the canvas width
    pub horizontal_percent: f64,
    /// Per-caption AI hints (`customScale`, `customPosition`) take effect
    pub auto_adjust: bool,
}

impl Default for CaptionPlacement {
    fn default() -> Self {
        Self {
            font_scale: 1.0,
            vertical_percent: 75.0,
            horizontal_percent: 50.0,
            auto_adjust: true,
        }
    }
}

/// Everything the compositor reads besides the surface and the frame
#[derive(Debug, Clone)]
pub struct FrameInputs<'a> {
    pub style: &'a ActiveRenderConfig,
    pub caption: Option<&'a ActiveCaption<'a>>,
    pub zoom: f64,
    pub placement: CaptionPlacement,
    /// Draw the export watermark
    pub watermark: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn,
    /// Surface or frame not available yet
    Skipped,
}

/// Caption scale and anchor for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
    pub scale_factor: f32,
    pub font_size: f32,
    pub anchor_x: f32,
    pub anchor_y: f32,
}

/// `scaleFactor = height / 1000 * effectiveFontScale`, plus the anchor point.
///
/// With auto-adjust on, the caption's `customScale` multiplies the global
/// scale and its `customPosition` replaces the stored vertical percentage.
pub fn frame_geometry(
    width: f32,
    height: f32,
    caption: &Caption,
    style: &StyleConfig,
    placement: &CaptionPlacement,
) -> FrameGeometry {
    let mut font_scale = placement.font_scale;
    let mut vertical = placement.vertical_percent;

    if placement.auto_adjust {
        if let Some(custom) = caption.custom_scale {
            font_scale *= custom;
        }
        if let Some(percent) = caption.custom_position.and_then(|p| p.vertical_percent()) {
            vertical = percent;
        }
    }

    let scale_factor = height / REFERENCE_HEIGHT * font_scale as f32;
    FrameGeometry {
        scale_factor,
        font_size: style.font_size * scale_factor,
        anchor_x: width * placement.horizontal_percent as f32 / 100.0,
        anchor_y: height * vertical as f32 / 100.0,
    }
}

// =============================================================================
// Watermark
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub text: String,
    pub font_family: String,
    pub font_weight: u16,
    pub color: Color,
    pub alpha: f32,
}

impl Default for Watermark {
    fn default() -> Self {
        Self {
            text: "capgen.ai".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            font_weight: 900,
            color: Color::hex(0x3B82F6),
            alpha: 0.8,
        }
    }
}

impl Watermark {
    pub fn font_size(height: f32) -> f32 {
        (height * 0.04).max(24.0)
    }

    pub fn padding(height: f32) -> f32 {
        (height * 0.03).max(20.0)
    }
}

// =============================================================================
// FrameCompositor
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct FrameCompositor {
    watermark: Watermark,
}

impl FrameCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watermark(watermark: Watermark) -> Self {
        Self { watermark }
    }

    /// Composes one frame. Never fails: missing inputs skip the frame.
    pub fn compose(
        &self,
        surface: Option<&mut dyn RenderSurface>,
        frame: Option<&VideoFrame>,
        inputs: &FrameInputs<'_>,
    ) -> FrameOutcome {
        let (surface, frame) = match (surface, frame) {
            (Some(surface), Some(frame)) if frame.width > 0 && frame.height > 0 => {
                (surface, frame)
            }
            _ => {
                trace!("Frame skipped: surface or video frame not ready");
                return FrameOutcome::Skipped;
            }
        };

        if surface.width() != frame.width || surface.height() != frame.height {
            surface.resize(frame.width, frame.height);
        }

        let width = frame.width as f32;
        let height = frame.height as f32;

        surface.clear();

        let zoom = if inputs.zoom.is_finite() && inputs.zoom > 0.0 {
            inputs.zoom as f32
        } else {
            1.0
        };
        surface.save();
        surface.translate(width / 2.0, height / 2.0);
        surface.scale(zoom);
        surface.translate(-width / 2.0, -height / 2.0);
        surface.draw_frame(frame, 0.0, 0.0, width, height);
        surface.restore();

        if let Some(active) = inputs.caption {
            self.draw_caption(surface, active, inputs, width, height);
        }

        if inputs.watermark {
            self.draw_watermark(surface, width, height);
        }

        FrameOutcome::Drawn
    }

    fn draw_caption(
        &self,
        surface: &mut dyn RenderSurface,
        active: &ActiveCaption<'_>,
        inputs: &FrameInputs<'_>,
        width: f32,
        height: f32,
    ) {
        let style = inputs.style;
        let caption = active.caption;
        let geometry = frame_geometry(width, height, caption, style, &inputs.placement);

        let text = if style.uppercase {
            caption.text.to_uppercase()
        } else {
            caption.text.clone()
        };
        let words: Vec<String> = text.split_whitespace().map(str::to_string).collect();

        surface.save();
        surface.set_font(&FontSpec {
            family: style.font_family.clone(),
            weight: style.font_weight,
            size: geometry.font_size,
        });

        let anchor = (geometry.anchor_x, geometry.anchor_y);
        let layout: CaptionLayout = match style.display_mode {
            DisplayMode::Word => layout_word(&mut *surface, &words, active.active_word_index, anchor),
            DisplayMode::Block => layout_block(
                &mut *surface,
                &words,
                anchor,
                geometry.font_size,
                style.text_align,
                width,
            ),
        };

        let word_progress = active.word_progress();
        for word in &layout.words {
            let timing = WordTiming {
                index: word.index,
                active_index: active.active_word_index,
                word_progress,
            };
            let effect = word_effect(style, &timing);
            if !effect.is_visible() {
                continue;
            }
            let fill = fill_color(style, caption, &timing);
            draw_word(surface, style, word, &timing, effect, fill, &geometry);
        }

        surface.restore();
    }

    fn draw_watermark(&self, surface: &mut dyn RenderSurface, width: f32, height: f32) {
        let padding = Watermark::padding(height);

        surface.save();
        surface.set_font(&FontSpec {
            family: self.watermark.font_family.clone(),
            weight: self.watermark.font_weight,
            size: Watermark::font_size(height),
        });
        surface.set_shadow(Some(ShadowSpec {
            color: Color::with_css_alpha(0, 0, 0, 0.5),
            blur: 4.0,
            offset_x: 0.0,
            offset_y: 2.0,
        }));
        surface.set_alpha(self.watermark.alpha);
        surface.fill_text(
            &self.watermark.text,
            width - padding,
            padding,
            TextAnchor::TopRight,
            self.watermark.color,
        );
        surface.restore();
    }
}

/// Active color for the active word, base color otherwise; a viral style's
/// per-word color wins over both.
fn fill_color(style: &StyleConfig, caption: &Caption, timing: &WordTiming) -> Color {
    if style.is_viral() {
        if let Some(color) = caption.word_color(timing.index) {
            return color;
        }
    }
    if timing.is_active() {
        style.active_text_color.unwrap_or(style.text_color)
    } else {
        style.text_color
    }
}

/// Per-word routine: background, shadow, stroke, fill.
fn draw_word(
    surface: &mut dyn RenderSurface,
    style: &StyleConfig,
    word: &WordBox,
    timing: &WordTiming,
    effect: WordEffect,
    fill: Color,
    geometry: &FrameGeometry,
) {
    let sf = geometry.scale_factor;
    let font_size = geometry.font_size;

    surface.save();
    surface.translate(word.center_x, word.center_y);
    surface.scale(effect.scale);
    surface.set_alpha(effect.alpha);

    let background = if timing.is_active() {
        style.active_background_color.or(style.background)
    } else {
        style.background
    };
    if let Some(color) = background {
        let pad = style.background_padding * sf;
        surface.fill_round_rect(
            -word.width / 2.0 - pad,
            -font_size / 2.0 - pad,
            word.width + pad * 2.0,
            font_size + pad * 2.0,
            style.background_radius * sf,
            color,
        );
    }

    if let Some(shadow) = style.shadow {
        surface.set_shadow(Some(ShadowSpec {
            color: shadow.color,
            blur: shadow.blur * sf,
            offset_x: shadow.offset_x * sf,
            offset_y: shadow.offset_y * sf,
        }));
    }

    if let Some(stroke) = style.stroke.filter(|s| s.width > 0.0) {
        surface.stroke_text(
            &word.text,
            0.0,
            0.0,
            TextAnchor::Center,
            stroke.width * sf,
            stroke.color,
        );
    }

    if effect.fill {
        surface.fill_text(&word.text, 0.0, 0.0, TextAnchor::Center, fill);
    }

    surface.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::captions::{resolve as resolve_caption, CaptionPosition};
    use crate::core::render::display_list::{DrawOp, RecordingSurface};
    use crate::core::style::{preset, AnimationKind, PresetKey, StyleCategory};

    fn frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame::solid(width, height, Color::BLACK)
    }

    fn inputs<'a>(style: &'a StyleConfig, caption: Option<&'a ActiveCaption<'a>>) -> FrameInputs<'a> {
        FrameInputs {
            style,
            caption,
            zoom: 1.0,
            placement: CaptionPlacement::default(),
            watermark: false,
        }
    }

    fn fill_texts(surface: &RecordingSurface) -> Vec<String> {
        surface
            .fills()
            .iter()
            .filter_map(|op| op.text().map(str::to_string))
            .collect()
    }

    fn plain_style() -> StyleConfig {
        StyleConfig::new("Plain", StyleCategory::Minimal, "Inter", 60.0, 700, Color::WHITE)
            .active_color(Color::hex(0xFFFF00))
    }

    // -------------------------------------------------------------------------
    // Skips and resizing
    // -------------------------------------------------------------------------

    #[test]
    fn test_missing_surface_or_frame_skips() {
        let compositor = FrameCompositor::new();
        let style = plain_style();
        let f = frame(4, 4);
        assert_eq!(
            compositor.compose(None, Some(&f), &inputs(&style, None)),
            FrameOutcome::Skipped
        );

        let mut surface = RecordingSurface::new(4, 4);
        assert_eq!(
            compositor.compose(Some(&mut surface), None, &inputs(&style, None)),
            FrameOutcome::Skipped
        );
        assert!(surface.ops().is_empty());
    }

    #[test]
    fn test_surface_resized_lazily_on_mismatch() {
        let compositor = FrameCompositor::new();
        let style = plain_style();
        let mut surface = RecordingSurface::new(1, 1);
        let f = frame(108, 192);

        compositor.compose(Some(&mut surface), Some(&f), &inputs(&style, None));
        compositor.compose(Some(&mut surface), Some(&f), &inputs(&style, None));
        assert_eq!((surface.width(), surface.height()), (108, 192));
        assert_eq!(surface.resize_count(), 1);
    }

    #[test]
    fn test_clear_then_zoomed_frame() {
        let compositor = FrameCompositor::new();
        let style = plain_style();
        let mut surface = RecordingSurface::new(100, 200);
        let f = frame(100, 200);
        let mut frame_inputs = inputs(&style, None);
        frame_inputs.zoom = 1.1;

        compositor.compose(Some(&mut surface), Some(&f), &frame_inputs);
        assert_eq!(surface.ops()[0], DrawOp::Clear);
        match &surface.ops()[1] {
            DrawOp::Frame {
                x,
                y,
                width,
                height,
            } => {
                assert!((x - -5.0).abs() < 1e-3);
                assert!((y - -10.0).abs() < 1e-3);
                assert!((width - 110.0).abs() < 1e-3);
                assert!((height - 220.0).abs() < 1e-3);
            }
            other => panic!("unexpected op {:?}", other),
        }
        assert_eq!(surface.save_depth(), 0);
    }

    // -------------------------------------------------------------------------
    // Caption layout
    // -------------------------------------------------------------------------

    #[test]
    fn test_hello_world_block_single_line() {
        let captions = vec![Caption::new("c0", 0.0, 2.0, "Hello world")];
        let active = resolve_caption(1.0, &captions).unwrap();
        assert_eq!(active.active_word_index, 1);

        let style = plain_style();
        let compositor = FrameCompositor::new();
        let mut surface = RecordingSurface::new(1080, 1920);
        compositor.compose(Some(&mut surface), Some(&frame(1080, 1920)), &inputs(&style, Some(&active)));

        let fills: Vec<&DrawOp> = surface.fills();
        assert_eq!(fill_texts(&surface), vec!["Hello", "world"]);

        let ys: Vec<f32> = fills
            .iter()
            .map(|op| match op {
                DrawOp::FillText { y, .. } => *y,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ys[0], ys[1], "both words on one line");
        assert!((ys[0] - 1440.0).abs() < 1e-3);

        match fills[1] {
            DrawOp::FillText { color, .. } => assert_eq!(*color, Color::hex(0xFFFF00)),
            _ => unreachable!(),
        }
        match fills[0] {
            DrawOp::FillText { color, size, .. } => {
                assert_eq!(*color, Color::WHITE);
                assert!((size - 115.2).abs() < 1e-3);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_custom_scale_multiplies_font_scale_with_auto_adjust() {
        let caption = Caption::new("c0", 0.0, 2.0, "Big").with_custom_scale(1.5);
        let style = plain_style();

        let on = frame_geometry(1080.0, 1920.0, &caption, &style, &CaptionPlacement::default());
        let off = frame_geometry(
            1080.0,
            1920.0,
            &caption,
            &style,
            &CaptionPlacement {
                auto_adjust: false,
                ..Default::default()
            },
        );
        assert!((on.scale_factor / off.scale_factor - 1.5).abs() < 1e-5);
        assert!((off.scale_factor - 1.92).abs() < 1e-5);
    }

    #[test]
    fn test_custom_position_overrides_vertical_with_auto_adjust() {
        let caption = Caption::new("c0", 0.0, 2.0, "Up").with_custom_position(CaptionPosition::Top);
        let style = plain_style();

        let on = frame_geometry(1000.0, 2000.0, &caption, &style, &CaptionPlacement::default());
        assert!((on.anchor_y - 300.0).abs() < 1e-3);
        assert!((on.anchor_x - 500.0).abs() < 1e-3);

        let off = frame_geometry(
            1000.0,
            2000.0,
            &caption,
            &style,
            &CaptionPlacement {
                auto_adjust: false,
                ..Default::default()
            },
        );
        assert!((off.anchor_y - 1500.0).abs() < 1e-3);
    }

    #[test]
    fn test_word_mode_draws_only_active_word_uppercased() {
        let captions = vec![Caption::new("c0", 0.0, 3.0, "one two three")];
        let active = resolve_caption(2.5, &captions).unwrap();
        let style = plain_style().word_by_word().uppercase();

        let mut surface = RecordingSurface::new(100, 100);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(100, 100)), &inputs(&style, Some(&active)));
        assert_eq!(fill_texts(&surface), vec!["THREE"]);
    }

    // -------------------------------------------------------------------------
    // Per-word routine
    // -------------------------------------------------------------------------

    #[test]
    fn test_per_word_order_background_stroke_fill() {
        let captions = vec![Caption::new("c0", 0.0, 1.0, "Go")];
        let active = resolve_caption(0.5, &captions).unwrap();
        let style = preset(PresetKey::HormoziVar1).clone();
        assert!(style.stroke.is_some());

        let mut surface = RecordingSurface::new(1000, 1000);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(1000, 1000)), &inputs(&style, Some(&active)));

        let kinds: Vec<&str> = surface
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::RoundRect { .. } => Some("rect"),
                DrawOp::StrokeText { .. } => Some("stroke"),
                DrawOp::FillText { .. } => Some("fill"),
                _ => None,
            })
            .collect();
        let expected: Vec<&str> = if style.background.is_some() {
            vec!["rect", "stroke", "fill"]
        } else {
            vec!["stroke", "fill"]
        };
        assert_eq!(kinds, expected);
    }

    #[test]
    fn test_background_rect_geometry_and_shadow_scaling() {
        let captions = vec![Caption::new("c0", 0.0, 1.0, "abcd")];
        let active = resolve_caption(0.5, &captions).unwrap();
        let style = plain_style()
            .background(Color::BLACK)
            .padding(10.0)
            .radius(5.0)
            .shadow(Color::BLACK, 4.0, 0.0, 2.0);

        // 1000 high → sf = 1, font 60, "abcd" = 4 * 60 * 0.6 = 144 wide
        let mut surface = RecordingSurface::new(1000, 1000);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(1000, 1000)), &inputs(&style, Some(&active)));

        let rect = surface
            .ops()
            .iter()
            .find(|op| matches!(op, DrawOp::RoundRect { .. }))
            .unwrap();
        match rect {
            DrawOp::RoundRect {
                x,
                y,
                width,
                height,
                radius,
                ..
            } => {
                assert!((width - 164.0).abs() < 1e-3);
                assert!((height - 80.0).abs() < 1e-3);
                assert!((x - (500.0 - 82.0)).abs() < 1e-3);
                assert!((y - (750.0 - 40.0)).abs() < 1e-3);
                assert_eq!(*radius, 5.0);
            }
            _ => unreachable!(),
        }

        match surface.fills()[0] {
            DrawOp::FillText { shadow, .. } => {
                let shadow = shadow.unwrap();
                assert_eq!(shadow.blur, 4.0);
                assert_eq!(shadow.offset_y, 2.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_viral_word_color_overrides_active_color() {
        let caption = Caption::new("c0", 0.0, 2.0, "big money")
            .with_word_colors(vec![Color::hex(0x4ADE80), Color::hex(0xEF4444)]);
        let captions = vec![caption];
        let active = resolve_caption(1.5, &captions).unwrap();

        let mut viral = plain_style();
        viral.category = StyleCategory::Viral;

        let mut surface = RecordingSurface::new(1000, 1000);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(1000, 1000)), &inputs(&viral, Some(&active)));
        let colors: Vec<Color> = surface
            .fills()
            .iter()
            .map(|op| match op {
                DrawOp::FillText { color, .. } => *color,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(colors, vec![Color::hex(0x4ADE80), Color::hex(0xEF4444)]);

        // Same caption, non-viral style: colors ignored
        let style = plain_style();
        let mut surface = RecordingSurface::new(1000, 1000);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(1000, 1000)), &inputs(&style, Some(&active)));
        match surface.fills()[1] {
            DrawOp::FillText { color, .. } => assert_eq!(*color, Color::hex(0xFFFF00)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_pop_scales_active_word_without_moving_it() {
        let captions = vec![Caption::new("c0", 0.0, 2.0, "Hello world")];
        let active = resolve_caption(1.0, &captions).unwrap();

        let still = plain_style();
        let pop = plain_style().animation(AnimationKind::Pop);

        let mut a = RecordingSurface::new(1080, 1920);
        let mut b = RecordingSurface::new(1080, 1920);
        let f = frame(1080, 1920);
        FrameCompositor::new().compose(Some(&mut a), Some(&f), &inputs(&still, Some(&active)));
        FrameCompositor::new().compose(Some(&mut b), Some(&f), &inputs(&pop, Some(&active)));

        match (a.fills()[1], b.fills()[1]) {
            (
                DrawOp::FillText { x: xa, y: ya, size: sa, .. },
                DrawOp::FillText { x: xb, y: yb, size: sb, .. },
            ) => {
                assert_eq!((xa, ya), (xb, yb));
                assert!((sb / sa - 1.15).abs() < 1e-4);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_outline_only_inactive_words() {
        let captions = vec![Caption::new("c0", 0.0, 2.0, "Hello world")];
        let active = resolve_caption(1.0, &captions).unwrap();
        let style = plain_style().stroke(2.0, Color::BLACK).outline_inactive();

        let mut surface = RecordingSurface::new(1000, 1000);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(1000, 1000)), &inputs(&style, Some(&active)));
        assert_eq!(fill_texts(&surface), vec!["world"]);
        let strokes = surface
            .ops()
            .iter()
            .filter(|op| matches!(op, DrawOp::StrokeText { .. }))
            .count();
        assert_eq!(strokes, 2);
    }

    // -------------------------------------------------------------------------
    // Watermark
    // -------------------------------------------------------------------------

    #[test]
    fn test_watermark_drawn_last_top_right() {
        let captions = vec![Caption::new("c0", 0.0, 2.0, "Hi")];
        let active = resolve_caption(1.0, &captions).unwrap();
        let style = plain_style();
        let mut frame_inputs = inputs(&style, Some(&active));
        frame_inputs.watermark = true;
        frame_inputs.zoom = 1.3;

        let mut surface = RecordingSurface::new(1080, 1920);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(1080, 1920)), &frame_inputs);

        match surface.ops().last().unwrap() {
            DrawOp::FillText {
                text,
                x,
                y,
                anchor,
                alpha,
                size,
                color,
                ..
            } => {
                assert_eq!(text, "capgen.ai");
                assert_eq!(*anchor, TextAnchor::TopRight);
                assert!((x - (1080.0 - 57.6)).abs() < 1e-3);
                assert!((y - 57.6).abs() < 1e-3);
                assert!((size - 76.8).abs() < 1e-3);
                assert_eq!(*alpha, 0.8);
                assert_eq!(*color, Color::hex(0x3B82F6));
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_no_watermark_when_not_exporting() {
        let style = plain_style();
        let mut surface = RecordingSurface::new(100, 100);
        FrameCompositor::new().compose(Some(&mut surface), Some(&frame(100, 100)), &inputs(&style, None));
        assert!(surface.fills().is_empty());
    }
}
