//! Recording Surface
//!
//! A [`RenderSurface`] that records every draw call as a [`DrawOp`] in
//! device coordinates instead of rasterizing. Text metrics are a fixed
//! advance per character, so compositor output is deterministic without
//! any font files installed.

use super::surface::{
    FontSpec, RenderSurface, ShadowSpec, StateStack, TextAnchor, TextMeasure, VideoFrame,
};
use crate::core::Color;

/// Advance of one character, as a fraction of the font size
pub const CHAR_ADVANCE: f32 = 0.6;

/// One recorded draw call, fully resolved to device space
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Frame {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    RoundRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        color: Color,
        alpha: f32,
    },
    StrokeText {
        text: String,
        x: f32,
        y: f32,
        anchor: TextAnchor,
        size: f32,
        line_width: f32,
        color: Color,
        alpha: f32,
        shadow: Option<ShadowSpec>,
    },
    FillText {
        text: String,
        x: f32,
        y: f32,
        anchor: TextAnchor,
        size: f32,
        font: FontSpec,
        color: Color,
        alpha: f32,
        shadow: Option<ShadowSpec>,
    },
}

impl DrawOp {
    /// Text carried by a stroke or fill op
    pub fn text(&self) -> Option<&str> {
        match self {
            DrawOp::StrokeText { text, .. } | DrawOp::FillText { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    state: StateStack,
    ops: Vec<DrawOp>,
    resize_count: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Every filled text op, in draw order
    pub fn fills(&self) -> Vec<&DrawOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillText { .. }))
            .collect()
    }

    pub fn resize_count(&self) -> usize {
        self.resize_count
    }

    pub fn save_depth(&self) -> usize {
        self.state.depth()
    }

    fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.state.current().font.size * CHAR_ADVANCE
    }
}

impl TextMeasure for RecordingSurface {
    fn measure_text(&mut self, text: &str) -> f32 {
        self.text_width(text)
    }
}

impl RenderSurface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.state.reset();
        self.resize_count += 1;
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn save(&mut self) {
        self.state.save();
    }

    fn restore(&mut self) {
        self.state.restore();
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.state.current_mut().transform.translate(x, y);
    }

    fn scale(&mut self, factor: f32) {
        self.state.current_mut().transform.scale_by(factor);
    }

    fn set_font(&mut self, font: &FontSpec) {
        self.state.current_mut().font = font.clone();
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.state.current_mut().alpha = alpha.clamp(0.0, 1.0);
    }

    fn set_shadow(&mut self, shadow: Option<ShadowSpec>) {
        self.state.current_mut().shadow = shadow;
    }

    fn draw_frame(&mut self, _frame: &VideoFrame, x: f32, y: f32, width: f32, height: f32) {
        let t = self.state.current().transform;
        let (dx, dy) = t.apply(x, y);
        self.ops.push(DrawOp::Frame {
            x: dx,
            y: dy,
            width: width * t.scale,
            height: height * t.scale,
        });
    }

    fn fill_round_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        color: Color,
    ) {
        let state = self.state.current();
        let t = state.transform;
        let (dx, dy) = t.apply(x, y);
        self.ops.push(DrawOp::RoundRect {
            x: dx,
            y: dy,
            width: width * t.scale,
            height: height * t.scale,
            radius: radius * t.scale,
            color,
            alpha: state.alpha,
        });
    }

    fn stroke_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        anchor: TextAnchor,
        line_width: f32,
        color: Color,
    ) {
        let state = self.state.current();
        let t = state.transform;
        let (dx, dy) = t.apply(x, y);
        self.ops.push(DrawOp::StrokeText {
            text: text.to_string(),
            x: dx,
            y: dy,
            anchor,
            size: state.font.size * t.scale,
            line_width: line_width * t.scale,
            color,
            alpha: state.alpha,
            shadow: state.shadow,
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, anchor: TextAnchor, color: Color) {
        let state = self.state.current();
        let t = state.transform;
        let (dx, dy) = t.apply(x, y);
        self.ops.push(DrawOp::FillText {
            text: text.to_string(),
            x: dx,
            y: dy,
            anchor,
            size: state.font.size * t.scale,
            font: state.font.clone(),
            color,
            alpha: state.alpha,
            shadow: state.shadow,
        });
    }
}
