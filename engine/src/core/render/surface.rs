//! Render Surface
//!
//! The raster target the compositor draws into each frame. Modeled on a
//! 2D canvas: an affine transform stack (translate + uniform scale), global
//! alpha, a current font, an optional text shadow, and a handful of draw
//! primitives. Text is always anchored on its measured box, never on the
//! pen origin.

use crate::core::Color;

// =============================================================================
// Inputs
// =============================================================================

/// One decoded video frame in straight-alpha RGBA8
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl VideoFrame {
    /// Wraps an RGBA buffer; `None` when the length does not match the size.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Frame filled with a single color
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let pixels = [color.r, color.g, color.b, color.a]
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// RGBA of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ])
    }
}

/// Font selection: CSS-style family list, numeric weight, size in user units
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16,
    pub size: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            weight: 400,
            size: 16.0,
        }
    }
}

/// Which point of the measured text box sits on the given coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    /// Horizontal center, vertical middle
    Center,
    /// Right edge, top edge
    TopRight,
}

/// Text shadow in device pixels (unaffected by the transform)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSpec {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ShadowSpec {
    /// A shadow with nothing to draw is skipped entirely
    pub fn is_visible(&self) -> bool {
        self.color.a > 0 && (self.blur > 0.0 || self.offset_x != 0.0 || self.offset_y != 0.0)
    }
}

// =============================================================================
// Transform / State
// =============================================================================

/// Translate + uniform scale, mapping user space to device pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub tx: f32,
    pub ty: f32,
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            tx: 0.0,
            ty: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform {
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.tx + x * self.scale, self.ty + y * self.scale)
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.tx += x * self.scale;
        self.ty += y * self.scale;
    }

    pub fn scale_by(&mut self, factor: f32) {
        self.scale *= factor;
    }
}

/// Graphics state captured by `save` and restored by `restore`
#[derive(Debug, Clone, PartialEq)]
pub struct DrawState {
    pub transform: Transform,
    pub alpha: f32,
    pub font: FontSpec,
    pub shadow: Option<ShadowSpec>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            alpha: 1.0,
            font: FontSpec::default(),
            shadow: None,
        }
    }
}

/// Current state plus the saved stack; shared by surface implementations
#[derive(Debug, Clone, Default)]
pub struct StateStack {
    current: DrawState,
    saved: Vec<DrawState>,
}

impl StateStack {
    pub fn current(&self) -> &DrawState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut DrawState {
        &mut self.current
    }

    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Unbalanced restores are ignored
    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }

    pub fn reset(&mut self) {
        self.current = DrawState::default();
        self.saved.clear();
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Width measurement with the current font, in user units
pub trait TextMeasure {
    fn measure_text(&mut self, text: &str) -> f32;
}

/// Canvas-like raster target
pub trait RenderSurface: TextMeasure + Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resizes the backing store; contents and state are reset
    fn resize(&mut self, width: u32, height: u32);

    /// Clears every pixel to transparent
    fn clear(&mut self);

    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    fn scale(&mut self, factor: f32);

    fn set_font(&mut self, font: &FontSpec);
    fn set_alpha(&mut self, alpha: f32);
    fn set_shadow(&mut self, shadow: Option<ShadowSpec>);

    /// Draws `frame` stretched into the user-space rectangle
    fn draw_frame(&mut self, frame: &VideoFrame, x: f32, y: f32, width: f32, height: f32);

    fn fill_round_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        color: Color,
    );

    /// Strokes the text outline with a line of `line_width` user units
    fn stroke_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        anchor: TextAnchor,
        line_width: f32,
        color: Color,
    );

    fn fill_text(&mut self, text: &str, x: f32, y: f32, anchor: TextAnchor, color: Color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_center_zoom() {
        // translate(w/2,h/2) scale(z) translate(-w/2,-h/2) keeps the center fixed
        let mut t = Transform::default();
        t.translate(540.0, 960.0);
        t.scale_by(1.1);
        t.translate(-540.0, -960.0);

        let (cx, cy) = t.apply(540.0, 960.0);
        assert!((cx - 540.0).abs() < 1e-3);
        assert!((cy - 960.0).abs() < 1e-3);

        let (x0, y0) = t.apply(0.0, 0.0);
        assert!((x0 - -54.0).abs() < 1e-3);
        assert!((y0 - -96.0).abs() < 1e-3);
    }

    #[test]
    fn test_state_stack_save_restore() {
        let mut stack = StateStack::default();
        stack.current_mut().alpha = 0.5;
        stack.save();
        stack.current_mut().alpha = 0.1;
        stack.current_mut().transform.translate(10.0, 0.0);
        assert_eq!(stack.depth(), 1);

        stack.restore();
        assert_eq!(stack.current().alpha, 0.5);
        assert_eq!(stack.current().transform, Transform::default());

        stack.restore();
        assert_eq!(stack.current().alpha, 0.5);
    }

    #[test]
    fn test_video_frame_from_rgba_checks_length() {
        assert!(VideoFrame::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(VideoFrame::from_rgba(2, 2, vec![0; 15]).is_none());

        let frame = VideoFrame::solid(3, 2, Color::hex(0x102030));
        assert_eq!(frame.pixel(2, 1), Some([0x10, 0x20, 0x30, 255]));
        assert_eq!(frame.pixel(3, 0), None);
    }

    #[test]
    fn test_shadow_visibility() {
        let mut shadow = ShadowSpec {
            color: Color::BLACK,
            blur: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        };
        assert!(!shadow.is_visible());
        shadow.offset_y = 2.0;
        assert!(shadow.is_visible());
        shadow.color = Color::TRANSPARENT;
        assert!(!shadow.is_visible());
    }
}
