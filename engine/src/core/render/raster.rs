//! Raster Surface
//!
//! CPU RGBA8 implementation of [`RenderSurface`]. Text is shaped and
//! rasterized with cosmic-text into a coverage mask, then composited with
//! straight-alpha source-over blending. Outlines are produced by dilating
//! the glyph coverage; shadows are the (optionally box-blurred) coverage
//! drawn at an offset underneath.

use std::f32::consts::TAU;
use std::fmt;
use std::path::Path;

use cosmic_text::{
    Attrs, Buffer, Color as TextColor, Family, FontSystem, Metrics, Shaping, SwashCache, Weight,
};
use image::{ImageFormat, RgbaImage};
use tracing::debug;

use super::surface::{
    FontSpec, RenderSurface, ShadowSpec, StateStack, TextAnchor, TextMeasure, VideoFrame,
};
use crate::core::{Color, CoreError, CoreResult};

/// Line box height as a multiple of the font size
const TEXT_LINE_HEIGHT: f32 = 1.2;
/// Sample directions per ring when dilating coverage for outlines
const STROKE_DIRECTIONS: usize = 16;

// =============================================================================
// Font Selection
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum FamilyChoice {
    Name(String),
    SansSerif,
    Serif,
    Monospace,
    Cursive,
    Fantasy,
}

impl FamilyChoice {
    fn as_family(&self) -> Family<'_> {
        match self {
            FamilyChoice::Name(name) => Family::Name(name),
            FamilyChoice::SansSerif => Family::SansSerif,
            FamilyChoice::Serif => Family::Serif,
            FamilyChoice::Monospace => Family::Monospace,
            FamilyChoice::Cursive => Family::Cursive,
            FamilyChoice::Fantasy => Family::Fantasy,
        }
    }
}

/// First entry of a CSS family list that is generic or installed
fn choose_family(font_system: &FontSystem, css: &str) -> FamilyChoice {
    for entry in css.split(',') {
        let name = entry.trim().trim_matches(|c| c == '"' || c == '\'');
        if name.is_empty() {
            continue;
        }
        match name.to_ascii_lowercase().as_str() {
            "sans-serif" | "system-ui" => return FamilyChoice::SansSerif,
            "serif" => return FamilyChoice::Serif,
            "monospace" => return FamilyChoice::Monospace,
            "cursive" => return FamilyChoice::Cursive,
            "fantasy" => return FamilyChoice::Fantasy,
            _ => {
                let installed = font_system.db().faces().any(|face| {
                    face.families
                        .iter()
                        .any(|(family, _)| family.eq_ignore_ascii_case(name))
                });
                if installed {
                    return FamilyChoice::Name(name.to_string());
                }
            }
        }
    }
    FamilyChoice::SansSerif
}

// =============================================================================
// Coverage Masks
// =============================================================================

/// Rasterized single-line text with `margin` pixels of padding on each side
#[derive(Debug, Clone)]
struct TextMask {
    width: usize,
    height: usize,
    coverage: Vec<u8>,
    text_width: f32,
    line_height: f32,
    margin: f32,
}

/// Grows coverage outward by `radius` pixels
fn dilate(coverage: &[u8], width: usize, height: usize, radius: f32) -> Vec<u8> {
    let mut out = coverage.to_vec();
    if radius < 0.5 {
        return out;
    }

    let mut offsets = Vec::with_capacity(STROKE_DIRECTIONS * 2);
    for ring in [radius, radius * 0.5] {
        for k in 0..STROKE_DIRECTIONS {
            let angle = k as f32 * TAU / STROKE_DIRECTIONS as f32;
            offsets.push((
                (angle.cos() * ring).round() as i32,
                (angle.sin() * ring).round() as i32,
            ));
        }
    }
    offsets.sort_unstable();
    offsets.dedup();

    for (ox, oy) in offsets {
        for y in 0..height {
            let sy = y as i32 - oy;
            if sy < 0 || sy >= height as i32 {
                continue;
            }
            let src_row = sy as usize * width;
            let dst_row = y * width;
            for x in 0..width {
                let sx = x as i32 - ox;
                if sx < 0 || sx >= width as i32 {
                    continue;
                }
                let value = coverage[src_row + sx as usize];
                if value > out[dst_row + x] {
                    out[dst_row + x] = value;
                }
            }
        }
    }
    out
}

/// Separable box blur, one horizontal and one vertical pass
fn box_blur(coverage: &[u8], width: usize, height: usize, radius: usize) -> Vec<u8> {
    if radius == 0 || width == 0 || height == 0 {
        return coverage.to_vec();
    }
    let window = (radius * 2 + 1) as u32;

    let mut horizontal = vec![0u8; coverage.len()];
    for y in 0..height {
        let row = &coverage[y * width..(y + 1) * width];
        for x in 0..width {
            let lo = x.saturating_sub(radius);
            let hi = (x + radius).min(width - 1);
            let sum: u32 = row[lo..=hi].iter().map(|&v| v as u32).sum();
            horizontal[y * width + x] = (sum / window) as u8;
        }
    }

    let mut out = vec![0u8; coverage.len()];
    for x in 0..width {
        for y in 0..height {
            let lo = y.saturating_sub(radius);
            let hi = (y + radius).min(height - 1);
            let sum: u32 = (lo..=hi).map(|yy| horizontal[yy * width + x] as u32).sum();
            out[y * width + x] = (sum / window) as u8;
        }
    }
    out
}

/// Straight-alpha source-over of one RGB color onto an RGBA pixel
fn blend_over(dst: &mut [u8], rgb: [u8; 3], src_a: f32) {
    let src_a = src_a.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }
    for (channel, &src) in dst.iter_mut().take(3).zip(rgb.iter()) {
        let s = src as f32 / 255.0;
        let d = *channel as f32 / 255.0;
        let out = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        *channel = (out * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Coverage of a pixel center by a rounded rectangle (signed-distance AA)
fn round_rect_coverage(px: f32, py: f32, x: f32, y: f32, w: f32, h: f32, r: f32) -> f32 {
    let half_w = w / 2.0;
    let half_h = h / 2.0;
    let qx = (px - (x + half_w)).abs() - (half_w - r);
    let qy = (py - (y + half_h)).abs() - (half_h - r);
    let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
    let inside = qx.max(qy).min(0.0);
    let distance = outside + inside - r;
    (0.5 - distance).clamp(0.0, 1.0)
}

// =============================================================================
// RasterSurface
// =============================================================================

pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    state: StateStack,
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl fmt::Debug for RasterSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl RasterSurface {
    /// Creates a surface backed by the system font database
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_font_system(width, height, FontSystem::new())
    }

    pub fn with_font_system(width: u32, height: u32, font_system: FontSystem) -> Self {
        debug!(
            "Creating raster surface {}x{} ({} font faces)",
            width,
            height,
            font_system.db().len()
        );
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            state: StateStack::default(),
            font_system,
            swash_cache: SwashCache::new(),
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

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

    /// Snapshot of the current pixels
    pub fn to_frame(&self) -> VideoFrame {
        VideoFrame {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }

    pub fn save_png(&self, path: &Path) -> CoreResult<()> {
        let image = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| CoreError::RenderFailed("Pixel buffer size mismatch".to_string()))?;
        image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| CoreError::RenderFailed(format!("Failed to write PNG: {}", e)))?;
        debug!("Wrote frame to {}", path.display());
        Ok(())
    }

    /// Shapes `text` at `size` device pixels with the current font
    fn shape(&mut self, text: &str, size: f32) -> Option<(Buffer, f32)> {
        if text.is_empty() || !size.is_finite() || size <= 0.0 {
            return None;
        }
        let font = self.state.current().font.clone();
        let family = choose_family(&self.font_system, &font.family);

        let metrics = Metrics::new(size, size * TEXT_LINE_HEIGHT);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_size(&mut self.font_system, None, None);
        let attrs = Attrs::new()
            .family(family.as_family())
            .weight(Weight(font.weight));
        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(&mut self.font_system, false);

        let width = buffer
            .layout_runs()
            .flat_map(|run| run.glyphs.iter())
            .map(|glyph| glyph.x + glyph.w)
            .fold(0.0f32, f32::max);
        Some((buffer, width))
    }

    fn text_mask(&mut self, text: &str, size: f32, pad: f32) -> Option<TextMask> {
        let (buffer, text_width) = self.shape(text, size)?;
        let line_height = size * TEXT_LINE_HEIGHT;
        let margin = (size * 0.25 + pad.max(0.0)).ceil();
        let width = (text_width.ceil() + margin * 2.0) as usize;
        let height = (line_height.ceil() + margin * 2.0) as usize;
        let offset = margin as i32;

        let mut coverage = vec![0u8; width * height];
        buffer.draw(
            &mut self.font_system,
            &mut self.swash_cache,
            TextColor::rgba(255, 255, 255, 255),
            |x, y, w, h, color| {
                let alpha = color.a();
                if alpha == 0 {
                    return;
                }
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let mx = x + dx + offset;
                        let my = y + dy + offset;
                        if mx < 0 || my < 0 || mx as usize >= width || my as usize >= height {
                            continue;
                        }
                        let idx = my as usize * width + mx as usize;
                        coverage[idx] = coverage[idx].max(alpha);
                    }
                }
            },
        );

        Some(TextMask {
            width,
            height,
            coverage,
            text_width,
            line_height,
            margin,
        })
    }

    fn composite(
        &mut self,
        coverage: &[u8],
        mask_width: usize,
        mask_height: usize,
        origin: (i32, i32),
        color: Color,
        alpha: f32,
    ) {
        let base = color.alpha() * alpha;
        if base <= 0.0 {
            return;
        }
        let (w, h) = (self.width as i32, self.height as i32);
        let rgb = [color.r, color.g, color.b];

        for my in 0..mask_height {
            let py = origin.1 + my as i32;
            if py < 0 || py >= h {
                continue;
            }
            for mx in 0..mask_width {
                let value = coverage[my * mask_width + mx];
                if value == 0 {
                    continue;
                }
                let px = origin.0 + mx as i32;
                if px < 0 || px >= w {
                    continue;
                }
                let idx = (py as usize * self.width as usize + px as usize) * 4;
                blend_over(
                    &mut self.pixels[idx..idx + 4],
                    rgb,
                    base * value as f32 / 255.0,
                );
            }
        }
    }

    /// Draws shadow (if any) then the text coverage at the anchored position
    fn paint_text(
        &mut self,
        mask: &TextMask,
        coverage: &[u8],
        x: f32,
        y: f32,
        anchor: TextAnchor,
        color: Color,
    ) {
        let (left, top) = match anchor {
            TextAnchor::Center => (x - mask.text_width / 2.0, y - mask.line_height / 2.0),
            TextAnchor::TopRight => (x - mask.text_width, y),
        };
        let origin = (
            (left - mask.margin).round() as i32,
            (top - mask.margin).round() as i32,
        );
        let alpha = self.state.current().alpha;

        if let Some(shadow) = self.state.current().shadow.filter(ShadowSpec::is_visible) {
            let radius = (shadow.blur / 2.0).round().max(0.0) as usize;
            let blurred = box_blur(coverage, mask.width, mask.height, radius);
            let shadow_origin = (
                origin.0 + shadow.offset_x.round() as i32,
                origin.1 + shadow.offset_y.round() as i32,
            );
            self.composite(
                &blurred,
                mask.width,
                mask.height,
                shadow_origin,
                shadow.color,
                alpha,
            );
        }

        self.composite(coverage, mask.width, mask.height, origin, color, alpha);
    }

    fn shadow_pad(&self) -> f32 {
        self.state
            .current()
            .shadow
            .map(|s| s.blur + s.offset_x.abs().max(s.offset_y.abs()))
            .unwrap_or(0.0)
    }
}

impl TextMeasure for RasterSurface {
    fn measure_text(&mut self, text: &str) -> f32 {
        let size = self.state.current().font.size;
        self.shape(text, size).map(|(_, width)| width).unwrap_or(0.0)
    }
}

impl RenderSurface for RasterSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn resize(&mut self, width: u32, height: u32) {
        debug!("Resizing raster surface to {}x{}", width, height);
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
        self.state.reset();
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
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

    fn draw_frame(&mut self, frame: &VideoFrame, x: f32, y: f32, width: f32, height: f32) {
        if frame.width == 0 || frame.height == 0 || width <= 0.0 || height <= 0.0 {
            return;
        }
        let state = self.state.current();
        let alpha = state.alpha;
        let t = state.transform;
        let (x0, y0) = t.apply(x, y);
        let dw = width * t.scale;
        let dh = height * t.scale;

        let px_start = x0.floor().max(0.0) as u32;
        let py_start = y0.floor().max(0.0) as u32;
        let px_end = ((x0 + dw).ceil().max(0.0) as u32).min(self.width);
        let py_end = ((y0 + dh).ceil().max(0.0) as u32).min(self.height);

        for py in py_start..py_end {
            let v = ((py as f32 + 0.5 - y0) / dh * frame.height as f32).floor();
            if v < 0.0 || v >= frame.height as f32 {
                continue;
            }
            for px in px_start..px_end {
                let u = ((px as f32 + 0.5 - x0) / dw * frame.width as f32).floor();
                if u < 0.0 || u >= frame.width as f32 {
                    continue;
                }
                let src = (v as usize * frame.width as usize + u as usize) * 4;
                let dst = (py as usize * self.width as usize + px as usize) * 4;
                let src_a = frame.pixels[src + 3] as f32 / 255.0 * alpha;
                if src_a >= 1.0 {
                    self.pixels[dst..dst + 4].copy_from_slice(&frame.pixels[src..src + 4]);
                } else {
                    let rgb = [frame.pixels[src], frame.pixels[src + 1], frame.pixels[src + 2]];
                    blend_over(&mut self.pixels[dst..dst + 4], rgb, src_a);
                }
            }
        }
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
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let state = self.state.current();
        let base = color.alpha() * state.alpha;
        if base <= 0.0 {
            return;
        }
        let t = state.transform;
        let (x0, y0) = t.apply(x, y);
        let dw = width * t.scale;
        let dh = height * t.scale;
        let r = (radius * t.scale).clamp(0.0, dw.min(dh) / 2.0);
        let rgb = [color.r, color.g, color.b];

        let px_start = x0.floor().max(0.0) as u32;
        let py_start = y0.floor().max(0.0) as u32;
        let px_end = ((x0 + dw).ceil().max(0.0) as u32).min(self.width);
        let py_end = ((y0 + dh).ceil().max(0.0) as u32).min(self.height);

        for py in py_start..py_end {
            for px in px_start..px_end {
                let cov =
                    round_rect_coverage(px as f32 + 0.5, py as f32 + 0.5, x0, y0, dw, dh, r);
                if cov <= 0.0 {
                    continue;
                }
                let idx = (py as usize * self.width as usize + px as usize) * 4;
                blend_over(&mut self.pixels[idx..idx + 4], rgb, base * cov);
            }
        }
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
        let t = self.state.current().transform;
        let size = self.state.current().font.size * t.scale;
        let radius = (line_width * t.scale / 2.0).max(0.0);
        let pad = radius + self.shadow_pad();
        let Some(mask) = self.text_mask(text, size, pad) else {
            return;
        };
        let outline = dilate(&mask.coverage, mask.width, mask.height, radius);
        let (dx, dy) = t.apply(x, y);
        self.paint_text(&mask, &outline, dx, dy, anchor, color);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, anchor: TextAnchor, color: Color) {
        let t = self.state.current().transform;
        let size = self.state.current().font.size * t.scale;
        let pad = self.shadow_pad();
        let Some(mask) = self.text_mask(text, size, pad) else {
            return;
        };
        let (dx, dy) = t.apply(x, y);
        let coverage = mask.coverage.clone();
        self.paint_text(&mask, &coverage, dx, dy, anchor, color);
    }
}
