//! Frame Rendering Module
//!
//! - `surface`: the canvas-like render target interface
//! - `layout`: word geometry (wrap, alignment, vertical centering)
//! - `animation`: per-word effects keyed off word timing
//! - `compositor`: the per-frame draw sequence
//! - `raster`: CPU RGBA surface (cosmic-text + image)
//! - `display_list`: recording surface with deterministic metrics

pub mod animation;
pub mod compositor;
pub mod display_list;
pub mod layout;
pub mod raster;
pub mod surface;

pub use animation::{word_effect, WordEffect, WordTiming};
pub use compositor::{
    frame_geometry, CaptionPlacement, FrameCompositor, FrameGeometry, FrameInputs, FrameOutcome,
    Watermark,
};
pub use display_list::{DrawOp, RecordingSurface};
pub use layout::{layout_block, layout_word, wrap_lines, CaptionLayout, LineBox, WordBox};
pub use raster::RasterSurface;
pub use surface::{
    FontSpec, RenderSurface, ShadowSpec, TextAnchor, TextMeasure, Transform, VideoFrame,
};
