//! Caption Style Module
//!
//! - `models`: StyleConfig and its component types
//! - `catalog`: the static preset catalog keyed by [`PresetKey`]
//! - `resolver`: preset + user overrides → active render configuration

pub mod catalog;
pub mod models;
pub mod resolver;

pub use catalog::{all as all_presets, preset, presets_in, PresetKey};
pub use models::*;
pub use resolver::{resolve, ActiveRenderConfig, StyleOverrides, StyleResolver};
