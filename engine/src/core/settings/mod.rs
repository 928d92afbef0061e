//! Settings Persistence System
//!
//! Provides persistent application settings with:
//! - Atomic file writes (temp file + rename)
//! - Tolerant loading with defaults
//! - Normalization that corrects bad values instead of failing
//!
//! Storage location: {config_dir}/capgen/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::core::ai::{LanguageMode, TranscriptionOptions};
use crate::core::export::ExportOptions;
use crate::core::motion::{MotionSettings, SfxVolume};
use crate::core::render::CaptionPlacement;
use crate::core::style::PresetKey;
use crate::core::{CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Environment variables consulted for the transcription API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Caption editor settings
    #[serde(default)]
    pub editor: EditorSettings,

    /// Export settings
    #[serde(default)]
    pub export: ExportSettings,

    /// Transcription settings
    #[serde(default)]
    pub ai: AiSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            editor: EditorSettings::default(),
            export: ExportSettings::default(),
            ai: AiSettings::default(),
        }
    }
}

impl AppSettings {
    /// Normalizes and clamps settings so persisted state is always valid.
    ///
    /// Bad values are corrected rather than rejected, so a hand-edited or
    /// old file never prevents startup.
    pub fn normalize(&mut self) {
        let editor = &mut self.editor;
        editor.font_scale = clamp_f64(editor.font_scale, 0.3, 3.0);
        editor.vertical_position = clamp_f64(editor.vertical_position, 0.0, 100.0);
        editor.horizontal_position = clamp_f64(editor.horizontal_position, 0.0, 100.0);
        editor.preset = normalize_label(
            &editor.preset,
            PresetKey::ALL.iter().map(|k| k.as_str()),
            PresetKey::Default.as_str(),
        );
        editor.sfx_volume = normalize_label(&editor.sfx_volume, ["LOW", "MED", "HIGH"], "MED");
        editor.language_mode = normalize_label(
            &editor.language_mode,
            LanguageMode::ALL.iter().map(|m| m.as_str()),
            LanguageMode::Auto.as_str(),
        );

        let export = &mut self.export;
        export.fps = export.fps.clamp(1, 120);
        if export.video_bits_per_second == 0 {
            export.video_bits_per_second = default_video_bits_per_second();
        }
        export.settle_delay_ms = export.settle_delay_ms.min(5_000);
        if export
            .output_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            export.output_dir = None;
        }

        let ai = &mut self.ai;
        ai.timeout_secs = ai.timeout_secs.clamp(10, 3_600);
        if ai.model.trim().is_empty() {
            ai.model = default_model();
        }
        if ai.base_url.as_ref().is_some_and(|url| url.trim().is_empty()) {
            ai.base_url = None;
        }
    }
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

fn normalize_label<'a>(
    value: &str,
    allowed: impl IntoIterator<Item = &'a str>,
    fallback: &str,
) -> String {
    let wanted = value.trim().replace('-', "_");
    allowed
        .into_iter()
        .find(|v| v.eq_ignore_ascii_case(&wanted))
        .unwrap_or(fallback)
        .to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Editor
// =============================================================================

/// Caption editor settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    /// Font size multiplier (1.0 = preset size)
    #[serde(default = "default_font_scale")]
    pub font_scale: f64,

    /// Caption anchor, percent of height from the top
    #[serde(default = "default_vertical_position")]
    pub vertical_position: f64,

    /// Caption anchor, percent of width from the left
    #[serde(default = "default_horizontal_position")]
    pub horizontal_position: f64,

    /// Selected style preset key
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Let per-caption transcription hints override scale and position
    #[serde(default = "default_true")]
    pub auto_adjust: bool,

    /// Emphasis zoom on active captions
    #[serde(default)]
    pub auto_motion: bool,

    /// Transition cues on caption changes
    #[serde(default)]
    pub auto_sfx: bool,

    /// Cue master volume (LOW, MED, HIGH)
    #[serde(default = "default_sfx_volume")]
    pub sfx_volume: String,

    #[serde(default)]
    pub smart_compression: bool,

    /// Transcription language policy
    #[serde(default = "default_language_mode")]
    pub language_mode: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font_scale: default_font_scale(),
            vertical_position: default_vertical_position(),
            horizontal_position: default_horizontal_position(),
            preset: default_preset(),
            auto_adjust: true,
            auto_motion: false,
            auto_sfx: false,
            sfx_volume: default_sfx_volume(),
            smart_compression: false,
            language_mode: default_language_mode(),
        }
    }
}

fn default_font_scale() -> f64 {
    1.0
}

fn default_vertical_position() -> f64 {
    75.0
}

fn default_horizontal_position() -> f64 {
    50.0
}

fn default_preset() -> String {
    PresetKey::Default.as_str().to_string()
}

fn default_sfx_volume() -> String {
    "MED".to_string()
}

fn default_language_mode() -> String {
    LanguageMode::Auto.as_str().to_string()
}

impl EditorSettings {
    /// Selected preset; unknown keys fall back to the default preset
    pub fn preset_key(&self) -> PresetKey {
        self.preset.parse().unwrap_or_default()
    }

    pub fn sfx_volume(&self) -> SfxVolume {
        SfxVolume::from_label(&self.sfx_volume).unwrap_or_default()
    }

    pub fn language_mode(&self) -> LanguageMode {
        LanguageMode::from_label(&self.language_mode).unwrap_or_default()
    }

    pub fn placement(&self) -> CaptionPlacement {
        CaptionPlacement {
            font_scale: self.font_scale,
            vertical_percent: self.vertical_position,
            horizontal_percent: self.horizontal_position,
            auto_adjust: self.auto_adjust,
        }
    }

    pub fn motion(&self) -> MotionSettings {
        MotionSettings {
            motion_enabled: self.auto_motion,
            cues_enabled: self.auto_sfx,
        }
    }

    pub fn transcription_options(&self) -> TranscriptionOptions {
        TranscriptionOptions {
            auto_adjust: self.auto_adjust,
            smart_compression: self.smart_compression,
            language_mode: self.language_mode(),
        }
    }
}

// =============================================================================
// Export
// =============================================================================

/// Export settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// Directory exported files are written to (None = current directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Capture frame rate
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Encoder target bitrate
    #[serde(default = "default_video_bits_per_second")]
    pub video_bits_per_second: u64,

    /// Pause between the seek acknowledgment and stream capture
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: None,
            fps: default_fps(),
            video_bits_per_second: default_video_bits_per_second(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

fn default_fps() -> u32 {
    30
}

fn default_video_bits_per_second() -> u64 {
    8_000_000
}

fn default_settle_delay_ms() -> u64 {
    200
}

impl ExportSettings {
    pub fn to_options(&self) -> ExportOptions {
        ExportOptions {
            fps: self.fps,
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            video_bits_per_second: self.video_bits_per_second,
            ..ExportOptions::default()
        }
    }
}

// =============================================================================
// AI
// =============================================================================

/// Transcription provider settings. The API key is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    #[serde(default = "default_model")]
    pub model: String,

    /// Override of the provider base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout; uploads of whole clips are slow
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl AiSettings {
    /// API key from the first non-empty of `GEMINI_API_KEY`, `API_KEY`
    pub fn api_key_from_env() -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

// =============================================================================
// SettingsManager
// =============================================================================

/// Settings manager for loading, saving, and resetting settings
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a new settings manager storing its file in `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            settings_path: dir.as_ref().join(SETTINGS_FILE),
        }
    }

    /// Manager rooted at the platform config directory
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("capgen")))
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings from disk, returning defaults if the file is missing or unreadable
    pub fn load(&self) -> AppSettings {
        if !self.settings_path.exists() {
            info!("Settings file not found, using defaults");
            return AppSettings::default();
        }

        let result = fs::read_to_string(&self.settings_path)
            .map_err(CoreError::from)
            .and_then(|content| {
                serde_json::from_str::<AppSettings>(&content).map_err(CoreError::from)
            });

        match result {
            Ok(mut settings) => {
                if settings.version < SETTINGS_VERSION {
                    info!(
                        "Migrating settings from version {} to {}",
                        settings.version, SETTINGS_VERSION
                    );
                    settings.version = SETTINGS_VERSION;
                }
                settings.normalize();
                settings
            }
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    /// Save settings to disk using atomic write (temp file + rename)
    pub fn save(&self, settings: &AppSettings) -> CoreResult<AppSettings> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut normalized = settings.clone();
        normalized.normalize();

        let content = serde_json::to_string_pretty(&normalized)?;

        let temp_path = self.settings_path.with_extension("json.tmp");
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }

        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        // std::fs::rename does not overwrite on Windows.
        if cfg!(windows) && self.settings_path.exists() {
            fs::remove_file(&self.settings_path)?;
        }
        fs::rename(&temp_path, &self.settings_path)?;

        info!("Settings saved to {:?}", self.settings_path);
        Ok(normalized)
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<AppSettings> {
        if self.settings_path.exists() {
            fs::remove_file(&self.settings_path)?;
            info!("Settings file deleted");
        }
        Ok(AppSettings::default())
    }
}
