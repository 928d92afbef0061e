//! Style Preset Catalog
//!
//! Static, read-only mapping from preset key to [`StyleConfig`].

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::models::{AnimationKind, StyleCategory, StyleConfig};
use crate::core::{Color, CoreError, CoreResult};

// =============================================================================
// Preset Keys
// =============================================================================

/// Named preset key.
///
/// `Custom` is the pseudo-preset whose values always come from user overrides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetKey {
    #[default]
    Default,
    #[serde(rename = "HORMOZI_VAR1")]
    HormoziVar1,
    #[serde(rename = "HORMOZI_VAR2")]
    HormoziVar2,
    BeastMode,
    KaraokeNeon,
    GlitchCyber,
    MinimalBox,
    Typewriter,
    DesiVlog,
    TamilThalaiva,
    RapidSprint,
    WordHormoziFocus,
    WordFutureNeon,
    WordGlitchChaos,
    WordRetroPixel,
    WordLuxurySerif,
    WordComicImpact,
    WordVlogAesthetic,
    WordBoldSports,
    WordGameStreamer,
    WordNoirCrime,
    WordInstaPop,
    WordGradientDream,
    WordTapeHighlight,
    WordNeonStorm,
    #[serde(rename = "WORD_SUPER_3D")]
    WordSuper3d,
    WordLyricistOutline,
    BlockCleanFocus,
    BlockCinematicFade,
    WordSoftGlow,
    WordActiveBox,
    ColorPopViral,
    ViralComic,
    ViralProClean,
    ViralLoudNeon,
    ViralHyperBold,
    Custom,
}

impl PresetKey {
    /// All keys in catalog order
    pub const ALL: [PresetKey; 37] = [
        PresetKey::Default,
        PresetKey::HormoziVar1,
        PresetKey::HormoziVar2,
        PresetKey::BeastMode,
        PresetKey::KaraokeNeon,
        PresetKey::GlitchCyber,
        PresetKey::MinimalBox,
        PresetKey::Typewriter,
        PresetKey::DesiVlog,
        PresetKey::TamilThalaiva,
        PresetKey::RapidSprint,
        PresetKey::WordHormoziFocus,
        PresetKey::WordFutureNeon,
        PresetKey::WordGlitchChaos,
        PresetKey::WordRetroPixel,
        PresetKey::WordLuxurySerif,
        PresetKey::WordComicImpact,
        PresetKey::WordVlogAesthetic,
        PresetKey::WordBoldSports,
        PresetKey::WordGameStreamer,
        PresetKey::WordNoirCrime,
        PresetKey::WordInstaPop,
        PresetKey::WordGradientDream,
        PresetKey::WordTapeHighlight,
        PresetKey::WordNeonStorm,
        PresetKey::WordSuper3d,
        PresetKey::WordLyricistOutline,
        PresetKey::BlockCleanFocus,
        PresetKey::BlockCinematicFade,
        PresetKey::WordSoftGlow,
        PresetKey::WordActiveBox,
        PresetKey::ColorPopViral,
        PresetKey::ViralComic,
        PresetKey::ViralProClean,
        PresetKey::ViralLoudNeon,
        PresetKey::ViralHyperBold,
        PresetKey::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetKey::Default => "DEFAULT",
            PresetKey::HormoziVar1 => "HORMOZI_VAR1",
            PresetKey::HormoziVar2 => "HORMOZI_VAR2",
            PresetKey::BeastMode => "BEAST_MODE",
            PresetKey::KaraokeNeon => "KARAOKE_NEON",
            PresetKey::GlitchCyber => "GLITCH_CYBER",
            PresetKey::MinimalBox => "MINIMAL_BOX",
            PresetKey::Typewriter => "TYPEWRITER",
            PresetKey::DesiVlog => "DESI_VLOG",
            PresetKey::TamilThalaiva => "TAMIL_THALAIVA",
            PresetKey::RapidSprint => "RAPID_SPRINT",
            PresetKey::WordHormoziFocus => "WORD_HORMOZI_FOCUS",
            PresetKey::WordFutureNeon => "WORD_FUTURE_NEON",
            PresetKey::WordGlitchChaos => "WORD_GLITCH_CHAOS",
            PresetKey::WordRetroPixel => "WORD_RETRO_PIXEL",
            PresetKey::WordLuxurySerif => "WORD_LUXURY_SERIF",
            PresetKey::WordComicImpact => "WORD_COMIC_IMPACT",
            PresetKey::WordVlogAesthetic => "WORD_VLOG_AESTHETIC",
            PresetKey::WordBoldSports => "WORD_BOLD_SPORTS",
            PresetKey::WordGameStreamer => "WORD_GAME_STREAMER",
            PresetKey::WordNoirCrime => "WORD_NOIR_CRIME",
            PresetKey::WordInstaPop => "WORD_INSTA_POP",
            PresetKey::WordGradientDream => "WORD_GRADIENT_DREAM",
            PresetKey::WordTapeHighlight => "WORD_TAPE_HIGHLIGHT",
            PresetKey::WordNeonStorm => "WORD_NEON_STORM",
            PresetKey::WordSuper3d => "WORD_SUPER_3D",
            PresetKey::WordLyricistOutline => "WORD_LYRICIST_OUTLINE",
            PresetKey::BlockCleanFocus => "BLOCK_CLEAN_FOCUS",
            PresetKey::BlockCinematicFade => "BLOCK_CINEMATIC_FADE",
            PresetKey::WordSoftGlow => "WORD_SOFT_GLOW",
            PresetKey::WordActiveBox => "WORD_ACTIVE_BOX",
            PresetKey::ColorPopViral => "COLOR_POP_VIRAL",
            PresetKey::ViralComic => "VIRAL_COMIC",
            PresetKey::ViralProClean => "VIRAL_PRO_CLEAN",
            PresetKey::ViralLoudNeon => "VIRAL_LOUD_NEON",
            PresetKey::ViralHyperBold => "VIRAL_HYPER_BOLD",
            PresetKey::Custom => "CUSTOM",
        }
    }

    /// The preset this key names
    pub fn config(&self) -> &'static StyleConfig {
        preset(*self)
    }
}

impl fmt::Display for PresetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetKey {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let wanted = s.trim().replace('-', "_");
        PresetKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| CoreError::ValidationError(format!("Unknown style preset: {}", s)))
    }
}

// =============================================================================
// Catalog Access
// =============================================================================

static CATALOG: LazyLock<Vec<StyleConfig>> =
    LazyLock::new(|| PresetKey::ALL.iter().map(|key| build(*key)).collect());

/// Returns the preset for `key`
pub fn preset(key: PresetKey) -> &'static StyleConfig {
    &CATALOG[key as usize]
}

/// All presets in catalog order, paired with their keys
pub fn all() -> impl Iterator<Item = (PresetKey, &'static StyleConfig)> {
    PresetKey::ALL.iter().map(|key| (*key, preset(*key)))
}

/// Presets belonging to `category`, in catalog order
pub fn presets_in(category: StyleCategory) -> Vec<(PresetKey, &'static StyleConfig)> {
    all().filter(|(_, style)| style.category == category).collect()
}

// =============================================================================
// Preset Definitions
// =============================================================================

fn build(key: PresetKey) -> StyleConfig {
    use AnimationKind::{Karaoke, Pop, ScaleUp, Typewriter};
    use StyleCategory::{Art, Bold, Custom, Glow, Highlight, Minimal, Neon, Viral};

    let black = Color::BLACK;
    let white = Color::WHITE;
    let shade = |alpha: f32| Color::with_css_alpha(0, 0, 0, alpha);

    match key {
        PresetKey::Default => {
            StyleConfig::new("Clean White", Minimal, "Inter, sans-serif", 60.0, 700, white)
                .shadow(shade(0.8), 4.0, 0.0, 2.0)
                .background(shade(0.5))
                .padding(16.0)
                .radius(8.0)
        }
        PresetKey::HormoziVar1 => StyleConfig::new(
            "The Hormozi (Yel)",
            Bold,
            "Montserrat, sans-serif",
            60.0,
            900,
            Color::hex(0xFFFF00),
        )
        .active_color(white)
        .stroke(8.0, black)
        .shadow(black, 0.0, 0.0, 8.0)
        .animation(Pop)
        .uppercase(),
        PresetKey::HormoziVar2 => StyleConfig::new(
            "The Hormozi (Grn)",
            Bold,
            "Montserrat, sans-serif",
            60.0,
            900,
            Color::hex(0x00FF00),
        )
        .active_color(white)
        .stroke(8.0, black)
        .shadow(black, 0.0, 0.0, 8.0)
        .animation(Pop)
        .uppercase(),
        PresetKey::BeastMode => {
            StyleConfig::new("Mr. Beast", Bold, "Bangers, cursive", 72.0, 400, white)
                .stroke(10.0, black)
                .shadow(shade(0.5), 10.0, 0.0, 5.0)
                .animation(ScaleUp)
        }
        PresetKey::KaraokeNeon => StyleConfig::new(
            "Neon Karaoke",
            Neon,
            "Inter, sans-serif",
            52.0,
            800,
            Color::with_css_alpha(255, 255, 255, 0.3),
        )
        .active_color(Color::hex(0x00E5FF))
        .shadow(Color::hex(0x00E5FF), 20.0, 0.0, 0.0)
        .animation(Karaoke),
        PresetKey::GlitchCyber => StyleConfig::new(
            "Cyberpunk",
            Neon,
            "Courier New, monospace",
            56.0,
            700,
            Color::hex(0xFF0055),
        )
        .active_color(Color::hex(0x00FF99))
        .background(black)
        .padding(8.0)
        .animation(Typewriter)
        .uppercase(),
        PresetKey::MinimalBox => StyleConfig::new(
            "Minimal Box",
            Minimal,
            "Inter, sans-serif",
            54.0,
            500,
            black,
        )
        .background(Color::with_css_alpha(255, 255, 255, 0.95))
        .padding(24.0)
        .radius(4.0)
        .shadow(shade(0.2), 10.0, 0.0, 0.0),
        PresetKey::Typewriter => StyleConfig::new(
            "Typewriter",
            Minimal,
            "Courier New, monospace",
            54.0,
            700,
            white,
        )
        .background(black)
        .padding(10.0)
        .animation(Typewriter),
        PresetKey::DesiVlog => StyleConfig::new(
            "Desi Vlog",
            Art,
            "'Noto Sans Devanagari', sans-serif",
            54.0,
            700,
            white,
        )
        .stroke(4.0, Color::hex(0xFF9933))
        .shadow(Color::hex(0x138808), 0.0, 0.0, 4.0)
        .animation(Pop),
        PresetKey::TamilThalaiva => StyleConfig::new(
            "Thalaiva",
            Art,
            "'Noto Sans Tamil', sans-serif",
            56.0,
            700,
            Color::hex(0xFFD700),
        )
        .stroke(6.0, Color::hex(0x800000))
        .animation(ScaleUp),
        PresetKey::RapidSprint => StyleConfig::new(
            "Rapid Sprint",
            Bold,
            "Montserrat, sans-serif",
            80.0,
            900,
            white,
        )
        .stroke(6.0, black)
        .shadow(black, 0.0, 0.0, 6.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordHormoziFocus => StyleConfig::new(
            "Hormozi Focus",
            Bold,
            "Montserrat, sans-serif",
            72.0,
            900,
            Color::hex(0xFACC15),
        )
        .stroke(8.0, black)
        .shadow(black, 0.0, 0.0, 8.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordFutureNeon => StyleConfig::new(
            "Future Neon",
            Neon,
            "'Orbitron', sans-serif",
            64.0,
            900,
            white,
        )
        .active_color(Color::hex(0x00FFFF))
        .shadow(Color::hex(0x00FFFF), 30.0, 0.0, 0.0)
        .animation(ScaleUp)
        .uppercase()
        .word_by_word(),
        PresetKey::WordGlitchChaos => StyleConfig::new(
            "Glitch Chaos",
            Neon,
            "'Rubik Glitch', system-ui",
            80.0,
            400,
            Color::hex(0xFF0044),
        )
        .stroke(2.0, white)
        .shadow(Color::hex(0x00FF99), 0.0, 4.0, 4.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordRetroPixel => StyleConfig::new(
            "Retro Pixel",
            Art,
            "'Press Start 2P', cursive",
            54.0,
            400,
            Color::hex(0x4ADE80),
        )
        .background(black)
        .padding(16.0)
        .uppercase()
        .word_by_word(),
        PresetKey::WordLuxurySerif => StyleConfig::new(
            "Luxury Serif",
            Minimal,
            "'Playfair Display', serif",
            68.0,
            700,
            Color::hex(0xFCD34D),
        )
        .shadow(shade(0.5), 10.0, 0.0, 0.0)
        .animation(ScaleUp)
        .word_by_word(),
        PresetKey::WordComicImpact => StyleConfig::new(
            "Comic Impact",
            Art,
            "'Luckiest Guy', cursive",
            76.0,
            400,
            white,
        )
        .stroke(8.0, black)
        .shadow(Color::hex(0xEF4444), 0.0, 0.0, 8.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordVlogAesthetic => StyleConfig::new(
            "Vlog Aesthetic",
            Art,
            "'Caveat', cursive",
            78.0,
            700,
            white,
        )
        .shadow(shade(0.9), 4.0, 0.0, 4.0)
        .animation(ScaleUp)
        .word_by_word(),
        PresetKey::WordBoldSports => StyleConfig::new(
            "Sports Impact",
            Bold,
            "'Anton', sans-serif",
            86.0,
            400,
            white,
        )
        .stroke(4.0, black)
        .shadow(Color::hex(0xEF4444), 0.0, 4.0, 8.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordGameStreamer => StyleConfig::new(
            "Game Streamer",
            Highlight,
            "'Fredoka', sans-serif",
            74.0,
            700,
            white,
        )
        .stroke(8.0, Color::hex(0x9333EA))
        .shadow(black, 0.0, 0.0, 6.0)
        .animation(Pop)
        .word_by_word(),
        PresetKey::WordNoirCrime => StyleConfig::new(
            "Noir Crime",
            Art,
            "'Special Elite', cursive",
            64.0,
            400,
            Color::hex(0x22C55E),
        )
        .background(black)
        .padding(12.0)
        .word_by_word(),
        PresetKey::WordInstaPop => StyleConfig::new(
            "Insta Pop",
            Bold,
            "'Poppins', sans-serif",
            70.0,
            800,
            white,
        )
        .background(black)
        .padding(16.0)
        .radius(16.0)
        .animation(ScaleUp)
        .uppercase()
        .word_by_word(),
        PresetKey::WordGradientDream => StyleConfig::new(
            "Gradient Dream",
            Glow,
            "'Poppins', sans-serif",
            76.0,
            900,
            white,
        )
        .gradient(&[
            Color::hex(0x3B82F6),
            Color::hex(0x8B5CF6),
            Color::hex(0xEC4899),
        ])
        .shadow(Color::with_css_alpha(255, 255, 255, 0.4), 15.0, 0.0, 0.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordTapeHighlight => StyleConfig::new(
            "Tape Highlight",
            Highlight,
            "'Permanent Marker', cursive",
            68.0,
            400,
            black,
        )
        .background(Color::hex(0xFACC15))
        .padding(12.0)
        .rotation_variance(4.0)
        .animation(Pop)
        .word_by_word(),
        PresetKey::WordNeonStorm => StyleConfig::new(
            "Neon Storm",
            Neon,
            "'Orbitron', sans-serif",
            72.0,
            900,
            white,
        )
        .stroke(3.0, Color::hex(0x06B6D4))
        .shadow(Color::hex(0xD946EF), 20.0, 0.0, 0.0)
        .animation(ScaleUp)
        .uppercase()
        .word_by_word(),
        PresetKey::WordSuper3d => StyleConfig::new(
            "Super 3D",
            Art,
            "'Titan One', cursive",
            80.0,
            400,
            Color::hex(0xF97316),
        )
        .stroke(4.0, white)
        .shadow(Color::hex(0x7C2D12), 0.0, 0.0, 10.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::WordLyricistOutline => StyleConfig::new(
            "Lyricist Outline",
            Neon,
            "'Titan One', cursive",
            76.0,
            400,
            Color::hex(0x34D399),
        )
        .stroke(2.0, Color::hex(0x34D399))
        .outline_inactive()
        .animation(ScaleUp)
        .uppercase()
        .word_by_word(),
        PresetKey::BlockCleanFocus => StyleConfig::new(
            "Clean Focus",
            Highlight,
            "'Nunito', sans-serif",
            54.0,
            800,
            Color::hex(0x9CA3AF),
        )
        .active_color(white)
        .active_background(Color::hex(0x111827))
        .radius(8.0)
        .padding(8.0)
        .animation(ScaleUp),
        PresetKey::BlockCinematicFade => StyleConfig::new(
            "Cinematic Fade",
            Minimal,
            "'Nunito', sans-serif",
            56.0,
            800,
            white,
        )
        .inactive_opacity(0.3)
        .shadow(shade(0.5), 8.0, 0.0, 0.0),
        PresetKey::WordSoftGlow => StyleConfig::new(
            "Soft Glow",
            Glow,
            "'Poppins', sans-serif",
            74.0,
            800,
            white,
        )
        .shadow(Color::with_css_alpha(255, 255, 255, 0.9), 25.0, 0.0, 0.0)
        .animation(ScaleUp)
        .word_by_word(),
        PresetKey::WordActiveBox => StyleConfig::new(
            "Active Box",
            Highlight,
            "'Inter', sans-serif",
            70.0,
            900,
            white,
        )
        .active_color(black)
        .active_background(Color::hex(0xFACC15))
        .padding(12.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::ColorPopViral => StyleConfig::new(
            "Standard Pop",
            Viral,
            "'Montserrat', sans-serif",
            72.0,
            900,
            white,
        )
        .stroke(6.0, black)
        .shadow(black, 0.0, 0.0, 6.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::ViralComic => StyleConfig::new(
            "Comic Loud",
            Viral,
            "'Bangers', cursive",
            84.0,
            400,
            Color::hex(0xFFD700),
        )
        .stroke(8.0, black)
        .shadow(black, 0.0, 0.0, 8.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::ViralProClean => StyleConfig::new(
            "Pro Clean",
            Viral,
            "'Inter', sans-serif",
            76.0,
            900,
            white,
        )
        .shadow(Color::hex(0x3B82F6), 15.0, 0.0, 4.0)
        .animation(ScaleUp)
        .uppercase()
        .word_by_word(),
        PresetKey::ViralLoudNeon => StyleConfig::new(
            "Loud Neon",
            Viral,
            "'Orbitron', sans-serif",
            70.0,
            900,
            white,
        )
        .stroke(4.0, Color::hex(0xFF00FF))
        .shadow(Color::hex(0x00FFFF), 25.0, 0.0, 0.0)
        .animation(ScaleUp)
        .uppercase()
        .word_by_word(),
        PresetKey::ViralHyperBold => StyleConfig::new(
            "Hyper Bold",
            Viral,
            "'Anton', sans-serif",
            88.0,
            400,
            Color::hex(0xFFFF00),
        )
        .stroke(6.0, black)
        .shadow(Color::hex(0xFF0000), 0.0, 0.0, 10.0)
        .animation(Pop)
        .uppercase()
        .word_by_word(),
        PresetKey::Custom => {
            StyleConfig::new("Custom Style", Custom, "Inter, sans-serif", 60.0, 800, white)
        }
    }
}
