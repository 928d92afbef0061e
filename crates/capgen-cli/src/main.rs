//! CapGen CLI
//!
//! Headless driver for the caption pipeline: transcribe a clip, preview a
//! single composited frame, export the captioned video through FFmpeg and
//! browse the style catalog.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use capgen_lib::core::ai::{GeminiTranscriber, LanguageMode};
use capgen_lib::core::captions::Caption;
use capgen_lib::core::export::ExportProgress;
use capgen_lib::core::ffmpeg::{
    build_offline_session, detect_ffmpeg, FFmpegRunner, MediaInfo, SharedStudio,
};
use capgen_lib::core::motion::{CueEvent, CueTrack};
use capgen_lib::core::render::RasterSurface;
use capgen_lib::core::settings::{AppSettings, SettingsManager};
use capgen_lib::core::studio::{Studio, VideoMeta};
use capgen_lib::core::style::{all_presets, presets_in, PresetKey, StyleCategory};

/// clap-facing mirror of [`LanguageMode`]
#[derive(Clone, Copy, ValueEnum)]
enum CliLanguageMode {
    Auto,
    English,
    PureTelugu,
    Telglish,
}

impl From<CliLanguageMode> for LanguageMode {
    fn from(cli: CliLanguageMode) -> Self {
        match cli {
            CliLanguageMode::Auto => LanguageMode::Auto,
            CliLanguageMode::English => LanguageMode::English,
            CliLanguageMode::PureTelugu => LanguageMode::PureTelugu,
            CliLanguageMode::Telglish => LanguageMode::Telglish,
        }
    }
}

#[derive(Parser)]
#[command(name = "capgen", version)]
#[command(about = "Styled, time-synchronized captions for short vertical video")]
struct Cli {
    /// Settings directory (defaults to the platform config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Also write daily-rolling logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a clip into a captions JSON file
    Transcribe {
        video: PathBuf,

        #[arg(short, long, default_value = "captions.json")]
        output: PathBuf,

        #[arg(long, value_enum)]
        language_mode: Option<CliLanguageMode>,

        /// Ignore per-caption scale/position hints
        #[arg(long)]
        no_auto_adjust: bool,

        /// Ask for shorter, punchier segments
        #[arg(long)]
        smart_compression: bool,
    },

    /// Render one composited frame to PNG
    RenderFrame {
        video: PathBuf,

        #[arg(long)]
        captions: PathBuf,

        /// Media time in seconds
        #[arg(long)]
        time: f64,

        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        #[arg(long)]
        preset: Option<String>,
    },

    /// Export the captioned video
    Export {
        video: PathBuf,

        #[arg(long)]
        captions: PathBuf,

        /// Output directory (defaults to the configured one, then the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        preset: Option<String>,

        /// Emphasis zoom on active captions
        #[arg(long)]
        motion: bool,

        /// Write transition cues to a WAV next to the export
        #[arg(long)]
        sfx: bool,
    },

    /// List style presets
    Styles {
        #[arg(long)]
        category: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StyleRow {
    key: &'static str,
    name: String,
    category: StyleCategory,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    capgen_lib::init_logging(cli.log_dir.as_deref());

    let manager = match cli.config_dir {
        Some(dir) => SettingsManager::new(dir),
        None => SettingsManager::default_location()
            .context("Could not determine the configuration directory")?,
    };
    let settings = manager.load();

    match cli.command {
        Command::Transcribe {
            video,
            output,
            language_mode,
            no_auto_adjust,
            smart_compression,
        } => {
            let mut settings = settings;
            if let Some(mode) = language_mode {
                settings.editor.language_mode = LanguageMode::from(mode).as_str().to_string();
            }
            settings.editor.auto_adjust &= !no_auto_adjust;
            settings.editor.smart_compression |= smart_compression;
            transcribe(&settings, &video, &output).await
        }
        Command::RenderFrame {
            video,
            captions,
            time,
            output,
            preset,
        } => render_frame(&settings, &video, &captions, time, &output, preset.as_deref()).await,
        Command::Export {
            video,
            captions,
            output,
            preset,
            motion,
            sfx,
        } => {
            let mut settings = settings;
            settings.editor.auto_motion |= motion;
            settings.editor.auto_sfx |= sfx;
            let out_dir = output
                .or_else(|| settings.export.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("."));
            export(&settings, &video, &captions, &out_dir, preset.as_deref()).await
        }
        Command::Styles { category, json } => styles(category.as_deref(), json),
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn transcribe(settings: &AppSettings, video: &Path, output: &Path) -> Result<()> {
    let (_, info) = probe(video).await?;
    let mut studio = open_studio(settings, video, &info)?;

    let service = GeminiTranscriber::from_env(&settings.ai)?;
    let media = tokio::fs::read(video)
        .await
        .with_context(|| format!("Failed to read {}", video.display()))?;

    let stats = studio
        .generate_captions(&service, &media, mime_for(video))
        .await?
        .clone();

    let json = serde_json::to_string_pretty(studio.captions())?;
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} captions, {} words, {} ({} ms) -> {}",
        studio.captions().len(),
        stats.word_count,
        stats.language_detected,
        stats.transcription_time_ms,
        output.display()
    );
    Ok(())
}

async fn render_frame(
    settings: &AppSettings,
    video: &Path,
    captions: &Path,
    time: f64,
    output: &Path,
    preset: Option<&str>,
) -> Result<()> {
    let (runner, info) = probe(video).await?;
    let mut studio = open_studio(settings, video, &info)?;
    studio.set_captions(read_captions(captions).await?);
    if let Some(key) = preset {
        studio.select_preset(key.parse::<PresetKey>()?);
    }

    let frame = runner.extract_frame_rgba(video, time).await?;
    let mut surface = RasterSurface::new(frame.width, frame.height);
    let mut cues: Vec<CueEvent> = Vec::new();
    studio.draw(Some(&mut surface), Some(&frame), time, &mut cues);
    surface.save_png(output)?;

    println!(
        "Rendered {}x{} frame at {:.3}s with {} -> {}",
        frame.width,
        frame.height,
        time,
        studio.preset().as_str(),
        output.display()
    );
    Ok(())
}

async fn export(
    settings: &AppSettings,
    video: &Path,
    captions: &Path,
    out_dir: &Path,
    preset: Option<&str>,
) -> Result<()> {
    let (runner, info) = probe(video).await?;
    let mut studio = open_studio(settings, video, &info)?;
    studio.set_captions(read_captions(captions).await?);
    if let Some(key) = preset {
        studio.select_preset(key.parse::<PresetKey>()?);
    }
    studio.begin_export()?;

    let studio: SharedStudio = Arc::new(Mutex::new(studio));
    let track = Arc::new(Mutex::new(CueTrack::new(settings.editor.sfx_volume())));

    let (progress_tx, mut progress_rx) = mpsc::channel::<ExportProgress>(32);
    let mut session = build_offline_session(
        &runner,
        video,
        Arc::clone(&studio),
        track.clone(),
        out_dir,
        settings.export.to_options(),
    )
    .await?
    .with_progress(progress_tx);

    let progress_studio = Arc::clone(&studio);
    let printer = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            lock(&progress_studio).set_export_progress(progress.percent);
            eprintln!("[{:>3}%] {}", progress.percent, progress.message);
        }
    });

    let orchestrator = lock(&studio).orchestrator();
    let result = orchestrator.export(&mut session).await;
    lock(&studio).finish_export(result.is_ok());
    drop(session);
    if let Err(e) = printer.await {
        warn!("Progress printer failed: {}", e);
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => bail!("{} ({})", e.to_user_message(), e),
    };

    if settings.editor.auto_sfx {
        let mut track = lock(&track);
        if track.is_empty() {
            info!("No cues fired, cue track skipped");
        } else {
            track.extend_to(report.duration_sec);
            let wav = report.location.with_extension("cues.wav");
            track.write_wav(&wav)?;
            println!("Cue track ({} cues) -> {}", track.cue_count(), wav.display());
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn styles(category: Option<&str>, json: bool) -> Result<()> {
    let presets = match category {
        Some(category) => presets_in(category.parse::<StyleCategory>()?),
        None => all_presets().collect(),
    };

    let rows: Vec<StyleRow> = presets
        .into_iter()
        .map(|(key, style)| StyleRow {
            key: key.as_str(),
            name: style.name.clone(),
            category: style.category,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in &rows {
        println!("{:<22} {:<28} {}", row.key, row.name, row.category.as_str());
    }
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

async fn probe(video: &Path) -> Result<(FFmpegRunner, MediaInfo)> {
    let runner = FFmpegRunner::new(detect_ffmpeg()?);
    let info = runner
        .probe(video)
        .await
        .with_context(|| format!("Failed to probe {}", video.display()))?;
    Ok((runner, info))
}

/// Studio with `video` loaded and the persisted editor settings applied
fn open_studio(settings: &AppSettings, video: &Path, info: &MediaInfo) -> Result<Studio> {
    let size = info
        .frame_size()
        .with_context(|| format!("{} has no video stream", video.display()))?;

    let mut studio = Studio::new(settings.editor.clone());
    studio.load_video(VideoMeta {
        name: video
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        mime_type: mime_for(video).to_string(),
        duration: info.duration_sec,
        width: size.width,
        height: size.height,
    })?;
    // Loading resets placement; the persisted settings win on the command line
    studio.set_editor(settings.editor.clone());
    Ok(studio)
}

async fn read_captions(path: &Path) -> Result<Vec<Caption>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let captions: Vec<Caption> = serde_json::from_str(&json)
        .with_context(|| format!("Invalid captions file {}", path.display()))?;
    if captions.is_empty() {
        bail!("{} contains no captions", path.display());
    }
    Ok(captions)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}
