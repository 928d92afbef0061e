//! Studio Session
//!
//! Session-level state of one editing session: the loaded clip, its
//! captions, the selected style and the per-frame render pipeline
//! (caption lookup → zoom/cues → style resolution → compositor).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::ai::{dominant_language, ensure_captions, TranscriptionService};
use crate::core::captions::{self, Caption};
use crate::core::export::ExportOrchestrator;
use crate::core::motion::{CueController, CueSink, MotionFrame, RenderState};
use crate::core::render::{FrameCompositor, FrameInputs, FrameOutcome, RenderSurface, VideoFrame};
use crate::core::settings::EditorSettings;
use crate::core::style::{preset, ActiveRenderConfig, PresetKey, StyleOverrides, StyleResolver};
use crate::core::{CoreError, CoreResult, TimeSec};

/// Longest clip accepted for captioning
pub const MAX_VIDEO_DURATION_SEC: TimeSec = 300.0;

// =============================================================================
// Session Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Uploading,
    Transcribing,
    Ready,
    Exporting,
}

/// Metadata of the loaded clip
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMeta {
    pub name: String,
    pub mime_type: String,
    pub duration: TimeSec,
    pub width: u32,
    pub height: u32,
}

/// Summary of the last transcription run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub transcription_time_ms: u64,
    pub word_count: usize,
    /// Mean per-segment confidence (0-100)
    pub confidence_score: f64,
    /// Display name of the dominant language
    pub language_detected: String,
}

impl ProcessingStats {
    fn from_captions(captions: &[Caption], language: &str, elapsed_ms: u64) -> Self {
        let word_count = captions.iter().map(Caption::word_count).sum();
        let confidence_score = if captions.is_empty() {
            0.0
        } else {
            captions.iter().map(|c| c.confidence).sum::<f64>() / captions.len() as f64
        };
        Self {
            transcription_time_ms: elapsed_ms,
            word_count,
            confidence_score,
            language_detected: language.to_string(),
        }
    }
}

// =============================================================================
// Studio
// =============================================================================

#[derive(Debug)]
pub struct Studio {
    status: ProcessingStatus,
    video: Option<VideoMeta>,
    captions: Vec<Caption>,
    stats: Option<ProcessingStats>,
    preset: PresetKey,
    overrides: StyleOverrides,
    editor: EditorSettings,
    render_state: RenderState,
    cues: CueController,
    resolver: StyleResolver,
    compositor: FrameCompositor,
    playing: bool,
    exporting: Arc<AtomicBool>,
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

impl Studio {
    pub fn new(editor: EditorSettings) -> Self {
        let preset_key = editor.preset_key();
        Self {
            status: ProcessingStatus::Idle,
            video: None,
            captions: Vec::new(),
            stats: None,
            preset: preset_key,
            overrides: StyleOverrides::from_preset(preset(preset_key)),
            cues: CueController::new(editor.motion()),
            editor,
            render_state: RenderState::new(),
            resolver: StyleResolver::new(),
            compositor: FrameCompositor::new(),
            playing: false,
            exporting: Arc::new(AtomicBool::new(false)),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn video(&self) -> Option<&VideoMeta> {
        self.video.as_ref()
    }

    pub fn captions(&self) -> &[Caption] {
        &self.captions
    }

    pub fn stats(&self) -> Option<&ProcessingStats> {
        self.stats.as_ref()
    }

    pub fn preset(&self) -> PresetKey {
        self.preset
    }

    pub fn overrides(&self) -> &StyleOverrides {
        &self.overrides
    }

    pub fn editor(&self) -> &EditorSettings {
        &self.editor
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Session operations
    // -------------------------------------------------------------------------

    /// Loads a new clip, discarding everything derived from the previous one
    pub fn load_video(&mut self, meta: VideoMeta) -> CoreResult<()> {
        if meta.duration > MAX_VIDEO_DURATION_SEC {
            warn!(
                "Rejected {}: {:.1}s exceeds {:.0}s",
                meta.name, meta.duration, MAX_VIDEO_DURATION_SEC
            );
            return Err(CoreError::VideoTooLong(meta.duration, MAX_VIDEO_DURATION_SEC));
        }

        info!(
            "Loaded {} ({}x{}, {:.2}s)",
            meta.name, meta.width, meta.height, meta.duration
        );
        self.video = Some(meta);
        self.captions.clear();
        self.stats = None;
        self.status = ProcessingStatus::Idle;
        self.playing = false;
        self.render_state.reset();
        self.cues.cancel_pending();
        self.editor.font_scale = 1.0;
        self.editor.vertical_position = 75.0;
        self.editor.horizontal_position = 50.0;
        self.select_preset(PresetKey::Default);
        Ok(())
    }

    /// Replaces the caption list, e.g. with captions loaded from disk
    pub fn set_captions(&mut self, captions: Vec<Caption>) {
        debug!("Caption list replaced ({} segments)", captions.len());
        self.captions = captions;
        self.render_state.reset();
        self.cues.cancel_pending();
        self.status = ProcessingStatus::Ready;
    }

    /// Transcribes `media` and installs the result.
    ///
    /// On failure the session returns to idle with no captions.
    pub async fn generate_captions(
        &mut self,
        service: &dyn TranscriptionService,
        media: &[u8],
        mime_type: &str,
    ) -> CoreResult<&ProcessingStats> {
        if self.video.is_none() {
            return Err(CoreError::NoVideoLoaded);
        }

        self.status = ProcessingStatus::Uploading;
        self.captions.clear();
        self.stats = None;
        info!(
            "Uploading {} bytes ({}) to {}",
            media.len(),
            mime_type,
            service.name()
        );

        let started = Instant::now();
        self.status = ProcessingStatus::Transcribing;
        let options = self.editor.transcription_options();
        let outcome = service
            .transcribe(media, mime_type, &options)
            .await
            .and_then(ensure_captions);

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("Transcription failed: {}", e);
                self.status = ProcessingStatus::Idle;
                return Err(e);
            }
        };

        let language = if result.language.is_empty() {
            dominant_language(&result.captions)
        } else {
            result.language
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let stats = ProcessingStats::from_captions(&result.captions, &language, elapsed_ms);
        info!(
            "Transcribed {} segments, {} words, {} in {}ms",
            result.captions.len(),
            stats.word_count,
            stats.language_detected,
            elapsed_ms
        );

        self.captions = result.captions;
        self.render_state.reset();
        self.cues.cancel_pending();
        self.status = ProcessingStatus::Ready;
        Ok(self.stats.insert(stats))
    }

    /// Selects a preset and resets the overrides to its values
    pub fn select_preset(&mut self, key: PresetKey) {
        if self.preset != key {
            info!("Preset selected: {}", key.as_str());
        }
        self.preset = key;
        self.overrides = StyleOverrides::from_preset(preset(key));
        self.editor.preset = key.as_str().to_string();
    }

    pub fn set_overrides(&mut self, overrides: StyleOverrides) {
        self.overrides = overrides;
    }

    /// Applies new editor settings; the preset is re-selected when it changed
    pub fn set_editor(&mut self, editor: EditorSettings) {
        let key = editor.preset_key();
        self.cues.set_settings(editor.motion());
        self.editor = editor;
        if key != self.preset {
            self.select_preset(key);
        }
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.playing = playing;
        if !playing {
            self.cues.cancel_pending();
        }
    }

    /// Resolved style for the current preset and overrides
    pub fn active_style(&mut self) -> Arc<ActiveRenderConfig> {
        self.resolver
            .resolve(self.preset, &self.overrides, self.editor.auto_adjust)
    }

    /// Draws one display frame at `clock` seconds of media time.
    ///
    /// Frames without a surface or video frame are skipped before any
    /// motion or cue state advances.
    pub fn draw(
        &mut self,
        surface: Option<&mut dyn RenderSurface>,
        frame: Option<&VideoFrame>,
        clock: TimeSec,
        cue_sink: &mut dyn CueSink,
    ) -> FrameOutcome {
        let (surface, frame) = match (surface, frame) {
            (Some(surface), Some(frame)) => (surface, frame),
            _ => return FrameOutcome::Skipped,
        };

        let style = self
            .resolver
            .resolve(self.preset, &self.overrides, self.editor.auto_adjust);
        let active = captions::resolve(clock, &self.captions);

        let motion = MotionFrame {
            caption: active.as_ref().map(|a| a.caption),
            progress: active.as_ref().map(|a| a.progress).unwrap_or(0.0),
            playing: self.playing,
            clock,
        };
        let zoom = self.cues.advance(&mut self.render_state, &motion, cue_sink);

        let inputs = FrameInputs {
            style: &style,
            caption: active.as_ref(),
            zoom,
            placement: self.editor.placement(),
            watermark: self.exporting.load(Ordering::SeqCst),
        };
        self.compositor.compose(Some(surface), Some(frame), &inputs)
    }

    /// Fires pops still pending, e.g. at the end of an export
    pub fn flush_cues(&mut self, cue_sink: &mut dyn CueSink) {
        self.cues.flush(cue_sink);
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Orchestrator whose active flag drives the watermark of this studio
    pub fn orchestrator(&self) -> ExportOrchestrator {
        ExportOrchestrator::with_flag(Arc::clone(&self.exporting))
    }

    /// Enters `EXPORTING`; requires a loaded clip
    pub fn begin_export(&mut self) -> CoreResult<()> {
        if self.video.is_none() {
            return Err(CoreError::NoVideoLoaded);
        }
        if self.status == ProcessingStatus::Exporting {
            return Err(CoreError::ExportAlreadyRunning);
        }
        info!("Export started");
        self.status = ProcessingStatus::Exporting;
        self.render_state.set_export_progress(0);
        Ok(())
    }

    pub fn set_export_progress(&mut self, percent: u8) {
        self.render_state.set_export_progress(percent);
    }

    /// Leaves `EXPORTING`, whatever the outcome
    pub fn finish_export(&mut self, succeeded: bool) {
        if succeeded {
            self.render_state.set_export_progress(100);
        }
        info!("Export finished (succeeded={})", succeeded);
        self.status = ProcessingStatus::Ready;
        self.playing = false;
        self.cues.cancel_pending();
    }
}
