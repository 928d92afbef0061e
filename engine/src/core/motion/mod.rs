//! Motion & Cue Controller
//!
//! Per-frame zoom easing and transition cue triggering. All mutable state
//! lives in [`RenderState`], which the caller owns and threads through
//! each frame.

pub mod cues;

pub use cues::{synthesize, CueEvent, CueKind, CueSink, CueTrack, SfxVolume, SAMPLE_RATE};

use serde::Serialize;
use tracing::debug;

use crate::core::captions::Caption;
use crate::core::{CaptionId, TimeSec};

/// Fraction of the remaining distance covered per frame
pub const ZOOM_EASING: f64 = 0.05;
/// Target zoom for captions flagged as emphatic
pub const EMPHASIS_ZOOM: f64 = 1.15;
/// Target zoom for ordinary captions with motion on
pub const BASE_MOTION_ZOOM: f64 = 1.05;
/// Extra zoom gained over the caption's duration
pub const ZOOM_CREEP: f64 = 0.05;
/// Delay between the whoosh and the pop of an emphatic caption
pub const POP_DELAY_SEC: TimeSec = 0.1;

// =============================================================================
// Zoom
// =============================================================================

/// 1.0 without motion or caption; otherwise the emphasis level plus a creep
/// proportional to caption progress.
pub fn target_zoom(caption: Option<&Caption>, progress: f64, motion_enabled: bool) -> f64 {
    match caption {
        Some(caption) if motion_enabled => {
            let base = if caption.is_emphatic() {
                EMPHASIS_ZOOM
            } else {
                BASE_MOTION_ZOOM
            };
            base + progress.clamp(0.0, 1.0) * ZOOM_CREEP
        }
        _ => 1.0,
    }
}

/// One step of exponential smoothing: `zoom + (target - zoom) * 0.05`
pub fn ease_zoom(current: f64, target: f64) -> f64 {
    current + (target - current) * ZOOM_EASING
}

// =============================================================================
// RenderState
// =============================================================================

/// Process-wide render/motion state, read by observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderState {
    zoom: f64,
    last_cue_caption: Option<CaptionId>,
    export_progress: u8,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            last_cue_caption: None,
            export_progress: 0,
        }
    }
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn last_cue_caption(&self) -> Option<&str> {
        self.last_cue_caption.as_deref()
    }

    pub fn export_progress(&self) -> u8 {
        self.export_progress
    }

    pub fn set_export_progress(&mut self, percent: u8) {
        self.export_progress = percent.min(100);
    }

    /// Eases the zoom toward `target` and returns the new value
    pub fn step_zoom(&mut self, target: f64) -> f64 {
        self.zoom = ease_zoom(self.zoom, target);
        self.zoom
    }

    /// Zoom back to rest, cue tracking cleared
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// CueController
// =============================================================================

/// Motion and cue toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionSettings {
    pub motion_enabled: bool,
    pub cues_enabled: bool,
}

/// What the controller sees of one frame
#[derive(Debug, Clone, Copy)]
pub struct MotionFrame<'a> {
    pub caption: Option<&'a Caption>,
    pub progress: f64,
    pub playing: bool,
    /// Cue clock; media time in headless runs
    pub clock: TimeSec,
}

/// Fires cues on caption entry and owns the delayed pops
#[derive(Debug, Default)]
pub struct CueController {
    settings: MotionSettings,
    pending_pops: Vec<TimeSec>,
    last_clock: Option<TimeSec>,
}

impl CueController {
    pub fn new(settings: MotionSettings) -> Self {
        Self {
            settings,
            pending_pops: Vec::new(),
            last_clock: None,
        }
    }

    pub fn settings(&self) -> MotionSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: MotionSettings) {
        self.settings = settings;
    }

    pub fn pending_pops(&self) -> usize {
        self.pending_pops.len()
    }

    /// Advances one frame: eases the zoom, fires due pops, then fires a
    /// whoosh (and schedules a pop) when a new caption is entered while
    /// playing. A clock that moves backwards drops pending pops.
    /// Returns the zoom to draw with.
    pub fn advance(
        &mut self,
        state: &mut RenderState,
        frame: &MotionFrame<'_>,
        sink: &mut dyn CueSink,
    ) -> f64 {
        let target = target_zoom(frame.caption, frame.progress, self.settings.motion_enabled);
        let zoom = state.step_zoom(target);

        let rewound = self.last_clock.is_some_and(|last| frame.clock < last);
        if rewound && !self.pending_pops.is_empty() {
            debug!(
                "Clock moved back to {:.3}s, dropping {} pending pop(s)",
                frame.clock,
                self.pending_pops.len()
            );
            self.pending_pops.clear();
        }
        self.last_clock = Some(frame.clock);
        self.drain_due(frame.clock, sink);

        match frame.caption {
            Some(caption)
                if self.settings.cues_enabled
                    && frame.playing
                    && state.last_cue_caption.as_deref() != Some(caption.id.as_str()) =>
            {
                debug!("Cue for caption {} at {:.3}s", caption.id, frame.clock);
                sink.play(CueKind::Whoosh, frame.clock);
                if caption.is_emphatic() {
                    self.pending_pops.push(frame.clock + POP_DELAY_SEC);
                }
                state.last_cue_caption = Some(caption.id.clone());
            }
            Some(_) => {}
            None => state.last_cue_caption = None,
        }

        zoom
    }

    /// Fires every pending pop regardless of the clock
    pub fn flush(&mut self, sink: &mut dyn CueSink) {
        for at in self.pending_pops.drain(..) {
            sink.play(CueKind::Pop, at);
        }
    }

    /// Drops pending pops without firing them
    pub fn cancel_pending(&mut self) {
        self.pending_pops.clear();
    }

    fn drain_due(&mut self, clock: TimeSec, sink: &mut dyn CueSink) {
        let mut i = 0;
        while i < self.pending_pops.len() {
            if self.pending_pops[i] <= clock {
                let at = self.pending_pops.remove(i);
                sink.play(CueKind::Pop, at);
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caption(id: &str, scale: Option<f64>) -> Caption {
        let c = Caption::new(id, 0.0, 1.0, "hello there");
        match scale {
            Some(s) => c.with_custom_scale(s),
            None => c,
        }
    }

    fn frame<'a>(caption: Option<&'a Caption>, playing: bool, clock: f64) -> MotionFrame<'a> {
        MotionFrame {
            caption,
            progress: 0.0,
            playing,
            clock,
        }
    }

    fn cues_on() -> MotionSettings {
        MotionSettings {
            motion_enabled: false,
            cues_enabled: true,
        }
    }

    // -------------------------------------------------------------------------
    // Zoom
    // -------------------------------------------------------------------------

    #[test]
    fn test_target_zoom_levels() {
        let plain = caption("a", None);
        let big = caption("b", Some(1.5));
        assert_eq!(target_zoom(None, 0.5, true), 1.0);
        assert_eq!(target_zoom(Some(&plain), 0.5, false), 1.0);
        assert!((target_zoom(Some(&plain), 0.0, true) - 1.05).abs() < 1e-12);
        assert!((target_zoom(Some(&plain), 1.0, true) - 1.10).abs() < 1e-12);
        assert!((target_zoom(Some(&big), 0.5, true) - 1.175).abs() < 1e-12);
    }

    #[test]
    fn test_zoom_easing_converges_without_overshoot() {
        for (start, target) in [(1.0, 1.2), (1.3, 1.0), (0.5, 0.5)] {
            let mut zoom: f64 = start;
            let mut prev_gap = (target - zoom).abs();
            for _ in 0..500 {
                zoom = ease_zoom(zoom, target);
                let gap = (target - zoom).abs();
                assert!(gap <= prev_gap);
                if start < target {
                    assert!(zoom <= target);
                } else {
                    assert!(zoom >= target);
                }
                prev_gap = gap;
            }
            assert!((zoom - target).abs() < 1e-9);
        }
    }

    #[test]
    fn test_step_zoom_uses_coefficient() {
        let mut state = RenderState::new();
        assert_eq!(state.zoom(), 1.0);
        let z = state.step_zoom(2.0);
        assert!((z - 1.05).abs() < 1e-12);
    }

    // -------------------------------------------------------------------------
    // Cues
    // -------------------------------------------------------------------------

    #[test]
    fn test_cue_fires_once_per_caption_entry() {
        let mut controller = CueController::new(cues_on());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let a = caption("a", None);
        let b = caption("b", None);

        for t in [0.0, 0.1, 0.2] {
            controller.advance(&mut state, &frame(Some(&a), true, t), &mut log);
        }
        controller.advance(&mut state, &frame(Some(&b), true, 0.3), &mut log);
        controller.advance(&mut state, &frame(Some(&b), true, 0.4), &mut log);

        let kinds: Vec<CueKind> = log.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![CueKind::Whoosh, CueKind::Whoosh]);
        assert_eq!(state.last_cue_caption(), Some("b"));
    }

    #[test]
    fn test_no_cue_while_paused_or_without_caption() {
        let mut controller = CueController::new(cues_on());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let a = caption("a", None);

        controller.advance(&mut state, &frame(None, true, 0.0), &mut log);
        controller.advance(&mut state, &frame(Some(&a), false, 0.1), &mut log);
        assert!(log.is_empty());
        assert_eq!(state.last_cue_caption(), None);

        // Playback starts mid-caption: fires on the first playing frame
        controller.advance(&mut state, &frame(Some(&a), true, 0.2), &mut log);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_reentering_after_gap_refires() {
        let mut controller = CueController::new(cues_on());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let a = caption("a", None);

        controller.advance(&mut state, &frame(Some(&a), true, 0.0), &mut log);
        controller.advance(&mut state, &frame(None, true, 1.5), &mut log);
        assert_eq!(state.last_cue_caption(), None);
        controller.advance(&mut state, &frame(Some(&a), true, 0.0), &mut log);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_cues_disabled_fire_nothing() {
        let mut controller = CueController::new(MotionSettings::default());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let a = caption("a", Some(2.0));
        controller.advance(&mut state, &frame(Some(&a), true, 0.0), &mut log);
        assert!(log.is_empty());
        assert_eq!(controller.pending_pops(), 0);
    }

    #[test]
    fn test_emphatic_caption_pops_after_delay() {
        let mut controller = CueController::new(cues_on());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let big = caption("big", Some(1.5));

        controller.advance(&mut state, &frame(Some(&big), true, 1.0), &mut log);
        assert_eq!(log.len(), 1);
        assert_eq!(controller.pending_pops(), 1);

        controller.advance(&mut state, &frame(Some(&big), true, 1.05), &mut log);
        assert_eq!(log.len(), 1);

        controller.advance(&mut state, &frame(Some(&big), true, 1.12), &mut log);
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].kind, CueKind::Pop);
        assert!((log[1].at - 1.1).abs() < 1e-9);
        assert_eq!(controller.pending_pops(), 0);
    }

    #[test]
    fn test_seek_back_drops_pending_pop() {
        let mut controller = CueController::new(cues_on());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let big = caption("big", Some(1.5));

        controller.advance(&mut state, &frame(Some(&big), true, 5.0), &mut log);
        assert_eq!(controller.pending_pops(), 1);

        // Seek to the start and play back up to the caption without it active
        for i in 0..150 {
            let t = i as f64 / 30.0;
            controller.advance(&mut state, &frame(None, true, t), &mut log);
        }
        assert_eq!(controller.pending_pops(), 0);
        assert_eq!(log.len(), 1);

        for t in [5.0, 5.05, 5.2] {
            controller.advance(&mut state, &frame(Some(&big), true, t), &mut log);
        }

        let pops: Vec<f64> = log
            .iter()
            .filter(|e| e.kind == CueKind::Pop)
            .map(|e| e.at)
            .collect();
        assert_eq!(pops.len(), 1);
        assert!((pops[0] - 5.1).abs() < 1e-9);
        let whooshes = log.iter().filter(|e| e.kind == CueKind::Whoosh).count();
        assert_eq!(whooshes, 2);
    }

    #[test]
    fn test_flush_fires_remaining_pops() {
        let mut controller = CueController::new(cues_on());
        let mut state = RenderState::new();
        let mut log: Vec<CueEvent> = Vec::new();
        let big = caption("big", Some(1.5));
        controller.advance(&mut state, &frame(Some(&big), true, 0.0), &mut log);
        controller.flush(&mut log);
        assert_eq!(log.len(), 2);
        assert_eq!(controller.pending_pops(), 0);
    }

    #[test]
    fn test_export_progress_capped() {
        let mut state = RenderState::new();
        state.set_export_progress(150);
        assert_eq!(state.export_progress(), 100);
        state.reset();
        assert_eq!(state.export_progress(), 0);
    }
}
