//! Audio Cues
//!
//! Synthesis of the two transition cues and a sink that mixes them into a
//! mono cue track for headless exports.
//!
//! - Whoosh: white noise through a one-pole low-pass (cutoff 200→800 Hz over
//!   100 ms), gain 0.2→0.01 exponentially over 300 ms.
//! - Pop: sine sweeping 150→40 Hz exponentially, gain 0.5→0.01 over 150 ms.

use std::f32::consts::TAU;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::{CoreError, CoreResult, TimeSec};

/// Cue track sample rate
pub const SAMPLE_RATE: u32 = 44_100;

// =============================================================================
// Types
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    Whoosh,
    Pop,
}

impl CueKind {
    pub fn duration(&self) -> TimeSec {
        match self {
            CueKind::Whoosh => 0.3,
            CueKind::Pop => 0.15,
        }
    }
}

/// Master cue volume
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SfxVolume {
    Low,
    #[default]
    Med,
    High,
}

impl SfxVolume {
    pub fn gain(&self) -> f32 {
        match self {
            SfxVolume::Low => 0.15,
            SfxVolume::Med => 0.3,
            SfxVolume::High => 0.6,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(SfxVolume::Low),
            "MED" | "MEDIUM" => Some(SfxVolume::Med),
            "HIGH" => Some(SfxVolume::High),
            _ => None,
        }
    }
}

/// A cue fired at a point on the cue clock
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CueEvent {
    pub kind: CueKind,
    pub at: TimeSec,
}

/// Receiver of fired cues
pub trait CueSink: Send {
    fn play(&mut self, kind: CueKind, at: TimeSec);
}

/// Records cues without producing audio
impl CueSink for Vec<CueEvent> {
    fn play(&mut self, kind: CueKind, at: TimeSec) {
        self.push(CueEvent { kind, at });
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// `from * (to/from)^(t/duration)`, held at `to` past the end
fn exp_ramp(from: f32, to: f32, t: f32, duration: f32) -> f32 {
    from * (to / from).powf((t / duration).clamp(0.0, 1.0))
}

fn whoosh<R: Rng>(master_gain: f32, rng: &mut R) -> Vec<f32> {
    let n = (CueKind::Whoosh.duration() * SAMPLE_RATE as f64).round() as usize;
    let mut out = Vec::with_capacity(n);
    let mut y = 0.0f32;

    for i in 0..n {
        let t = i as f32 / SAMPLE_RATE as f32;
        let cutoff = 200.0 + 600.0 * (t / 0.1).min(1.0);
        let alpha = 1.0 - (-TAU * cutoff / SAMPLE_RATE as f32).exp();
        let noise: f32 = rng.gen_range(-1.0..1.0);
        y += alpha * (noise - y);
        out.push(y * exp_ramp(0.2, 0.01, t, 0.3) * master_gain);
    }
    out
}

fn pop(master_gain: f32) -> Vec<f32> {
    let n = (CueKind::Pop.duration() * SAMPLE_RATE as f64).round() as usize;
    let mut out = Vec::with_capacity(n);
    let mut phase = 0.0f32;

    for i in 0..n {
        let t = i as f32 / SAMPLE_RATE as f32;
        let freq = exp_ramp(150.0, 40.0, t, 0.15);
        out.push(phase.sin() * exp_ramp(0.5, 0.01, t, 0.15) * master_gain);
        phase = (phase + TAU * freq / SAMPLE_RATE as f32) % TAU;
    }
    out
}

/// Renders one cue at the given master gain
pub fn synthesize<R: Rng>(kind: CueKind, master_gain: f32, rng: &mut R) -> Vec<f32> {
    match kind {
        CueKind::Whoosh => whoosh(master_gain, rng),
        CueKind::Pop => pop(master_gain),
    }
}

// =============================================================================
// CueTrack
// =============================================================================

/// Mono cue track that grows as cues are mixed in
#[derive(Debug)]
pub struct CueTrack {
    samples: Vec<f32>,
    master_gain: f32,
    rng: StdRng,
    cue_count: usize,
}

impl CueTrack {
    pub fn new(volume: SfxVolume) -> Self {
        Self::with_rng(volume, StdRng::from_entropy())
    }

    /// Deterministic noise, for reproducible renders
    pub fn with_seed(volume: SfxVolume, seed: u64) -> Self {
        Self::with_rng(volume, StdRng::seed_from_u64(seed))
    }

    fn with_rng(volume: SfxVolume, rng: StdRng) -> Self {
        Self {
            samples: Vec::new(),
            master_gain: volume.gain(),
            rng,
            cue_count: 0,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn cue_count(&self) -> usize {
        self.cue_count
    }

    pub fn duration(&self) -> TimeSec {
        self.samples.len() as f64 / SAMPLE_RATE as f64
    }

    pub fn is_empty(&self) -> bool {
        self.cue_count == 0
    }

    /// Adds `kind` starting at `at` seconds, summing over anything already there
    pub fn mix(&mut self, kind: CueKind, at: TimeSec) {
        let start = (at.max(0.0) * SAMPLE_RATE as f64).round() as usize;
        let cue = synthesize(kind, self.master_gain, &mut self.rng);
        let end = start + cue.len();
        if self.samples.len() < end {
            self.samples.resize(end, 0.0);
        }
        for (dst, src) in self.samples[start..end].iter_mut().zip(cue) {
            *dst += src;
        }
        self.cue_count += 1;
        debug!("Mixed {:?} cue at {:.3}s", kind, at);
    }

    /// Pads the track with silence up to `duration` seconds
    pub fn extend_to(&mut self, duration: TimeSec) {
        let len = (duration.max(0.0) * SAMPLE_RATE as f64).round() as usize;
        if self.samples.len() < len {
            self.samples.resize(len, 0.0);
        }
    }

    /// Writes a 16-bit mono WAV
    pub fn write_wav(&self, path: &Path) -> CoreResult<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .map_err(|e| CoreError::Internal(format!("Failed to create cue track: {}", e)))?;
        for sample in &self.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| CoreError::Internal(format!("Failed to write cue track: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| CoreError::Internal(format!("Failed to finalize cue track: {}", e)))?;

        info!(
            "Wrote cue track with {} cues ({:.2}s) to {}",
            self.cue_count,
            self.duration(),
            path.display()
        );
        Ok(())
    }
}

impl CueSink for CueTrack {
    fn play(&mut self, kind: CueKind, at: TimeSec) {
        self.mix(kind, at);
    }
}
