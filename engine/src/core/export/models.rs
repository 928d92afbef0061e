//! Export Data Models
//!
//! Phases, progress updates, recorder configuration and the finished
//! artifact of an export session.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::TimeSec;

/// Container/codec candidates, best first. Negotiation picks the first one
/// the recorder can encode.
pub const MIME_PREFERENCES: [&str; 5] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=h264,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

/// File name prefix of exported artifacts
pub const EXPORT_FILE_PREFIX: &str = "capgen-export";

// =============================================================================
// Phases & Progress
// =============================================================================

/// Export state machine phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportPhase {
    #[default]
    Idle,
    SeekToStart,
    SettleDelay,
    CaptureStreams,
    NegotiateCodec,
    StartRecording,
    Playback,
    StopRecording,
    Finalize,
    Done,
    Error,
}

impl ExportPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportPhase::Idle => "IDLE",
            ExportPhase::SeekToStart => "SEEK_TO_START",
            ExportPhase::SettleDelay => "SETTLE_DELAY",
            ExportPhase::CaptureStreams => "CAPTURE_STREAMS",
            ExportPhase::NegotiateCodec => "NEGOTIATE_CODEC",
            ExportPhase::StartRecording => "START_RECORDING",
            ExportPhase::Playback => "PLAYBACK",
            ExportPhase::StopRecording => "STOP_RECORDING",
            ExportPhase::Finalize => "FINALIZE",
            ExportPhase::Done => "DONE",
            ExportPhase::Error => "ERROR",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportPhase::Done | ExportPhase::Error)
    }
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export progress update
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub phase: ExportPhase,
    /// Progress percentage (0-100)
    pub percent: u8,
    /// Current status message
    pub message: String,
}

/// `round(current / duration × 100)`, 0 for an unknown duration
pub fn progress_percent(current_time: TimeSec, duration: TimeSec) -> u8 {
    if !(duration.is_finite() && duration > 0.0 && current_time.is_finite()) {
        return 0;
    }
    (current_time / duration * 100.0).round().clamp(0.0, 100.0) as u8
}

// =============================================================================
// Options
// =============================================================================

/// Tunables of one export run
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// Capture frame rate
    pub fps: u32,
    /// Pause between the seek acknowledgment and capture
    pub settle_delay: Duration,
    /// Encoder target bitrate
    pub video_bits_per_second: u64,
    /// Upper bound on waiting for the seek acknowledgment
    pub seek_timeout: Duration,
    /// Upper bound on waiting for the encoder to finalize after stop
    pub stop_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            settle_delay: Duration::from_millis(200),
            video_bits_per_second: 8_000_000,
            seek_timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(30),
        }
    }
}

/// Configuration handed to the recorder on start
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Negotiated MIME type
    pub mime_type: String,
    pub video_bits_per_second: u64,
    pub fps: u32,
}

// =============================================================================
// Artifact
// =============================================================================

/// File extension for a negotiated MIME type
pub fn extension_for(mime_type: &str) -> &'static str {
    if mime_type.contains("mp4") {
        "mp4"
    } else {
        "webm"
    }
}

/// The finalized output of an export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportArtifact {
    /// `capgen-export-{unix_ms}.{ext}`
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Names the artifact with the current time
    pub fn new(mime_type: &str, bytes: Vec<u8>) -> Self {
        Self::with_timestamp(mime_type, bytes, chrono::Utc::now().timestamp_millis())
    }

    pub fn with_timestamp(mime_type: &str, bytes: Vec<u8>, timestamp_ms: i64) -> Self {
        Self {
            file_name: format!(
                "{}-{}.{}",
                EXPORT_FILE_PREFIX,
                timestamp_ms,
                extension_for(mime_type)
            ),
            mime_type: mime_type.to_string(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Summary of a successful export
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub file_name: String,
    pub mime_type: String,
    /// Where the sink put the artifact
    pub location: PathBuf,
    pub size_bytes: u64,
    /// Media duration reported by the playback host
    pub duration_sec: TimeSec,
    /// Wall-clock time of the whole session
    pub elapsed_sec: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_order() {
        assert_eq!(MIME_PREFERENCES[0], "video/webm;codecs=vp9,opus");
        assert_eq!(MIME_PREFERENCES[4], "video/mp4");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0.0, 2.0), 0);
        assert_eq!(progress_percent(1.0, 2.0), 50);
        assert_eq!(progress_percent(0.333, 1.0), 33);
        assert_eq!(progress_percent(0.996, 1.0), 100);
        assert_eq!(progress_percent(3.0, 2.0), 100);
        assert_eq!(progress_percent(1.0, 0.0), 0);
        assert_eq!(progress_percent(1.0, f64::NAN), 0);
    }

    #[test]
    fn test_artifact_naming() {
        let webm = ExportArtifact::with_timestamp("video/webm;codecs=vp9,opus", vec![1], 1700000000000);
        assert_eq!(webm.file_name, "capgen-export-1700000000000.webm");

        let mp4 = ExportArtifact::with_timestamp("video/mp4", vec![], 42);
        assert_eq!(mp4.file_name, "capgen-export-42.mp4");
        assert!(mp4.is_empty());
    }

    #[test]
    fn test_phase_labels() {
        assert_eq!(ExportPhase::SeekToStart.to_string(), "SEEK_TO_START");
        assert_eq!(
            serde_json::to_string(&ExportPhase::NegotiateCodec).unwrap(),
            "\"NEGOTIATE_CODEC\""
        );
        assert!(ExportPhase::Error.is_terminal());
        assert!(!ExportPhase::Playback.is_terminal());
    }
}
