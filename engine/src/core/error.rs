//! CapGen Error Definitions
//!
//! Defines error types used throughout the pipeline.

use thiserror::Error;

use super::ffmpeg::FFmpegError;
use super::TimeSec;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Media Errors
    // =========================================================================
    #[error("Video too long: {0:.1}s exceeds the {1:.0}s limit")]
    VideoTooLong(TimeSec, TimeSec),

    #[error("No video loaded")]
    NoVideoLoaded,

    // =========================================================================
    // Transcription Errors
    // =========================================================================
    #[error("AI request failed: {0}")]
    AIRequestFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    // =========================================================================
    // Render Errors
    // =========================================================================
    #[error("Render failed: {0}")]
    RenderFailed(String),

    // =========================================================================
    // Export Errors
    // =========================================================================
    #[error("Export unsupported: none of the candidate formats can be encoded ({0})")]
    ExportUnsupported(String),

    #[error("An export is already running")]
    ExportAlreadyRunning,

    #[error("Playback failed during export: {0}")]
    PlaybackFailed(String),

    #[error("Encoder failed: {0}")]
    EncoderFailed(String),

    #[error("Export aborted: {0}")]
    ExportAborted(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] FFmpegError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Converts to the notice shown to the user.
    ///
    /// Transcription and export failures collapse to short generic notices;
    /// the detailed message goes to the log.
    pub fn to_user_message(&self) -> String {
        match self {
            CoreError::AIRequestFailed(_) | CoreError::TranscriptionFailed(_) => {
                "Processing failed.".to_string()
            }
            CoreError::ExportUnsupported(_) => {
                "Your platform does not support video export. Install an FFmpeg build with VP9/Opus or H.264 support."
                    .to_string()
            }
            CoreError::PlaybackFailed(_)
            | CoreError::EncoderFailed(_)
            | CoreError::ExportAborted(_) => "Export failed. Please try again.".to_string(),
            CoreError::ExportAlreadyRunning => "An export is already in progress.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error belongs to a failed export that may be retried
    pub fn is_retryable_export_failure(&self) -> bool {
        matches!(
            self,
            CoreError::PlaybackFailed(_) | CoreError::EncoderFailed(_) | CoreError::ExportAborted(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_collapses_transcription_errors() {
        let err = CoreError::AIRequestFailed("HTTP 500".to_string());
        assert_eq!(err.to_user_message(), "Processing failed.");
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn test_user_message_for_export_failures() {
        let err = CoreError::ExportUnsupported("video/mp4".to_string());
        assert!(err.to_user_message().contains("does not support video export"));
        assert!(!err.is_retryable_export_failure());

        let err = CoreError::EncoderFailed("broken pipe".to_string());
        assert_eq!(err.to_user_message(), "Export failed. Please try again.");
        assert!(err.is_retryable_export_failure());
    }

    #[test]
    fn test_ffmpeg_error_converts() {
        let err: CoreError = FFmpegError::NotFound.into();
        assert!(matches!(err, CoreError::FFmpeg(FFmpegError::NotFound)));
    }
}
