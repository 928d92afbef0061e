//! FFmpeg Media Host
//!
//! Headless stand-ins for the browser pieces the export pipeline talks to:
//! - `detection`: locating `ffmpeg`/`ffprobe`
//! - `runner`: probing, single-frame extraction, encoder listing
//! - `encoders`: mapping the installed encoders onto export MIME types
//! - `host`: playback, capture, recorder and sink over FFmpeg subprocesses

mod detection;
pub mod encoders;
pub mod host;
mod runner;

pub use detection::*;
pub use encoders::{EncodePlan, EncoderSupport};
pub use host::{
    build_offline_session, CapturedVideo, FfmpegRecorder, FileArtifactSink, FrameTap,
    OfflinePlayback, OfflineSession, SharedCueSink, SharedStudio, SurfaceCapture,
};
pub use runner::{AudioStreamInfo, FFmpegRunner, MediaInfo, VideoStreamInfo};

/// Errors of the FFmpeg subprocess layer
#[derive(Debug, thiserror::Error)]
pub enum FFmpegError {
    #[error("FFmpeg not found. Install FFmpeg or set CAPGEN_FFMPEG_DIR.")]
    NotFound,

    #[error("FFmpeg execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("Output path error: {0}")]
    OutputError(String),

    #[error("FFprobe error: {0}")]
    ProbeError(String),

    #[error("Process error: {0}")]
    ProcessError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Timeout: operation took too long")]
    Timeout,
}

pub type FFmpegResult<T> = Result<T, FFmpegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_error_display() {
        assert!(FFmpegError::NotFound.to_string().contains("CAPGEN_FFMPEG_DIR"));

        let err = FFmpegError::ProbeError("no streams".to_string());
        assert_eq!(err.to_string(), "FFprobe error: no streams");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FFmpegError = io.into();
        assert!(matches!(err, FFmpegError::ProcessError(_)));
    }
}
