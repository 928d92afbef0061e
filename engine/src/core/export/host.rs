//! Export Host Interfaces
//!
//! The export session drives four collaborators it does not own the
//! implementation of: the playback element, the stream source (render
//! surface plus source audio), the recorder and the artifact sink.
//! Asynchronous completions from all of them arrive on one
//! [`HostEvent`] channel.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::models::{ExportArtifact, RecorderConfig};
use crate::core::{CoreResult, TimeSec};

// =============================================================================
// Events
// =============================================================================

/// Completion events raised by the hosts
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    /// A requested seek has completed
    Seeked,
    /// Playback position changed
    TimeUpdate {
        current_time: TimeSec,
        duration: TimeSec,
    },
    /// Playback reached the natural end of the media
    Ended,
    PlaybackError(String),
    /// An encoded chunk is available
    EncoderData(Vec<u8>),
    /// The encoder finished after a stop request
    EncoderStopped,
    EncoderError(String),
}

pub type HostEventSender = mpsc::UnboundedSender<HostEvent>;
pub type HostEventReceiver = mpsc::UnboundedReceiver<HostEvent>;

/// Creates the event channel shared by the hosts of one session
pub fn host_channel() -> (HostEventSender, HostEventReceiver) {
    mpsc::unbounded_channel()
}

// =============================================================================
// Host Traits
// =============================================================================

/// The media element being exported
#[async_trait]
pub trait PlaybackHost: Send {
    fn pause(&mut self);

    /// Requests a seek. Completion is reported as [`HostEvent::Seeked`].
    fn seek(&mut self, time: TimeSec);

    /// Starts playback; frames and time updates follow as events
    async fn play(&mut self) -> CoreResult<()>;

    /// Media duration in seconds
    fn duration(&self) -> TimeSec;
}

/// Source of the pixel stream and the optional audio stream
pub trait StreamSource: Send {
    type Video: Send;
    type Audio: Send;

    /// Continuous capture of the render surface at `fps`
    fn capture_video(&mut self, fps: u32) -> CoreResult<Self::Video>;

    /// Best-effort capture of the source audio
    fn capture_audio(&mut self) -> CoreResult<Self::Audio>;

    /// Releases every capture handed out
    fn release(&mut self);
}

/// Video plus optional audio, as handed to the recorder
#[derive(Debug)]
pub struct CombinedStream<V, A> {
    pub video: V,
    pub audio: Option<A>,
}

impl<V, A> CombinedStream<V, A> {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// Encoder of a combined stream.
///
/// Output chunks are reported as [`HostEvent::EncoderData`], finalization
/// as [`HostEvent::EncoderStopped`].
pub trait Recorder<V, A>: Send {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn start(&mut self, stream: CombinedStream<V, A>, config: &RecorderConfig) -> CoreResult<()>;

    /// Requests finalization; idempotent
    fn stop(&mut self);
}

/// Destination of the finished artifact
#[async_trait]
pub trait ArtifactSink: Send {
    /// Stores the artifact and returns where it went
    async fn deliver(&mut self, artifact: ExportArtifact) -> CoreResult<PathBuf>;
}

/// Picks the first entry of `preferences` the recorder can encode
pub fn negotiate<'a, V, A, R>(recorder: &R, preferences: &[&'a str]) -> Option<&'a str>
where
    R: Recorder<V, A> + ?Sized,
{
    preferences
        .iter()
        .copied()
        .find(|mime| recorder.is_type_supported(mime))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::models::MIME_PREFERENCES;

    struct Supports(Vec<&'static str>);

    impl Recorder<(), ()> for Supports {
        fn is_type_supported(&self, mime_type: &str) -> bool {
            self.0.contains(&mime_type)
        }

        fn start(&mut self, _: CombinedStream<(), ()>, _: &RecorderConfig) -> CoreResult<()> {
            Ok(())
        }

        fn stop(&mut self) {}
    }

    #[test]
    fn test_negotiate_picks_first_supported() {
        let recorder = Supports(vec!["video/mp4", "video/webm;codecs=vp8,opus"]);
        assert_eq!(
            negotiate(&recorder, &MIME_PREFERENCES),
            Some("video/webm;codecs=vp8,opus")
        );
    }

    #[test]
    fn test_negotiate_single_and_none() {
        let recorder = Supports(vec!["video/webm;codecs=vp9,opus"]);
        assert_eq!(
            negotiate(&recorder, &MIME_PREFERENCES),
            Some("video/webm;codecs=vp9,opus")
        );

        let recorder = Supports(vec![]);
        assert_eq!(negotiate(&recorder, &MIME_PREFERENCES), None);
    }

    #[test]
    fn test_combined_stream_audio_flag() {
        let stream: CombinedStream<u8, u8> = CombinedStream {
            video: 1,
            audio: None,
        };
        assert!(!stream.has_audio());
    }
}
