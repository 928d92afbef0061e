//! Export Session
//!
//! One run of seek → settle → capture → negotiate → record → play → stop →
//! finalize, as an explicit state machine. Each transition waits for the
//! host event that completes the previous step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc::{error::TryRecvError, Sender};
use tracing::{debug, error, info, warn};

use super::host::{
    negotiate, ArtifactSink, CombinedStream, HostEvent, HostEventReceiver, PlaybackHost,
    Recorder, StreamSource,
};
use super::models::{
    progress_percent, ExportArtifact, ExportOptions, ExportPhase, ExportProgress, ExportReport,
    RecorderConfig, MIME_PREFERENCES,
};
use crate::core::{CoreError, CoreResult};

/// Highest percentage reported before playback has ended
const PRE_END_PERCENT_CAP: u8 = 99;

// =============================================================================
// ExportSession
// =============================================================================

/// A single export run over a set of hosts
pub struct ExportSession<P, S, R, K> {
    playback: P,
    streams: S,
    recorder: R,
    sink: K,
    events: HostEventReceiver,
    progress_tx: Option<Sender<ExportProgress>>,
    options: ExportOptions,
    preferences: Vec<String>,
    phase: ExportPhase,
    percent: u8,
    chunks: Vec<Vec<u8>>,
    recording: bool,
    captured: bool,
}

impl<P, S, R, K> ExportSession<P, S, R, K>
where
    P: PlaybackHost,
    S: StreamSource,
    R: Recorder<S::Video, S::Audio>,
    K: ArtifactSink,
{
    pub fn new(
        playback: P,
        streams: S,
        recorder: R,
        sink: K,
        events: HostEventReceiver,
        options: ExportOptions,
    ) -> Self {
        Self {
            playback,
            streams,
            recorder,
            sink,
            events,
            progress_tx: None,
            options,
            preferences: MIME_PREFERENCES.iter().map(|m| m.to_string()).collect(),
            phase: ExportPhase::Idle,
            percent: 0,
            chunks: Vec::new(),
            recording: false,
            captured: false,
        }
    }

    /// Sends progress updates to `tx`
    pub fn with_progress(mut self, tx: Sender<ExportProgress>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    /// Replaces the container/codec preference list
    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Returns the hosts, e.g. to inspect them after the run
    pub fn into_hosts(self) -> (P, S, R, K) {
        (self.playback, self.streams, self.recorder, self.sink)
    }

    /// Runs the session to completion.
    ///
    /// Every failure path stops the encoder if it was started, discards
    /// partial output, releases captures and leaves playback paused.
    pub async fn run(&mut self) -> CoreResult<ExportReport> {
        if self.phase != ExportPhase::Idle {
            return Err(CoreError::ExportAborted(format!(
                "Session already ran (phase {})",
                self.phase
            )));
        }

        let started = Instant::now();
        match self.execute(started).await {
            Ok(report) => {
                self.enter(ExportPhase::Done, "Export complete").await;
                info!(
                    "Export finished: {} ({} bytes, {:.1}s)",
                    report.file_name, report.size_bytes, report.elapsed_sec
                );
                Ok(report)
            }
            Err(e) => {
                error!("Export failed during {}: {}", self.phase, e);
                self.abort();
                self.enter(ExportPhase::Error, &e.to_user_message()).await;
                Err(e)
            }
        }
    }

    async fn execute(&mut self, started: Instant) -> CoreResult<ExportReport> {
        // SEEK_TO_START
        self.enter(ExportPhase::SeekToStart, "Rewinding").await;
        self.discard_stale_events();
        self.playback.pause();
        self.playback.seek(0.0);
        self.wait_for_seek().await?;

        // SETTLE_DELAY
        self.enter(ExportPhase::SettleDelay, "Waiting for first frame").await;
        tokio::time::sleep(self.options.settle_delay).await;

        // CAPTURE_STREAMS
        self.enter(ExportPhase::CaptureStreams, "Capturing streams").await;
        self.captured = true;
        let video = self.streams.capture_video(self.options.fps)?;
        let audio = match self.streams.capture_audio() {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("Audio capture unavailable, exporting without sound: {}", e);
                None
            }
        };

        // NEGOTIATE_CODEC
        self.enter(ExportPhase::NegotiateCodec, "Selecting format").await;
        let preferences: Vec<&str> = self.preferences.iter().map(String::as_str).collect();
        let mime_type = negotiate::<S::Video, S::Audio, R>(&self.recorder, &preferences)
            .map(str::to_string)
            .ok_or_else(|| CoreError::ExportUnsupported(self.preferences.join(", ")))?;
        info!("Negotiated export format {}", mime_type);

        // START_RECORDING
        self.enter(ExportPhase::StartRecording, "Starting encoder").await;
        let config = RecorderConfig {
            mime_type: mime_type.clone(),
            video_bits_per_second: self.options.video_bits_per_second,
            fps: self.options.fps,
        };
        self.recorder.start(CombinedStream { video, audio }, &config)?;
        self.recording = true;

        // PLAYBACK
        self.enter(ExportPhase::Playback, "Rendering").await;
        self.playback
            .play()
            .await
            .map_err(|e| CoreError::PlaybackFailed(e.to_string()))?;
        self.pump_until_ended().await?;

        // STOP_RECORDING
        self.percent = 100;
        self.enter(ExportPhase::StopRecording, "Finishing encode").await;
        self.recorder.stop();
        self.recording = false;
        self.drain_until_stopped().await?;

        // FINALIZE
        self.enter(ExportPhase::Finalize, "Saving file").await;
        let bytes = self.chunks.concat();
        self.chunks.clear();
        if bytes.is_empty() {
            return Err(CoreError::EncoderFailed(
                "Encoder produced no output".to_string(),
            ));
        }
        let artifact = ExportArtifact::new(&mime_type, bytes);
        let file_name = artifact.file_name.clone();
        let size_bytes = artifact.len() as u64;
        let location = self.sink.deliver(artifact).await?;

        self.streams.release();
        self.captured = false;
        self.playback.pause();
        self.playback.seek(0.0);

        Ok(ExportReport {
            file_name,
            mime_type,
            location,
            size_bytes,
            duration_sec: self.playback.duration(),
            elapsed_sec: started.elapsed().as_secs_f64(),
        })
    }

    // -------------------------------------------------------------------------
    // Event waits
    // -------------------------------------------------------------------------

    async fn next_event(&mut self) -> CoreResult<HostEvent> {
        self.events
            .recv()
            .await
            .ok_or_else(|| CoreError::ExportAborted("Host event channel closed".to_string()))
    }

    /// Drops events queued before this session asked for anything
    fn discard_stale_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => debug!("Discarding stale host event {:?}", event_name(&event)),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    async fn wait_for_seek(&mut self) -> CoreResult<()> {
        let timeout = self.options.seek_timeout;
        tokio::time::timeout(timeout, self.seek_acknowledged())
            .await
            .map_err(|_| {
                CoreError::Timeout(format!(
                    "Seek to start not acknowledged within {:?}",
                    timeout
                ))
            })?
    }

    async fn seek_acknowledged(&mut self) -> CoreResult<()> {
        loop {
            match self.next_event().await? {
                HostEvent::Seeked => return Ok(()),
                HostEvent::PlaybackError(msg) => return Err(CoreError::PlaybackFailed(msg)),
                other => debug!("Ignoring {} while seeking", event_name(&other)),
            }
        }
    }

    async fn pump_until_ended(&mut self) -> CoreResult<()> {
        loop {
            match self.next_event().await? {
                HostEvent::TimeUpdate {
                    current_time,
                    duration,
                } => {
                    let percent =
                        progress_percent(current_time, duration).min(PRE_END_PERCENT_CAP);
                    if percent > self.percent {
                        self.percent = percent;
                        self.report("Rendering").await;
                    }
                }
                HostEvent::EncoderData(chunk) => self.push_chunk(chunk),
                HostEvent::Ended => {
                    info!("Playback ended, stopping encoder");
                    return Ok(());
                }
                HostEvent::PlaybackError(msg) => return Err(CoreError::PlaybackFailed(msg)),
                HostEvent::EncoderError(msg) => return Err(CoreError::EncoderFailed(msg)),
                HostEvent::EncoderStopped => {
                    return Err(CoreError::EncoderFailed(
                        "Encoder stopped before playback ended".to_string(),
                    ))
                }
                HostEvent::Seeked => {}
            }
        }
    }

    async fn drain_until_stopped(&mut self) -> CoreResult<()> {
        let timeout = self.options.stop_timeout;
        tokio::time::timeout(timeout, self.encoder_stopped())
            .await
            .map_err(|_| {
                CoreError::Timeout(format!("Encoder did not finalize within {:?}", timeout))
            })?
    }

    async fn encoder_stopped(&mut self) -> CoreResult<()> {
        loop {
            match self.next_event().await? {
                HostEvent::EncoderData(chunk) => self.push_chunk(chunk),
                HostEvent::EncoderStopped => return Ok(()),
                HostEvent::EncoderError(msg) => return Err(CoreError::EncoderFailed(msg)),
                other => debug!("Ignoring {} while finalizing", event_name(&other)),
            }
        }
    }

    fn push_chunk(&mut self, chunk: Vec<u8>) {
        if !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    async fn enter(&mut self, phase: ExportPhase, message: &str) {
        info!("Export phase: {} -> {}", self.phase, phase);
        self.phase = phase;
        self.report(message).await;
    }

    async fn report(&self, message: &str) {
        if let Some(ref tx) = self.progress_tx {
            let _ = tx
                .send(ExportProgress {
                    phase: self.phase,
                    percent: self.percent,
                    message: message.to_string(),
                })
                .await;
        }
    }

    /// Returns every host to a resting state after a failure
    fn abort(&mut self) {
        if self.recording {
            self.recorder.stop();
            self.recording = false;
        }
        self.chunks.clear();
        if self.captured {
            self.streams.release();
            self.captured = false;
        }
        self.playback.pause();
    }
}

fn event_name(event: &HostEvent) -> &'static str {
    match event {
        HostEvent::Seeked => "Seeked",
        HostEvent::TimeUpdate { .. } => "TimeUpdate",
        HostEvent::Ended => "Ended",
        HostEvent::PlaybackError(_) => "PlaybackError",
        HostEvent::EncoderData(_) => "EncoderData",
        HostEvent::EncoderStopped => "EncoderStopped",
        HostEvent::EncoderError(_) => "EncoderError",
    }
}

// =============================================================================
// ExportOrchestrator
// =============================================================================

/// Single-flight gate around export sessions.
///
/// The active flag is shared with whoever draws the export watermark.
#[derive(Debug, Clone, Default)]
pub struct ExportOrchestrator {
    active: Arc<AtomicBool>,
}

struct ActiveGuard<'a>(&'a AtomicBool);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ExportOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orchestrator publishing its state through `flag`
    pub fn with_flag(flag: Arc<AtomicBool>) -> Self {
        Self { active: flag }
    }

    pub fn is_exporting(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }

    /// Runs `session`, refusing to start while another export is active
    pub async fn export<P, S, R, K>(
        &self,
        session: &mut ExportSession<P, S, R, K>,
    ) -> CoreResult<ExportReport>
    where
        P: PlaybackHost,
        S: StreamSource,
        R: Recorder<S::Video, S::Audio>,
        K: ArtifactSink,
    {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Export requested while another export is running");
            return Err(CoreError::ExportAlreadyRunning);
        }
        let _guard = ActiveGuard(&self.active);

        session.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::host::{host_channel, HostEventSender};
    use crate::core::TimeSec;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    // -------------------------------------------------------------------------
    // Scripted fake hosts
    // -------------------------------------------------------------------------

    type CallLog = Arc<Mutex<Vec<String>>>;

    fn log(calls: &CallLog, entry: &str) {
        calls.lock().unwrap().push(entry.to_string());
    }

    fn entries(calls: &CallLog) -> Vec<String> {
        calls.lock().unwrap().clone()
    }

    fn position(calls: &CallLog, entry: &str) -> usize {
        entries(calls)
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{} never called: {:?}", entry, entries(calls)))
    }

    #[derive(Clone, Copy)]
    enum SeekAck {
        Immediate,
        Late(Duration),
        Never,
    }

    #[derive(Clone)]
    enum PlayScript {
        /// Time updates at the given times, then Ended
        Runs(Vec<TimeSec>),
        /// `play()` itself fails
        Rejects,
        /// Time updates, then a playback error
        FailsAfter(Vec<TimeSec>),
        /// Time updates, then an encoder error
        EncoderFailsAfter(Vec<TimeSec>),
    }

    struct FakePlayback {
        calls: CallLog,
        tx: HostEventSender,
        seek_ack: SeekAck,
        script: PlayScript,
        duration: TimeSec,
    }

    #[async_trait]
    impl PlaybackHost for FakePlayback {
        fn pause(&mut self) {
            log(&self.calls, "pause");
        }

        fn seek(&mut self, time: TimeSec) {
            log(&self.calls, &format!("seek {}", time));
            let tx = self.tx.clone();
            match self.seek_ack {
                SeekAck::Immediate => {
                    let _ = tx.send(HostEvent::Seeked);
                }
                SeekAck::Late(delay) => {
                    let calls = self.calls.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        log(&calls, "seeked");
                        let _ = tx.send(HostEvent::Seeked);
                    });
                }
                SeekAck::Never => {}
            }
        }

        async fn play(&mut self) -> CoreResult<()> {
            log(&self.calls, "play");
            let (times, tail) = match self.script.clone() {
                PlayScript::Rejects => {
                    return Err(CoreError::Internal("autoplay blocked".to_string()))
                }
                PlayScript::Runs(times) => (times, HostEvent::Ended),
                PlayScript::FailsAfter(times) => {
                    (times, HostEvent::PlaybackError("decode error".to_string()))
                }
                PlayScript::EncoderFailsAfter(times) => {
                    (times, HostEvent::EncoderError("disk full".to_string()))
                }
            };
            for t in times {
                let _ = self.tx.send(HostEvent::TimeUpdate {
                    current_time: t,
                    duration: self.duration,
                });
                let _ = self.tx.send(HostEvent::EncoderData(vec![t as u8 + 1]));
            }
            let _ = self.tx.send(tail);
            Ok(())
        }

        fn duration(&self) -> TimeSec {
            self.duration
        }
    }

    struct FakeStreams {
        calls: CallLog,
        audio: bool,
    }

    impl StreamSource for FakeStreams {
        type Video = &'static str;
        type Audio = &'static str;

        fn capture_video(&mut self, fps: u32) -> CoreResult<Self::Video> {
            log(&self.calls, &format!("capture_video {}", fps));
            Ok("video")
        }

        fn capture_audio(&mut self) -> CoreResult<Self::Audio> {
            log(&self.calls, "capture_audio");
            if self.audio {
                Ok("audio")
            } else {
                Err(CoreError::NotSupported("no audio track".to_string()))
            }
        }

        fn release(&mut self) {
            log(&self.calls, "release");
        }
    }

    struct FakeRecorder {
        calls: CallLog,
        tx: HostEventSender,
        supported: Vec<&'static str>,
        started_with: Option<(RecorderConfig, bool)>,
        fail_on_stop: bool,
    }

    impl Recorder<&'static str, &'static str> for FakeRecorder {
        fn is_type_supported(&self, mime_type: &str) -> bool {
            self.supported.contains(&mime_type)
        }

        fn start(
            &mut self,
            stream: CombinedStream<&'static str, &'static str>,
            config: &RecorderConfig,
        ) -> CoreResult<()> {
            log(&self.calls, "start");
            self.started_with = Some((config.clone(), stream.has_audio()));
            Ok(())
        }

        fn stop(&mut self) {
            log(&self.calls, "stop");
            let _ = self.tx.send(HostEvent::EncoderData(vec![0xFF]));
            if self.fail_on_stop {
                let _ = self.tx.send(HostEvent::EncoderError("trailer write failed".to_string()));
            } else {
                let _ = self.tx.send(HostEvent::EncoderStopped);
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        delivered: Vec<ExportArtifact>,
    }

    #[async_trait]
    impl ArtifactSink for MemorySink {
        async fn deliver(&mut self, artifact: ExportArtifact) -> CoreResult<PathBuf> {
            let location = PathBuf::from(&artifact.file_name);
            self.delivered.push(artifact);
            Ok(location)
        }
    }

    struct Harness {
        calls: CallLog,
        seek_ack: SeekAck,
        script: PlayScript,
        supported: Vec<&'static str>,
        audio: bool,
        fail_on_stop: bool,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                seek_ack: SeekAck::Immediate,
                script: PlayScript::Runs(vec![0.5, 1.0, 1.5, 2.0]),
                supported: vec!["video/webm;codecs=vp9,opus"],
                audio: true,
                fail_on_stop: false,
            }
        }

        fn session(
            &self,
        ) -> ExportSession<FakePlayback, FakeStreams, FakeRecorder, MemorySink> {
            let (tx, rx) = host_channel();
            let options = ExportOptions {
                settle_delay: Duration::from_millis(1),
                seek_timeout: Duration::from_millis(200),
                stop_timeout: Duration::from_millis(200),
                ..Default::default()
            };
            ExportSession::new(
                FakePlayback {
                    calls: self.calls.clone(),
                    tx: tx.clone(),
                    seek_ack: self.seek_ack,
                    script: self.script.clone(),
                    duration: 2.0,
                },
                FakeStreams {
                    calls: self.calls.clone(),
                    audio: self.audio,
                },
                FakeRecorder {
                    calls: self.calls.clone(),
                    tx,
                    supported: self.supported.clone(),
                    started_with: None,
                    fail_on_stop: self.fail_on_stop,
                },
                MemorySink::default(),
                rx,
                options,
            )
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<ExportProgress>) -> Vec<ExportProgress> {
        let mut updates = Vec::new();
        while let Ok(p) = rx.try_recv() {
            updates.push(p);
        }
        updates
    }

    // -------------------------------------------------------------------------
    // Happy path
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_export_call_order() {
        let harness = Harness::new();
        let mut session = harness.session();

        let report = session.run().await.unwrap();
        assert_eq!(session.phase(), ExportPhase::Done);
        assert_eq!(report.mime_type, "video/webm;codecs=vp9,opus");
        assert!(report.file_name.starts_with("capgen-export-"));
        assert!(report.file_name.ends_with(".webm"));
        assert_eq!(report.duration_sec, 2.0);

        let calls = &harness.calls;
        assert!(position(calls, "seek 0") < position(calls, "capture_video 30"));
        assert!(position(calls, "capture_video 30") < position(calls, "start"));
        assert!(position(calls, "start") < position(calls, "play"));
        assert!(position(calls, "play") < position(calls, "stop"));
        assert!(position(calls, "stop") < position(calls, "release"));
        assert_eq!(entries(calls).last().map(String::as_str), Some("seek 0"));

        let (_, _, recorder, sink) = session.into_hosts();
        let (config, has_audio) = recorder.started_with.unwrap();
        assert_eq!(config.video_bits_per_second, 8_000_000);
        assert_eq!(config.fps, 30);
        assert!(has_audio);

        assert_eq!(sink.delivered.len(), 1);
        assert_eq!(sink.delivered[0].bytes, vec![1, 2, 2, 3, 0xFF]);
        assert_eq!(report.size_bytes, 5);
    }

    #[tokio::test]
    async fn test_late_seek_ack_delays_capture() {
        let mut harness = Harness::new();
        harness.seek_ack = SeekAck::Late(Duration::from_millis(30));
        let mut session = harness.session();

        session.run().await.unwrap();
        let calls = &harness.calls;
        assert!(position(calls, "seeked") < position(calls, "capture_video 30"));
    }

    #[tokio::test]
    async fn test_seek_never_acknowledged_times_out() {
        let mut harness = Harness::new();
        harness.seek_ack = SeekAck::Never;
        let mut session = harness.session();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, CoreError::Timeout(_)));
        assert_eq!(session.phase(), ExportPhase::Error);
        let calls = entries(&harness.calls);
        assert!(!calls.iter().any(|c| c.starts_with("capture")));
        assert!(!calls.iter().any(|c| c == "start"));
    }

    #[tokio::test]
    async fn test_missing_audio_does_not_abort() {
        let mut harness = Harness::new();
        harness.audio = false;
        let mut session = harness.session();

        session.run().await.unwrap();
        let (_, _, recorder, _) = session.into_hosts();
        let (_, has_audio) = recorder.started_with.unwrap();
        assert!(!has_audio);
    }

    #[tokio::test]
    async fn test_negotiation_falls_through_preferences() {
        let mut harness = Harness::new();
        harness.supported = vec!["video/mp4", "video/webm"];
        let mut session = harness.session();

        let report = session.run().await.unwrap();
        assert_eq!(report.mime_type, "video/webm");
    }

    #[tokio::test]
    async fn test_mp4_extension() {
        let mut harness = Harness::new();
        harness.supported = vec!["video/mp4"];
        let mut session = harness.session();

        let report = session.run().await.unwrap();
        assert!(report.file_name.ends_with(".mp4"));
    }

    // -------------------------------------------------------------------------
    // Progress
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_progress_reaches_100_only_after_end() {
        let harness = Harness::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let mut session = harness.session().with_progress(tx);

        session.run().await.unwrap();
        let updates = drain(&mut rx);

        let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);

        let first_full = updates.iter().position(|u| u.percent == 100).unwrap();
        assert_eq!(updates[first_full].phase, ExportPhase::StopRecording);
        assert!(updates[..first_full]
            .iter()
            .all(|u| u.phase != ExportPhase::StopRecording));

        let playback: Vec<u8> = updates
            .iter()
            .filter(|u| u.phase == ExportPhase::Playback)
            .map(|u| u.percent)
            .collect();
        assert_eq!(playback, vec![0, 25, 50, 75, 99]);

        assert_eq!(updates.last().unwrap().phase, ExportPhase::Done);
    }

    #[tokio::test]
    async fn test_phases_are_reported_in_order() {
        let harness = Harness::new();
        let (tx, mut rx) = tokio::sync::mpsc::channel(64);
        let mut session = harness.session().with_progress(tx);
        session.run().await.unwrap();

        let mut phases: Vec<ExportPhase> = drain(&mut rx).into_iter().map(|u| u.phase).collect();
        phases.dedup();
        assert_eq!(
            phases,
            vec![
                ExportPhase::SeekToStart,
                ExportPhase::SettleDelay,
                ExportPhase::CaptureStreams,
                ExportPhase::NegotiateCodec,
                ExportPhase::StartRecording,
                ExportPhase::Playback,
                ExportPhase::StopRecording,
                ExportPhase::Finalize,
                ExportPhase::Done,
            ]
        );
    }

    // -------------------------------------------------------------------------
    // Failure paths
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_no_supported_codec_never_starts_recording() {
        let mut harness = Harness::new();
        harness.supported = vec![];
        let mut session = harness.session();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, CoreError::ExportUnsupported(_)));
        assert_eq!(session.phase(), ExportPhase::Error);

        let calls = entries(&harness.calls);
        assert!(!calls.iter().any(|c| c == "start"));
        assert!(!calls.iter().any(|c| c == "play"));
        assert!(!calls.iter().any(|c| c == "stop"));
        assert!(calls.iter().any(|c| c == "release"));
        assert_eq!(calls.last().map(String::as_str), Some("pause"));
    }

    #[tokio::test]
    async fn test_play_rejection_stops_encoder() {
        let mut harness = Harness::new();
        harness.script = PlayScript::Rejects;
        let mut session = harness.session();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, CoreError::PlaybackFailed(_)));
        assert!(err.is_retryable_export_failure());

        let calls = &harness.calls;
        assert!(position(calls, "play") < position(calls, "stop"));
        assert!(position(calls, "stop") < position(calls, "release"));
        assert_eq!(entries(calls).last().map(String::as_str), Some("pause"));

        let (_, _, _, sink) = session.into_hosts();
        assert!(sink.delivered.is_empty());
    }

    #[tokio::test]
    async fn test_encoder_error_mid_playback_discards_chunks() {
        let mut harness = Harness::new();
        harness.script = PlayScript::EncoderFailsAfter(vec![0.5, 1.0]);
        let mut session = harness.session();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, CoreError::EncoderFailed(ref m) if m == "disk full"));
        assert_eq!(session.phase(), ExportPhase::Error);
        assert!(session.chunks.is_empty());
        assert!(!session.recording);

        let calls = &harness.calls;
        assert!(position(calls, "play") < position(calls, "stop"));
        assert!(position(calls, "stop") < position(calls, "release"));
        assert_eq!(entries(calls).last().map(String::as_str), Some("pause"));

        let (_, _, _, sink) = session.into_hosts();
        assert!(sink.delivered.is_empty());
    }

    #[tokio::test]
    async fn test_encoder_error_while_finalizing_discards_chunks() {
        let mut harness = Harness::new();
        harness.fail_on_stop = true;
        let mut session = harness.session();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, CoreError::EncoderFailed(ref m) if m == "trailer write failed"));
        assert_eq!(session.phase(), ExportPhase::Error);
        assert!(session.chunks.is_empty());
        assert!(!session.recording);

        let calls = entries(&harness.calls);
        assert_eq!(calls.iter().filter(|c| *c == "stop").count(), 1);
        assert!(calls.iter().any(|c| c == "release"));
        assert_eq!(calls.last().map(String::as_str), Some("pause"));

        let (_, _, _, sink) = session.into_hosts();
        assert!(sink.delivered.is_empty());
    }

    #[tokio::test]
    async fn test_playback_error_mid_export_discards_chunks() {
        let mut harness = Harness::new();
        harness.script = PlayScript::FailsAfter(vec![0.5, 1.0]);
        let mut session = harness.session();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, CoreError::PlaybackFailed(ref m) if m == "decode error"));
        assert!(session.chunks.is_empty());
        assert!(!session.recording);

        let (_, _, _, sink) = session.into_hosts();
        assert!(sink.delivered.is_empty());
    }

    #[tokio::test]
    async fn test_session_runs_once() {
        let harness = Harness::new();
        let mut session = harness.session();
        session.run().await.unwrap();
        assert!(matches!(
            session.run().await,
            Err(CoreError::ExportAborted(_))
        ));
    }

    // -------------------------------------------------------------------------
    // ExportOrchestrator
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_orchestrator_single_flight() {
        let orchestrator = ExportOrchestrator::new();
        let flag = orchestrator.flag();

        flag.store(true, Ordering::SeqCst);
        let harness = Harness::new();
        let mut session = harness.session();
        let err = orchestrator.export(&mut session).await.unwrap_err();
        assert!(matches!(err, CoreError::ExportAlreadyRunning));
        assert!(entries(&harness.calls).is_empty());

        flag.store(false, Ordering::SeqCst);
        orchestrator.export(&mut session).await.unwrap();
        assert!(!orchestrator.is_exporting());
    }

    #[tokio::test]
    async fn test_orchestrator_clears_flag_after_failure() {
        let mut harness = Harness::new();
        harness.supported = vec![];
        let orchestrator = ExportOrchestrator::new();
        let mut session = harness.session();

        assert!(orchestrator.export(&mut session).await.is_err());
        assert!(!orchestrator.is_exporting());
    }

    #[tokio::test]
    async fn test_orchestrator_flag_set_while_running() {
        let flag = Arc::new(AtomicBool::new(false));
        let orchestrator = ExportOrchestrator::with_flag(flag.clone());

        let mut harness = Harness::new();
        harness.seek_ack = SeekAck::Late(Duration::from_millis(50));
        let mut session = harness.session();

        let observer = {
            let flag = flag.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.load(Ordering::SeqCst)
            })
        };

        orchestrator.export(&mut session).await.unwrap();
        assert!(observer.await.unwrap());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
