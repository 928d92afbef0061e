//! FFmpeg Export Hosts
//!
//! Headless implementations of the export host interfaces:
//!
//! ```text
//!  ffmpeg decode ──rgba──▶ OfflinePlayback ──draw──▶ RasterSurface
//!                                │                       │
//!                          TimeUpdate/Ended         FrameTap (SurfaceCapture)
//!                                │                       │
//!                                ▼                       ▼
//!                         ExportSession ◀──EncoderData── FfmpegRecorder ──▶ ffmpeg encode
//! ```
//!
//! All completions travel on the session's [`HostEvent`] channel.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{EncodePlan, EncoderSupport, FFmpegRunner, MediaInfo};
use crate::core::export::{
    host_channel, ArtifactSink, CombinedStream, ExportArtifact, ExportOptions, ExportSession,
    HostEvent, HostEventSender, PlaybackHost, Recorder, RecorderConfig, StreamSource,
};
use crate::core::motion::{CueEvent, CueSink};
use crate::core::process::tokio_command;
use crate::core::render::{RasterSurface, RenderSurface, VideoFrame};
use crate::core::studio::Studio;
use crate::core::{CoreError, CoreResult, Size2D, TimeSec};

/// Studio shared between the caller and the playback loop
pub type SharedStudio = Arc<Mutex<Studio>>;

/// Cue destination shared with the playback loop
pub type SharedCueSink = Arc<Mutex<dyn CueSink>>;

/// Slot through which composited frames reach an active capture
pub type FrameTap = Arc<Mutex<Option<mpsc::Sender<VideoFrame>>>>;

/// Frames buffered between the compositor and the encoder
pub const CAPTURE_BUFFER_FRAMES: usize = 8;

/// Encoder stdout read size
const OUTPUT_CHUNK_BYTES: usize = 64 * 1024;

/// Audio bitrate of exported files
const AUDIO_BITRATE: &str = "128k";

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn read_all_text<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut text = String::new();
    if let Err(e) = reader.read_to_string(&mut text).await {
        debug!("Failed to read process stderr: {}", e);
    }
    text
}

// =============================================================================
// OfflinePlayback
// =============================================================================

/// Decodes the source clip frame by frame and draws the studio over it.
///
/// Each decoded frame is composited on a raster surface, published to the
/// frame tap (when a capture is attached) and then reported as a
/// [`HostEvent::TimeUpdate`]. The clock of frame `i` is `start + i / fps`.
pub struct OfflinePlayback {
    ffmpeg_path: PathBuf,
    input: PathBuf,
    duration: TimeSec,
    frame_size: Size2D,
    fps: u32,
    studio: SharedStudio,
    cues: SharedCueSink,
    surface: Arc<Mutex<RasterSurface>>,
    tap: FrameTap,
    events: HostEventSender,
    position: TimeSec,
    decoder: Option<JoinHandle<()>>,
}

impl OfflinePlayback {
    pub fn new(
        runner: &FFmpegRunner,
        input: &Path,
        info: &MediaInfo,
        fps: u32,
        studio: SharedStudio,
        tap: FrameTap,
        events: HostEventSender,
    ) -> CoreResult<Self> {
        let frame_size = info.frame_size().ok_or_else(|| {
            CoreError::ValidationError(format!("{} has no video stream", input.display()))
        })?;
        Ok(Self {
            ffmpeg_path: runner.info().ffmpeg_path.clone(),
            input: input.to_path_buf(),
            duration: info.duration_sec,
            frame_size,
            fps: fps.max(1),
            studio,
            cues: Arc::new(Mutex::new(Vec::<CueEvent>::new())),
            surface: Arc::new(Mutex::new(RasterSurface::new(
                frame_size.width,
                frame_size.height,
            ))),
            tap,
            events,
            position: 0.0,
            decoder: None,
        })
    }

    /// Routes fired cues to `cues` instead of discarding them
    pub fn with_cues(mut self, cues: SharedCueSink) -> Self {
        self.cues = cues;
        self
    }

    pub fn position(&self) -> TimeSec {
        self.position
    }

    fn stop_decoder(&mut self) {
        if let Some(task) = self.decoder.take() {
            task.abort();
            debug!("Decoder stopped at {:.3}s", self.position);
        }
    }
}

impl Drop for OfflinePlayback {
    fn drop(&mut self) {
        self.stop_decoder();
    }
}

#[async_trait]
impl PlaybackHost for OfflinePlayback {
    fn pause(&mut self) {
        self.stop_decoder();
        lock(&self.studio).set_playing(false);
    }

    fn seek(&mut self, time: TimeSec) {
        self.stop_decoder();
        self.position = time.clamp(0.0, self.duration.max(0.0));
        let _ = self.events.send(HostEvent::Seeked);
    }

    async fn play(&mut self) -> CoreResult<()> {
        self.stop_decoder();

        let mut child = tokio_command(&self.ffmpeg_path)
            .args(["-hide_banner", "-v", "error", "-ss", &format!("{:.3}", self.position)])
            .arg("-i")
            .arg(&self.input)
            .args([
                "-an",
                "-vf",
                &format!("fps={}", self.fps),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::PlaybackFailed(format!("Failed to start decoder: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::PlaybackFailed("Decoder stdout unavailable".to_string()))?;

        info!(
            "Decoding {} from {:.3}s at {} fps",
            self.input.display(),
            self.position,
            self.fps
        );
        lock(&self.studio).set_playing(true);

        let decode = DecodeLoop {
            studio: Arc::clone(&self.studio),
            cues: Arc::clone(&self.cues),
            surface: Arc::clone(&self.surface),
            tap: Arc::clone(&self.tap),
            events: self.events.clone(),
            start: self.position,
            fps: self.fps,
            frame_size: self.frame_size,
            duration: self.duration,
        };
        self.decoder = Some(tokio::spawn(decode.run(child, stdout)));
        Ok(())
    }

    fn duration(&self) -> TimeSec {
        self.duration
    }
}

struct DecodeLoop {
    studio: SharedStudio,
    cues: SharedCueSink,
    surface: Arc<Mutex<RasterSurface>>,
    tap: FrameTap,
    events: HostEventSender,
    start: TimeSec,
    fps: u32,
    frame_size: Size2D,
    duration: TimeSec,
}

impl DecodeLoop {
    async fn run(self, mut child: Child, mut stdout: ChildStdout) {
        let stderr = child.stderr.take().map(|s| tokio::spawn(read_all_text(s)));
        let frame_len = self.frame_size.width as usize * self.frame_size.height as usize * 4;
        let mut index: u64 = 0;

        loop {
            let mut pixels = vec![0u8; frame_len];
            match stdout.read_exact(&mut pixels).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    let _ = self
                        .events
                        .send(HostEvent::PlaybackError(format!("Decoder read failed: {}", e)));
                    return;
                }
            }

            let clock = self.start + index as f64 / self.fps as f64;
            index += 1;

            let composed = match self.render(pixels, clock).await {
                Ok(frame) => frame,
                Err(message) => {
                    let _ = self.events.send(HostEvent::PlaybackError(message));
                    return;
                }
            };

            let tap = lock(&self.tap).clone();
            if let Some(tx) = tap {
                if tx.send(composed).await.is_err() {
                    debug!("Capture closed, frame at {:.3}s dropped", clock);
                }
            }

            let _ = self.events.send(HostEvent::TimeUpdate {
                current_time: clock.min(self.duration),
                duration: self.duration,
            });
        }

        let stderr = match stderr {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        match child.wait().await {
            Ok(status) if status.success() => {
                {
                    let mut sink = lock(&self.cues);
                    lock(&self.studio).flush_cues(&mut *sink);
                }
                info!("Playback ended after {} frames", index);
                let _ = self.events.send(HostEvent::Ended);
            }
            Ok(status) => {
                let _ = self.events.send(HostEvent::PlaybackError(format!(
                    "Decoder exited with {}: {}",
                    status,
                    stderr.trim()
                )));
            }
            Err(e) => {
                let _ = self
                    .events
                    .send(HostEvent::PlaybackError(format!("Decoder wait failed: {}", e)));
            }
        }
    }

    /// Composites one decoded frame off the async runtime
    async fn render(&self, pixels: Vec<u8>, clock: TimeSec) -> Result<VideoFrame, String> {
        let studio = Arc::clone(&self.studio);
        let cues = Arc::clone(&self.cues);
        let surface = Arc::clone(&self.surface);
        let size = self.frame_size;

        tokio::task::spawn_blocking(move || {
            let frame = VideoFrame::from_rgba(size.width, size.height, pixels)
                .ok_or_else(|| "Decoded frame has the wrong size".to_string())?;

            let mut surface = lock(&surface);
            let mut sink = lock(&cues);
            let target: &mut dyn RenderSurface = &mut *surface;
            lock(&studio).draw(Some(target), Some(&frame), clock, &mut *sink);
            Ok(surface.to_frame())
        })
        .await
        .map_err(|e| format!("Render task failed: {}", e))?
    }
}

// =============================================================================
// SurfaceCapture
// =============================================================================

/// Captured composited frames, as handed to the recorder
#[derive(Debug)]
pub struct CapturedVideo {
    pub frames: mpsc::Receiver<VideoFrame>,
    pub size: Size2D,
    pub fps: u32,
}

/// Stream source over the playback's frame tap and the source file's audio
#[derive(Debug)]
pub struct SurfaceCapture {
    tap: FrameTap,
    size: Size2D,
    audio_source: Option<PathBuf>,
}

impl SurfaceCapture {
    /// `audio_source` is the file whose first audio track is muxed in
    pub fn new(tap: FrameTap, size: Size2D, audio_source: Option<PathBuf>) -> Self {
        Self {
            tap,
            size,
            audio_source,
        }
    }

    pub fn is_capturing(&self) -> bool {
        lock(&self.tap).is_some()
    }
}

impl StreamSource for SurfaceCapture {
    type Video = CapturedVideo;
    type Audio = PathBuf;

    fn capture_video(&mut self, fps: u32) -> CoreResult<CapturedVideo> {
        let (tx, frames) = mpsc::channel(CAPTURE_BUFFER_FRAMES);
        *lock(&self.tap) = Some(tx);
        debug!(
            "Capturing {}x{} surface at {} fps",
            self.size.width, self.size.height, fps
        );
        Ok(CapturedVideo {
            frames,
            size: self.size,
            fps,
        })
    }

    fn capture_audio(&mut self) -> CoreResult<PathBuf> {
        self.audio_source
            .clone()
            .ok_or_else(|| CoreError::NotSupported("Source has no audio track".to_string()))
    }

    fn release(&mut self) {
        lock(&self.tap).take();
    }
}

// =============================================================================
// FfmpegRecorder
// =============================================================================

/// Encoder process fed with raw RGBA frames on stdin.
///
/// Container bytes stream back from stdout as [`HostEvent::EncoderData`].
/// Stopping closes stdin once the buffered frames are written; the exit
/// status then becomes [`HostEvent::EncoderStopped`] or
/// [`HostEvent::EncoderError`].
pub struct FfmpegRecorder {
    ffmpeg_path: PathBuf,
    support: EncoderSupport,
    events: HostEventSender,
    stop_tx: Option<oneshot::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl FfmpegRecorder {
    pub fn new(runner: &FFmpegRunner, support: EncoderSupport, events: HostEventSender) -> Self {
        Self {
            ffmpeg_path: runner.info().ffmpeg_path.clone(),
            support,
            events,
            stop_tx: None,
            tasks: Vec::new(),
        }
    }

    pub fn support(&self) -> &EncoderSupport {
        &self.support
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Recorder<CapturedVideo, PathBuf> for FfmpegRecorder {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.support.supports(mime_type)
    }

    fn start(
        &mut self,
        stream: CombinedStream<CapturedVideo, PathBuf>,
        config: &RecorderConfig,
    ) -> CoreResult<()> {
        let plan = self
            .support
            .plan(&config.mime_type)
            .ok_or_else(|| CoreError::ExportUnsupported(config.mime_type.clone()))?;

        let CombinedStream { video, audio } = stream;
        let args = encode_args(&plan, video.size, audio.as_deref(), config);
        debug!("Encoder args: {}", args.join(" "));

        let mut child = tokio_command(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CoreError::EncoderFailed(format!("Failed to start encoder: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CoreError::EncoderFailed("Encoder stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::EncoderFailed("Encoder stdout unavailable".to_string()))?;

        info!(
            "Encoder started: {} ({} {}x{} @ {} fps, audio: {})",
            config.mime_type,
            plan.video_codec,
            video.size.width,
            video.size.height,
            config.fps,
            plan.audio_codec.filter(|_| audio.is_some()).unwrap_or("none")
        );

        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        self.tasks
            .push(tokio::spawn(feed_frames(video.frames, stdin, stop_rx)));
        self.tasks
            .push(tokio::spawn(drain_output(child, stdout, self.events.clone())));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            debug!("Encoder stop requested");
            let _ = tx.send(());
        }
    }
}

/// Command line of the encoder process
pub(crate) fn encode_args(
    plan: &EncodePlan,
    size: Size2D,
    audio_source: Option<&Path>,
    config: &RecorderConfig,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-v",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
        &format!("{}x{}", size.width, size.height),
        "-r",
        &config.fps.to_string(),
        "-i",
        "pipe:0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let audio = audio_source.zip(plan.audio_codec);
    if let Some((source, _)) = audio {
        args.push("-i".to_string());
        args.push(source.to_string_lossy().into_owned());
    }

    args.extend(["-map", "0:v:0"].map(String::from));
    args.extend([
        "-c:v".to_string(),
        plan.video_codec.to_string(),
        "-b:v".to_string(),
        config.video_bits_per_second.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ]);

    match audio {
        Some((_, codec)) => {
            args.extend(
                ["-map", "1:a:0?", "-c:a", codec, "-b:a", AUDIO_BITRATE, "-shortest"]
                    .map(String::from),
            );
        }
        None => args.push("-an".to_string()),
    }

    args.extend(plan.extra_args.iter().map(|s| s.to_string()));
    args.extend(["-f", plan.container, "pipe:1"].map(String::from));
    args
}

async fn feed_frames(
    mut frames: mpsc::Receiver<VideoFrame>,
    mut stdin: ChildStdin,
    mut stop: oneshot::Receiver<()>,
) {
    let mut written: u64 = 0;
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = stdin.write_all(&frame.pixels).await {
                        warn!("Encoder input closed after {} frames: {}", written, e);
                        return;
                    }
                    written += 1;
                }
                None => break,
            },
            _ = &mut stop => {
                while let Ok(frame) = frames.try_recv() {
                    if stdin.write_all(&frame.pixels).await.is_err() {
                        return;
                    }
                    written += 1;
                }
                break;
            }
        }
    }

    debug!("Encoder input finished after {} frames", written);
    if let Err(e) = stdin.shutdown().await {
        debug!("Encoder stdin shutdown: {}", e);
    }
}

async fn drain_output(mut child: Child, mut stdout: ChildStdout, events: HostEventSender) {
    let stderr = child.stderr.take().map(|s| tokio::spawn(read_all_text(s)));
    let mut buf = vec![0u8; OUTPUT_CHUNK_BYTES];
    let mut total: usize = 0;

    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                total += n;
                let _ = events.send(HostEvent::EncoderData(buf[..n].to_vec()));
            }
            Err(e) => {
                let _ = events.send(HostEvent::EncoderError(format!(
                    "Encoder read failed: {}",
                    e
                )));
                return;
            }
        }
    }

    let stderr = match stderr {
        Some(task) => task.await.unwrap_or_default(),
        None => String::new(),
    };
    match child.wait().await {
        Ok(status) if status.success() => {
            info!("Encoder finished ({} bytes)", total);
            let _ = events.send(HostEvent::EncoderStopped);
        }
        Ok(status) => {
            let _ = events.send(HostEvent::EncoderError(format!(
                "Encoder exited with {}: {}",
                status,
                stderr.trim()
            )));
        }
        Err(e) => {
            let _ = events.send(HostEvent::EncoderError(format!(
                "Encoder wait failed: {}",
                e
            )));
        }
    }
}

// =============================================================================
// FileArtifactSink
// =============================================================================

/// Writes finished artifacts into a directory
#[derive(Debug, Clone)]
pub struct FileArtifactSink {
    dir: PathBuf,
}

impl FileArtifactSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ArtifactSink for FileArtifactSink {
    async fn deliver(&mut self, artifact: ExportArtifact) -> CoreResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.bytes).await?;
        info!("Wrote {} ({} bytes)", path.display(), artifact.len());
        Ok(path)
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub type OfflineSession =
    ExportSession<OfflinePlayback, SurfaceCapture, FfmpegRecorder, FileArtifactSink>;

/// Probes `input` and wires an export session over FFmpeg hosts.
///
/// The source's audio track is muxed in when it has one.
pub async fn build_offline_session(
    runner: &FFmpegRunner,
    input: &Path,
    studio: SharedStudio,
    cues: SharedCueSink,
    output_dir: &Path,
    options: ExportOptions,
) -> CoreResult<OfflineSession> {
    let info = runner.probe(input).await?;
    let support = runner.encoders().await?;
    let (events_tx, events_rx) = host_channel();
    let tap: FrameTap = Arc::new(Mutex::new(None));

    let playback = OfflinePlayback::new(
        runner,
        input,
        &info,
        options.fps,
        studio,
        Arc::clone(&tap),
        events_tx.clone(),
    )?
    .with_cues(cues);
    let capture = SurfaceCapture::new(
        tap,
        playback.frame_size,
        info.has_audio().then(|| input.to_path_buf()),
    );
    let recorder = FfmpegRecorder::new(runner, support, events_tx);
    let sink = FileArtifactSink::new(output_dir);

    Ok(ExportSession::new(
        playback, capture, recorder, sink, events_rx, options,
    ))
}
