//! FFmpeg Runner Module
//!
//! Probing, single-frame RGBA extraction and encoder listing.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EncoderSupport, FFmpegError, FFmpegInfo, FFmpegResult};
use crate::core::process::tokio_command;
use crate::core::render::VideoFrame;
use crate::core::{Size2D, TimeSec};

/// Media information extracted by FFprobe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration_sec: TimeSec,
    pub video: Option<VideoStreamInfo>,
    pub audio: Option<AudioStreamInfo>,
    /// Container format
    pub format: String,
    pub size_bytes: u64,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Size of decoded frames, after display rotation
    pub fn frame_size(&self) -> Option<Size2D> {
        self.video.as_ref().map(VideoStreamInfo::display_size)
    }
}

/// Video stream information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub pixel_format: String,
    pub bitrate: Option<u64>,
    /// Display rotation in degrees, as tagged by the camera
    pub rotation: i32,
}

impl VideoStreamInfo {
    /// Coded size with width and height swapped for quarter-turn rotations
    pub fn display_size(&self) -> Size2D {
        if self.rotation.rem_euclid(180) == 90 {
            Size2D::new(self.height, self.width)
        } else {
            Size2D::new(self.width, self.height)
        }
    }
}

/// Audio stream information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioStreamInfo {
    pub sample_rate: u32,
    pub channels: u32,
    pub codec: String,
    pub bitrate: Option<u64>,
}

/// FFmpeg command runner
#[derive(Debug, Clone)]
pub struct FFmpegRunner {
    info: Arc<FFmpegInfo>,
}

impl FFmpegRunner {
    pub fn new(info: FFmpegInfo) -> Self {
        Self {
            info: Arc::new(info),
        }
    }

    pub fn info(&self) -> &FFmpegInfo {
        &self.info
    }

    /// Probe media file for information
    pub async fn probe(&self, input: &Path) -> FFmpegResult<MediaInfo> {
        ensure_exists(input)?;

        let output = tokio_command(&self.info.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(input)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ProbeError(format!("FFprobe failed: {}", stderr)));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    /// Decodes the frame shown at `time_sec` as straight RGBA
    pub async fn extract_frame_rgba(&self, input: &Path, time_sec: TimeSec) -> FFmpegResult<VideoFrame> {
        let info = self.probe(input).await?;
        let size = info
            .frame_size()
            .ok_or_else(|| FFmpegError::InvalidInput(format!("{} has no video stream", input.display())))?;

        let seek = time_sec.clamp(0.0, info.duration_sec.max(0.0));
        debug!("Extracting {}x{} frame at {:.3}s", size.width, size.height, seek);

        let output = tokio_command(&self.info.ffmpeg_path)
            .args(["-v", "error", "-ss", &format!("{:.3}", seek), "-i"])
            .arg(input)
            .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FFmpegError::ExecutionFailed(format!(
                "Frame extraction failed: {}",
                stderr
            )));
        }

        let got = output.stdout.len();
        VideoFrame::from_rgba(size.width, size.height, output.stdout).ok_or_else(|| {
            FFmpegError::ParseError(format!(
                "Expected {} bytes of RGBA for {}x{}, got {}",
                size.width as usize * size.height as usize * 4,
                size.width,
                size.height,
                got
            ))
        })
    }

    /// Lists the encoders compiled into this FFmpeg build
    pub async fn encoders(&self) -> FFmpegResult<EncoderSupport> {
        let output = tokio_command(&self.info.ffmpeg_path)
            .args(["-hide_banner", "-encoders"])
            .output()
            .await?;

        if !output.status.success() {
            return Err(FFmpegError::ExecutionFailed(
                "Failed to list encoders".to_string(),
            ));
        }

        let support = EncoderSupport::parse(&String::from_utf8_lossy(&output.stdout));
        debug!("FFmpeg reports {} encoders", support.len());
        Ok(support)
    }
}

fn ensure_exists(input: &Path) -> FFmpegResult<()> {
    if input.exists() {
        Ok(())
    } else {
        Err(FFmpegError::InvalidInput(format!(
            "Input file does not exist: {}",
            input.display()
        )))
    }
}

// =============================================================================
// ffprobe JSON
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    format_name: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    pix_fmt: Option<String>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    tags: ProbeTags,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

/// Parse FFprobe JSON output
pub(crate) fn parse_probe_output(json_str: &str) -> FFmpegResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_str(json_str)
        .map_err(|e| FFmpegError::ParseError(format!("Invalid ffprobe JSON: {}", e)))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .map(video_stream);
    let audio = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(audio_stream);

    Ok(MediaInfo {
        duration_sec: parse_number(probe.format.duration.as_deref()).unwrap_or(0.0),
        video,
        audio,
        format: probe.format.format_name.unwrap_or_else(|| "unknown".to_string()),
        size_bytes: parse_number(probe.format.size.as_deref()).unwrap_or(0.0) as u64,
    })
}

fn video_stream(stream: &ProbeStream) -> VideoStreamInfo {
    let fps = parse_frame_rate(stream.r_frame_rate.as_deref())
        .or_else(|| parse_frame_rate(stream.avg_frame_rate.as_deref()))
        .unwrap_or(0.0);

    let rotation = stream
        .side_data_list
        .iter()
        .find_map(|d| d.rotation)
        .or_else(|| parse_number(stream.tags.rotate.as_deref()))
        .unwrap_or(0.0)
        .round() as i32;

    VideoStreamInfo {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        codec: stream.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
        pixel_format: stream.pix_fmt.clone().unwrap_or_else(|| "unknown".to_string()),
        bitrate: parse_number(stream.bit_rate.as_deref()).map(|b| b as u64),
        rotation,
    }
}

fn audio_stream(stream: &ProbeStream) -> AudioStreamInfo {
    AudioStreamInfo {
        sample_rate: parse_number(stream.sample_rate.as_deref()).unwrap_or(0.0) as u32,
        channels: stream.channels.unwrap_or(0),
        codec: stream.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
        bitrate: parse_number(stream.bit_rate.as_deref()).map(|b| b as u64),
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `"30000/1001"` → 29.97; `"0/0"` and garbage → `None`
fn parse_frame_rate(value: Option<&str>) -> Option<f64> {
    let value = value?;
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
