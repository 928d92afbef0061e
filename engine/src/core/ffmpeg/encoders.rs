//! Encoder Capability Mapping
//!
//! Turns the encoder list of the installed FFmpeg into answers for the
//! export MIME negotiation, plus the codec arguments for a chosen type.

use std::collections::HashSet;

/// Codec selection for one negotiated MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    /// FFmpeg muxer name
    pub container: &'static str,
    pub video_codec: &'static str,
    /// `None` when the container can be written but no audio encoder exists
    pub audio_codec: Option<&'static str>,
    /// Codec and muxer arguments appended after the codec selection
    pub extra_args: Vec<&'static str>,
}

impl EncodePlan {
    fn webm(video_codec: &'static str, audio_codec: Option<&'static str>) -> Self {
        Self {
            container: "webm",
            video_codec,
            audio_codec,
            extra_args: vec!["-deadline", "realtime", "-cpu-used", "8"],
        }
    }
}

/// Encoders available in an FFmpeg build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderSupport {
    names: HashSet<String>,
}

impl EncoderSupport {
    /// Parses `ffmpeg -encoders` output.
    ///
    /// Entries follow the ` ------` separator as `<flags> <name> <description>`.
    pub fn parse(output: &str) -> Self {
        let names = output
            .lines()
            .skip_while(|line| !line.trim_start().starts_with("---"))
            .skip(1)
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let _flags = fields.next()?;
                fields.next().map(str::to_string)
            })
            .collect();
        Self { names }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, encoder: &str) -> bool {
        self.names.contains(encoder)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn supports(&self, mime_type: &str) -> bool {
        self.plan(mime_type).is_some()
    }

    /// Codec plan for `mime_type`, `None` when this build cannot produce it
    pub fn plan(&self, mime_type: &str) -> Option<EncodePlan> {
        let (container, codecs) = split_mime(mime_type);
        match (container, codecs.as_slice()) {
            ("video/webm", ["vp9", "opus"]) => self
                .both("libvpx-vp9", "libopus")
                .then(|| EncodePlan::webm("libvpx-vp9", Some("libopus"))),
            ("video/webm", ["vp8", "opus"]) => self
                .both("libvpx", "libopus")
                .then(|| EncodePlan::webm("libvpx", Some("libopus"))),
            // The WebM muxer rejects H.264
            ("video/webm", ["h264", ..]) => None,
            ("video/webm", []) => {
                let video = ["libvpx-vp9", "libvpx"]
                    .into_iter()
                    .find(|name| self.has(name))?;
                let audio = ["libopus", "libvorbis"]
                    .into_iter()
                    .find(|name| self.has(name));
                Some(EncodePlan::webm(video, audio))
            }
            ("video/mp4", []) if self.has("libx264") => Some(EncodePlan {
                container: "mp4",
                video_codec: "libx264",
                audio_codec: self.has("aac").then_some("aac"),
                extra_args: vec![
                    "-preset",
                    "veryfast",
                    "-movflags",
                    "frag_keyframe+empty_moov",
                ],
            }),
            _ => None,
        }
    }

    fn both(&self, video: &str, audio: &str) -> bool {
        self.has(video) && self.has(audio)
    }
}

/// `"video/webm;codecs=vp9,opus"` → (`"video/webm"`, `["vp9", "opus"]`)
fn split_mime(mime_type: &str) -> (&str, Vec<&str>) {
    let mut parts = mime_type.split(';');
    let container = parts.next().unwrap_or_default().trim();
    let codecs = parts
        .filter_map(|param| param.trim().strip_prefix("codecs="))
        .flat_map(|list| list.trim_matches('"').split(','))
        .map(str::trim)
        .filter(|codec| !codec.is_empty())
        .collect();
    (container, codecs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::MIME_PREFERENCES;

    const ENCODERS_OUTPUT: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC (codec h264)
 V....D libvpx               libvpx VP8 (codec vp8)
 V....D libvpx-vp9           libvpx VP9 (codec vp9)
 A....D aac                  AAC (Advanced Audio Coding)
 A....D libopus              libopus Opus (codec opus)
";

    #[test]
    fn test_parse_encoder_list() {
        let support = EncoderSupport::parse(ENCODERS_OUTPUT);
        assert_eq!(support.len(), 5);
        assert!(support.has("libvpx-vp9"));
        assert!(support.has("aac"));
        // Legend lines before the separator are not encoders
        assert!(!support.has("="));
    }

    #[test]
    fn test_split_mime() {
        assert_eq!(
            split_mime("video/webm;codecs=vp9,opus"),
            ("video/webm", vec!["vp9", "opus"])
        );
        assert_eq!(split_mime("video/mp4"), ("video/mp4", vec![]));
    }

    // -------------------------------------------------------------------------
    // Negotiation mapping
    // -------------------------------------------------------------------------

    #[test]
    fn test_full_build_prefers_vp9() {
        let support = EncoderSupport::parse(ENCODERS_OUTPUT);
        let first = MIME_PREFERENCES.iter().find(|m| support.supports(m));
        assert_eq!(first, Some(&"video/webm;codecs=vp9,opus"));

        let plan = support.plan("video/webm;codecs=vp9,opus").unwrap();
        assert_eq!(plan.container, "webm");
        assert_eq!(plan.video_codec, "libvpx-vp9");
        assert_eq!(plan.audio_codec, Some("libopus"));
    }

    #[test]
    fn test_webm_h264_never_supported() {
        let support = EncoderSupport::parse(ENCODERS_OUTPUT);
        assert!(!support.supports("video/webm;codecs=h264,opus"));
    }

    #[test]
    fn test_vp8_only_build() {
        let support = EncoderSupport::from_names(["libvpx", "libopus"]);
        assert!(!support.supports("video/webm;codecs=vp9,opus"));
        assert!(support.supports("video/webm;codecs=vp8,opus"));
        assert_eq!(
            support.plan("video/webm").unwrap().video_codec,
            "libvpx"
        );
    }

    #[test]
    fn test_plain_webm_without_opus() {
        let support = EncoderSupport::from_names(["libvpx-vp9", "libvorbis"]);
        assert!(!support.supports("video/webm;codecs=vp9,opus"));

        let plan = support.plan("video/webm").unwrap();
        assert_eq!(plan.audio_codec, Some("libvorbis"));

        let silent = EncoderSupport::from_names(["libvpx-vp9"]);
        assert_eq!(silent.plan("video/webm").unwrap().audio_codec, None);
    }

    #[test]
    fn test_mp4_is_fragmented() {
        let support = EncoderSupport::from_names(["libx264", "aac"]);
        let first = MIME_PREFERENCES.iter().find(|m| support.supports(m));
        assert_eq!(first, Some(&"video/mp4"));

        let plan = support.plan("video/mp4").unwrap();
        assert_eq!(plan.audio_codec, Some("aac"));
        assert!(plan.extra_args.contains(&"frag_keyframe+empty_moov"));
    }

    #[test]
    fn test_nothing_supported() {
        let support = EncoderSupport::from_names(["mpeg4", "mp2"]);
        assert!(MIME_PREFERENCES.iter().all(|m| !support.supports(m)));
        assert!(EncoderSupport::default().is_empty());
    }
}
