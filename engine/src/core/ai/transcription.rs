//! Transcription Service
//!
//! Defines the transcription seam the studio calls, the options it is
//! called with, and the tolerant response parser shared by providers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::core::captions::{Caption, CaptionPosition, Sentiment, WordCategory};
use crate::core::{CoreError, CoreResult, TimeSec};

// =============================================================================
// Options
// =============================================================================

/// Output language policy for transcription
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LanguageMode {
    /// Detect the spoken language and keep its script
    #[default]
    Auto,
    /// Translate everything into English
    English,
    /// Telugu script only
    PureTelugu,
    /// Telugu speech romanized and mixed with English
    Telglish,
}

impl LanguageMode {
    pub const ALL: [LanguageMode; 4] = [
        LanguageMode::Auto,
        LanguageMode::English,
        LanguageMode::PureTelugu,
        LanguageMode::Telglish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageMode::Auto => "AUTO",
            LanguageMode::English => "ENGLISH",
            LanguageMode::PureTelugu => "PURE_TELUGU",
            LanguageMode::Telglish => "TELGLISH",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(&wanted))
    }
}

impl fmt::Display for LanguageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three independent configuration axes of a transcription call
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionOptions {
    /// Ask for per-segment scale and placement hints
    pub auto_adjust: bool,
    /// Ask for aggressively shortened captions
    pub smart_compression: bool,
    pub language_mode: LanguageMode,
}

/// Parsed transcription output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    pub captions: Vec<Caption>,
    /// Display name of the dominant language (e.g. "English")
    pub language: String,
}

impl TranscriptionResult {
    /// Builds a result from raw model output, deriving the dominant language
    pub fn from_response_text(text: &str) -> Self {
        let captions = parse_segments(text);
        let language = dominant_language(&captions);
        Self { captions, language }
    }
}

// =============================================================================
// Service Trait
// =============================================================================

/// A backend that turns media bytes into timed caption segments
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &str;

    async fn transcribe(
        &self,
        media: &[u8],
        mime_type: &str,
        options: &TranscriptionOptions,
    ) -> CoreResult<TranscriptionResult>;
}

// =============================================================================
// Response Parsing
// =============================================================================

/// Parses a `MM:SS.mmm` timestamp (or bare seconds) into seconds.
///
/// Anything unparsable yields 0.
pub fn parse_time(value: &str) -> TimeSec {
    let parsed = value
        .trim()
        .split(':')
        .try_fold(0.0f64, |acc, part| part.trim().parse::<f64>().map(|v| acc * 60.0 + v));

    match parsed {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => seconds,
        _ => 0.0,
    }
}

fn time_field(item: &Value, key: &str) -> TimeSec {
    match item.get(key) {
        Some(Value::String(s)) => parse_time(s),
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str)
}

fn segment_from_value(index: usize, item: &Value) -> Caption {
    let mut caption = Caption::new(
        &format!("cap-{}", index),
        time_field(item, "start"),
        time_field(item, "end"),
        str_field(item, "text").unwrap_or_default(),
    );

    if let Some(language) = str_field(item, "language").filter(|l| !l.trim().is_empty()) {
        caption.language = language.trim().to_string();
    }
    caption.confidence = item
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 100.0);
    caption.highlight_indices = item.get("highlight_indices").and_then(Value::as_array).map(|a| {
        a.iter()
            .filter_map(Value::as_u64)
            .map(|i| i as usize)
            .collect()
    });
    caption.sentiment = str_field(item, "sentiment").and_then(Sentiment::from_label);
    caption.position = str_field(item, "position")
        .and_then(CaptionPosition::from_label)
        .unwrap_or_default();
    caption.custom_scale = item
        .get("custom_scale")
        .and_then(Value::as_f64)
        .filter(|s| s.is_finite() && *s > 0.0);
    caption.custom_position = str_field(item, "custom_position").and_then(CaptionPosition::from_label);

    if let Some(categories) = item.get("word_categories").and_then(Value::as_array) {
        caption.word_colors = categories
            .iter()
            .map(|c| WordCategory::from_label(c.as_str().unwrap_or_default()).color())
            .collect();
    }

    caption
}

/// Parses the model's JSON array into captions.
///
/// Malformed or non-array output yields an empty list; ids are `cap-{i}` in
/// response order.
pub fn parse_segments(text: &str) -> Vec<Caption> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let items = match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            warn!("Transcription response is not an array (got {})", value_kind(&other));
            return Vec::new();
        }
        Err(e) => {
            warn!("Failed to parse transcription response: {}", e);
            return Vec::new();
        }
    };

    let captions: Vec<Caption> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_object())
        .map(|(i, item)| segment_from_value(i, item))
        .collect();

    debug!("Parsed {} caption segments", captions.len());
    captions
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Human-readable name for a language code; unknown codes pass through
pub fn language_display_name(code: &str) -> String {
    match code.to_ascii_lowercase().as_str() {
        "en" => "English".to_string(),
        "hi" => "Hindi".to_string(),
        "te" => "Telugu".to_string(),
        "ta" => "Tamil".to_string(),
        "hinglish" => "Hinglish".to_string(),
        "tanglish" => "Tanglish".to_string(),
        _ => code.to_string(),
    }
}

/// Majority language over segments, ties going to the first-seen code
pub fn dominant_language(captions: &[Caption]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for caption in captions {
        let code = if caption.language.is_empty() {
            "en"
        } else {
            caption.language.as_str()
        };
        match counts.iter_mut().find(|(c, _)| *c == code) {
            Some((_, n)) => *n += 1,
            None => counts.push((code, 1)),
        }
    }

    let winner = counts
        .iter()
        .fold(None::<(&str, usize)>, |best, &(code, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((code, n)),
        })
        .map(|(code, _)| code)
        .unwrap_or("en");

    language_display_name(winner)
}

/// Fails when a provider returned nothing usable
pub fn ensure_captions(result: TranscriptionResult) -> CoreResult<TranscriptionResult> {
    if result.captions.is_empty() {
        return Err(CoreError::TranscriptionFailed(
            "No captions in transcription response".to_string(),
        ));
    }
    Ok(result)
}

// =============================================================================
// Mock Service (for testing)
// =============================================================================

/// Canned transcription backend
pub struct MockTranscriber {
    response: String,
    available: bool,
}

impl MockTranscriber {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            available: true,
        }
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }
}

#[async_trait]
impl TranscriptionService for MockTranscriber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcribe(
        &self,
        _media: &[u8],
        _mime_type: &str,
        _options: &TranscriptionOptions,
    ) -> CoreResult<TranscriptionResult> {
        if !self.available {
            return Err(CoreError::AIRequestFailed("Provider not available".to_string()));
        }
        Ok(TranscriptionResult::from_response_text(&self.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Color;

    // -------------------------------------------------------------------------
    // parse_time
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_time_formats() {
        assert!((parse_time("00:01.500") - 1.5).abs() < 1e-9);
        assert!((parse_time("02:03.250") - 123.25).abs() < 1e-9);
        assert!((parse_time("4.75") - 4.75).abs() < 1e-9);
        assert!((parse_time("01:00:00") - 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_time_garbage_is_zero() {
        assert_eq!(parse_time(""), 0.0);
        assert_eq!(parse_time("soon"), 0.0);
        assert_eq!(parse_time("00:xx"), 0.0);
        assert_eq!(parse_time("-3"), 0.0);
    }

    // -------------------------------------------------------------------------
    // parse_segments
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_segments_maps_fields() {
        let json = r#"[
            {"start": "00:00.000", "end": "00:01.200", "text": "Stop wasting money",
             "language": "en", "confidence": 93, "highlight_indices": [2],
             "position": "MIDDLE", "sentiment": "energetic", "custom_scale": 1.5,
             "custom_position": "TOP",
             "word_categories": ["negative", "action", "emphasis"]},
            {"start": "00:01.200", "end": "00:02.000", "text": "ok", "language": "en",
             "confidence": 80}
        ]"#;

        let captions = parse_segments(json);
        assert_eq!(captions.len(), 2);

        let first = &captions[0];
        assert_eq!(first.id, "cap-0");
        assert!((first.end_time - 1.2).abs() < 1e-9);
        assert_eq!(first.confidence, 93.0);
        assert_eq!(first.highlight_indices, Some(vec![2]));
        assert_eq!(first.position, CaptionPosition::Middle);
        assert_eq!(first.sentiment, Some(Sentiment::Energetic));
        assert_eq!(first.custom_scale, Some(1.5));
        assert_eq!(first.custom_position, Some(CaptionPosition::Top));
        assert_eq!(
            first.word_colors,
            vec![Color::hex(0xEF4444), Color::hex(0xFB923C), Color::hex(0xFACC15)]
        );

        let second = &captions[1];
        assert_eq!(second.id, "cap-1");
        assert_eq!(second.position, CaptionPosition::Bottom);
        assert!(second.custom_scale.is_none());
        assert!(second.word_colors.is_empty());
    }

    #[test]
    fn test_parse_segments_unknown_category_is_neutral() {
        let json = r#"[{"start":"00:00.0","end":"00:01.0","text":"a b",
            "language":"en","confidence":50,"word_categories":["mystery", 7]}]"#;
        let captions = parse_segments(json);
        assert_eq!(captions[0].word_colors, vec![Color::WHITE, Color::WHITE]);
    }

    #[test]
    fn test_parse_segments_tolerates_malformed_output() {
        assert!(parse_segments("").is_empty());
        assert!(parse_segments("Sorry, I can't help with that").is_empty());
        assert!(parse_segments("{\"start\": 1}").is_empty());
        assert!(parse_segments("[1, 2, 3]").is_empty());
    }

    #[test]
    fn test_parse_segments_strips_code_fence() {
        let text = "```json\n[{\"start\":\"00:00.0\",\"end\":\"00:01.0\",\"text\":\"hi\",\"language\":\"te\",\"confidence\":10}]\n```";
        let captions = parse_segments(text);
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].language, "te");
    }

    #[test]
    fn test_parse_segments_missing_language_defaults_to_en() {
        let captions = parse_segments(r#"[{"start":"00:00.0","end":"00:01.0","text":"hi"}]"#);
        assert_eq!(captions[0].language, "en");
        assert_eq!(captions[0].confidence, 0.0);
    }

    // -------------------------------------------------------------------------
    // dominant_language
    // -------------------------------------------------------------------------

    fn with_language(code: &str) -> Caption {
        let mut c = Caption::new("c", 0.0, 1.0, "x");
        c.language = code.to_string();
        c
    }

    #[test]
    fn test_dominant_language_majority() {
        let captions = vec![with_language("te"), with_language("en"), with_language("te")];
        assert_eq!(dominant_language(&captions), "Telugu");
    }

    #[test]
    fn test_dominant_language_tie_goes_to_first_seen() {
        let captions = vec![with_language("hi"), with_language("ta")];
        assert_eq!(dominant_language(&captions), "Hindi");

        let captions = vec![with_language("ta"), with_language("hi")];
        assert_eq!(dominant_language(&captions), "Tamil");
    }

    #[test]
    fn test_dominant_language_passthrough_and_empty() {
        assert_eq!(dominant_language(&[]), "English");
        assert_eq!(dominant_language(&[with_language("fr")]), "fr");
        assert_eq!(dominant_language(&[with_language("Hinglish")]), "Hinglish");
    }

    #[test]
    fn test_language_mode_labels() {
        assert_eq!(LanguageMode::from_label("pure-telugu"), Some(LanguageMode::PureTelugu));
        assert_eq!(LanguageMode::from_label("ENGLISH"), Some(LanguageMode::English));
        assert_eq!(LanguageMode::from_label("klingon"), None);
        assert_eq!(
            serde_json::to_string(&LanguageMode::Telglish).unwrap(),
            "\"TELGLISH\""
        );
    }

    // -------------------------------------------------------------------------
    // MockTranscriber
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_mock_transcriber() {
        let mock = MockTranscriber::new(
            r#"[{"start":"00:00.0","end":"00:02.0","text":"Hello world","language":"en","confidence":90}]"#,
        );
        let result = mock
            .transcribe(b"video", "video/mp4", &TranscriptionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.captions.len(), 1);
        assert_eq!(result.language, "English");

        let offline = MockTranscriber::new("[]").with_available(false);
        let err = offline
            .transcribe(b"video", "video/mp4", &TranscriptionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AIRequestFailed(_)));
    }

    #[test]
    fn test_ensure_captions_rejects_empty() {
        let empty = TranscriptionResult::from_response_text("not json");
        assert!(matches!(
            ensure_captions(empty),
            Err(CoreError::TranscriptionFailed(_))
        ));
    }
}
