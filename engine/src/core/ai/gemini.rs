//! Google Gemini Transcriber
//!
//! Sends the media inline (base64) to `generateContent` with a response
//! schema and parses the returned JSON array into captions.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::prompts::{build_instruction, TRANSCRIBE_PROMPT};
use super::transcription::{
    TranscriptionOptions, TranscriptionResult, TranscriptionService,
};
use crate::core::settings::AiSettings;
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Gemini Transcriber
// =============================================================================

/// Transcription backed by the Gemini API
pub struct GeminiTranscriber {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiTranscriber {
    /// Default Gemini API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Creates a transcriber from AI settings and an API key
    pub fn new(settings: &AiSettings, api_key: String) -> CoreResult<Self> {
        if api_key.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Gemini API key cannot be empty".to_string(),
            ));
        }

        let base_url = settings
            .base_url
            .clone()
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url,
            model: settings.model.clone(),
            client,
        })
    }

    /// Creates a transcriber using the key from the environment
    pub fn from_env(settings: &AiSettings) -> CoreResult<Self> {
        let api_key = AiSettings::api_key_from_env().ok_or_else(|| {
            CoreError::ValidationError(
                "API key not found (set GEMINI_API_KEY or API_KEY)".to_string(),
            )
        })?;
        Self::new(settings, api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// =============================================================================
// Gemini API Types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Schema of one caption segment in the model's response
fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "start": { "type": "STRING" },
                "end": { "type": "STRING" },
                "text": { "type": "STRING" },
                "language": { "type": "STRING", "description": "Language code" },
                "confidence": { "type": "INTEGER", "description": "Confidence score 0-100" },
                "highlight_indices": {
                    "type": "ARRAY",
                    "items": { "type": "INTEGER" },
                    "description": "Indices of key words to emphasize"
                },
                "position": { "type": "STRING", "description": "TOP, MIDDLE or BOTTOM" },
                "sentiment": { "type": "STRING" },
                "custom_scale": { "type": "NUMBER", "description": "Font scale multiplier (1.0 = normal)" },
                "custom_position": { "type": "STRING", "description": "Suggested position (TOP/MIDDLE/BOTTOM)" },
                "word_categories": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "One category per word of 'text': neutral, emphasis, positive, negative, tech, action"
                }
            },
            "required": ["start", "end", "text", "language", "confidence"]
        }
    })
}

fn build_request(media: &[u8], mime_type: &str, options: &TranscriptionOptions) -> GenerateContentRequest {
    let data = base64::engine::general_purpose::STANDARD.encode(media);

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                Part {
                    inline_data: Some(InlineData {
                        mime_type: mime_type.to_string(),
                        data,
                    }),
                    ..Default::default()
                },
                Part {
                    text: Some(TRANSCRIBE_PROMPT.to_string()),
                    ..Default::default()
                },
            ],
        }],
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: Some(build_instruction(options)),
                ..Default::default()
            }],
        },
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

/// Extracts the first candidate's text from a successful response body
fn candidate_text(body: &str) -> CoreResult<String> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::AIRequestFailed(format!("Failed to parse response: {}", e)))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(CoreError::AIRequestFailed(format!(
            "Content blocked by Gemini safety filters: {}",
            reason
        )));
    }

    let text = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

fn api_error(status: reqwest::StatusCode, body: &str) -> CoreError {
    let detail = serde_json::from_str::<ApiError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| ApiErrorDetail {
            message: body.to_string(),
            status: None,
        });
    CoreError::AIRequestFailed(format!(
        "Gemini API error ({}; status={}): {}",
        status,
        detail.status.as_deref().unwrap_or("unknown"),
        detail.message
    ))
}

// =============================================================================
// TranscriptionService Implementation
// =============================================================================

#[async_trait]
impl TranscriptionService for GeminiTranscriber {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn transcribe(
        &self,
        media: &[u8],
        mime_type: &str,
        options: &TranscriptionOptions,
    ) -> CoreResult<TranscriptionResult> {
        info!(
            "Transcribing {} bytes ({}) with {} (language={}, auto_adjust={}, compression={})",
            media.len(),
            mime_type,
            self.model,
            options.language_mode,
            options.auto_adjust,
            options.smart_compression
        );

        let request = build_request(media, mime_type, options);

        // API key goes in a header so it never appears in logged URLs.
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::AIRequestFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::AIRequestFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let text = candidate_text(&body)?;
        debug!("Gemini returned {} characters", text.len());

        let result = TranscriptionResult::from_response_text(&text);
        info!(
            "Transcription finished: {} captions, language {}",
            result.captions.len(),
            result.language
        );
        Ok(result)
    }
}
