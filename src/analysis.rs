//! AI analysis provider abstraction and implementations.
//!
//! Defines the [`AnalysisProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when analysis is not configured.
//! - **[`GeminiProvider`]** — calls the Gemini `generateContent` API with a
//!   structured response schema, retry, and backoff.
//!
//! Every analysis produces an [`AnalysisResult`]: a short summary, an
//! ordered tag list, and a single-word category. An analysis failure aborts
//! the ingest — no row and no blob are left behind.
//!
//! # Retry Strategy
//!
//! The Gemini provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::time::Duration;

use crate::config::AnalysisConfig;
use crate::error::{ClipError, Result};
use crate::models::AnalysisResult;

/// Analysis stops reading text input past this many characters.
const MAX_TEXT_CHARS: usize = 10_000;

/// Trait for AI analysis providers.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Provider identifier for display and logging.
    fn provider_name(&self) -> &'static str;

    /// Summarize, tag, and categorize an image.
    async fn analyze_image(&self, bytes: &[u8], mime_type: &str) -> Result<AnalysisResult>;

    /// Summarize, tag, and categorize extracted text.
    async fn analyze_text(&self, text: &str) -> Result<AnalysisResult>;
}

// ============ Disabled Provider ============

/// A no-op provider that always returns errors.
///
/// Used when `analysis.provider = "disabled"` in the configuration.
pub struct DisabledProvider;

#[async_trait]
impl AnalysisProvider for DisabledProvider {
    fn provider_name(&self) -> &'static str {
        "disabled"
    }

    async fn analyze_image(&self, _bytes: &[u8], _mime_type: &str) -> Result<AnalysisResult> {
        Err(ClipError::Analysis("analysis provider is disabled".into()))
    }

    async fn analyze_text(&self, _text: &str) -> Result<AnalysisResult> {
        Err(ClipError::Analysis("analysis provider is disabled".into()))
    }
}

// ============ Gemini Provider ============

/// Analysis provider backed by the Gemini `generateContent` API.
///
/// Requires the `GEMINI_API_KEY` environment variable. The response is
/// constrained to a JSON object with `summary`, `tags`, and `category`
/// via the API's response schema, then parsed into [`AnalysisResult`].
pub struct GeminiProvider {
    config: AnalysisConfig,
    api_key: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `GEMINI_API_KEY` is not in the environment.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ClipError::Analysis("GEMINI_API_KEY environment variable not set".into()))?;
        Ok(Self {
            config: config.clone(),
            api_key,
        })
    }

    async fn generate(&self, model: &str, contents: serde_json::Value) -> Result<AnalysisResult> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| ClipError::Analysis(e.to_string()))?;

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );

        let body = serde_json::json!({
            "contents": [contents],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| ClipError::Analysis(e.to_string()))?;
                        return parse_generate_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(ClipError::Analysis(format!(
                            "Gemini API error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(ClipError::Analysis(format!(
                        "Gemini API error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(ClipError::Analysis(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| ClipError::Analysis("analysis failed after retries".into())))
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze_image(&self, bytes: &[u8], mime_type: &str) -> Result<AnalysisResult> {
        let contents = serde_json::json!({
            "parts": [
                { "text": "Analyze this image and provide a summary, tags, and a category in JSON format." },
                { "inlineData": { "data": BASE64.encode(bytes), "mimeType": mime_type } },
            ],
        });
        self.generate(&self.config.image_model, contents).await
    }

    async fn analyze_text(&self, text: &str) -> Result<AnalysisResult> {
        let excerpt: String = text.chars().take(MAX_TEXT_CHARS).collect();
        let contents = serde_json::json!({
            "parts": [
                { "text": format!(
                    "Analyze this text and provide a summary, tags, and a category in JSON format:\n\n{}",
                    excerpt
                ) },
            ],
        });
        self.generate(&self.config.text_model, contents).await
    }
}

/// Response schema forcing `{summary, tags[], category}` output.
fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A brief description or summary (2-3 sentences)",
            },
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Relevant keywords (5-7 tags)",
            },
            "category": {
                "type": "STRING",
                "description": "A single word category (e.g., nature, tech, document, etc.)",
            },
        },
        "required": ["summary", "tags", "category"],
    })
}

/// Extract the first candidate's text part and parse it as an
/// [`AnalysisResult`].
fn parse_generate_response(json: &serde_json::Value) -> Result<AnalysisResult> {
    let text = json
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| ClipError::Analysis("Gemini response has no candidate text".into()))?;

    serde_json::from_str(text)
        .map_err(|e| ClipError::Analysis(format!("Gemini response is not valid analysis JSON: {}", e)))
}

/// Create the appropriate [`AnalysisProvider`] based on configuration.
pub fn create_provider(config: &AnalysisConfig) -> Result<Box<dyn AnalysisProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "gemini" => Ok(Box::new(GeminiProvider::new(config)?)),
        other => Err(ClipError::Analysis(format!(
            "unknown analysis provider: {}",
            other
        ))),
    }
}
