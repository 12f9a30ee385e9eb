//! Gemini (Google) text generation provider.

use crate::error::{classify_http_error, Result, SceneVisionError};
use crate::text::provider::TextProvider;
use crate::text::types::{Completion, CompletionRequest, TextProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Builder for GeminiTextProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiTextProviderBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

impl GeminiTextProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model (default `gemini-2.5-flash`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiTextProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                SceneVisionError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiTextProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Gemini text generation provider.
pub struct GeminiTextProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiTextProvider {
    /// Creates a new `GeminiTextProviderBuilder`.
    pub fn builder() -> GeminiTextProviderBuilder {
        GeminiTextProviderBuilder::new()
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GeminiTextRequest::from_completion_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error("Gemini", status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiTextResponse = response.json().await?;
        tracing::debug!(model = %self.model, "Gemini completion received");
        gemini_response.into_completion(&self.model)
    }

    fn kind(&self) -> TextProviderKind {
        TextProviderKind::Gemini
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTextRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiTextConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GeminiTextConfig {
    temperature: f32,
}

impl GeminiContent {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl GeminiTextRequest {
    fn from_completion_request(req: &CompletionRequest) -> Self {
        Self {
            system_instruction: req.system.as_deref().map(GeminiContent::text),
            contents: vec![GeminiContent::text(&req.prompt)],
            generation_config: req
                .temperature
                .map(|temperature| GeminiTextConfig { temperature }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTextResponse {
    #[serde(default)]
    candidates: Vec<GeminiTextCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTextCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiTextResponse {
    fn into_completion(self, model: &str) -> Result<Completion> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(SceneVisionError::ContentBlocked(format!(
                "Prompt blocked: {reason}"
            )));
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            SceneVisionError::EmptyResult("no candidates in Gemini response".into())
        })?;

        if matches!(
            candidate.finish_reason.as_deref(),
            Some("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST" | "RECITATION")
        ) {
            return Err(SceneVisionError::ContentBlocked(format!(
                "Content blocked by Gemini safety filter: {}",
                candidate.finish_reason.unwrap_or_default()
            )));
        }

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        Completion::new(text, TextProviderKind::Gemini, Some(model.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let provider = GeminiTextProviderBuilder::new()
            .api_key("test-key")
            .build()
            .unwrap();
        assert_eq!(provider.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_request_serialization() {
        let req = CompletionRequest::new("Refine this").with_system("You refine prompts.");
        let json = serde_json::to_value(GeminiTextRequest::from_completion_request(&req)).unwrap();

        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You refine prompts.");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Refine this");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_response_joins_text_parts() {
        let resp: GeminiTextResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "A misty "}, {"text": "harbour."}]}, "finishReason": "STOP"}]}"#,
        )
        .unwrap();
        let completion = resp.into_completion("gemini-2.5-flash").unwrap();
        assert_eq!(completion.text, "A misty harbour.");
        assert_eq!(completion.provider, TextProviderKind::Gemini);
    }

    #[test]
    fn test_safety_finish_reason() {
        let resp: GeminiTextResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(matches!(
            resp.into_completion("m"),
            Err(SceneVisionError::ContentBlocked(_))
        ));
    }

    #[test]
    fn test_empty_candidate_is_empty_result() {
        let resp: GeminiTextResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": []}}]}"#).unwrap();
        assert!(matches!(
            resp.into_completion("m"),
            Err(SceneVisionError::EmptyResult(_))
        ));
    }
}
