//! Gemini (Google) multimodal image generation provider.

use crate::error::{classify_http_error, Result, SceneVisionError};
use crate::image::provider::ImageProvider;
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageProviderKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiImageModel {
    /// Gemini 2.5 Flash Image.
    #[default]
    FlashImage,
    /// Gemini 2.0 Flash image generation preview.
    FlashPreviewImageGeneration,
}

impl GeminiImageModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::FlashPreviewImageGeneration => "gemini-2.0-flash-preview-image-generation",
        }
    }
}

impl std::str::FromStr for GeminiImageModel {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gemini-2.5-flash-image" => Ok(Self::FlashImage),
            "gemini-2.0-flash-preview-image-generation" => Ok(Self::FlashPreviewImageGeneration),
            other => Err(SceneVisionError::InvalidModel(format!(
                "unknown Gemini image model: {other}"
            ))),
        }
    }
}

/// Builder for GeminiImageProvider.
#[derive(Debug, Clone, Default)]
pub struct GeminiImageProviderBuilder {
    api_key: Option<String>,
    model: GeminiImageModel,
    base_url: Option<String>,
}

impl GeminiImageProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiImageModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API base URL (proxies, regional endpoints).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<GeminiImageProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .ok_or_else(|| {
                SceneVisionError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        Ok(GeminiImageProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Gemini image generation provider.
///
/// Requests text and image output in one call; the inline image is returned
/// as a `data:` URI and any accompanying text as the caption.
pub struct GeminiImageProvider {
    client: reqwest::Client,
    api_key: String,
    model: GeminiImageModel,
    base_url: String,
}

impl GeminiImageProvider {
    /// Creates a new `GeminiImageProviderBuilder`.
    pub fn builder() -> GeminiImageProviderBuilder {
        GeminiImageProviderBuilder::new()
    }

    async fn generate_impl(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str(),
        );

        let body = GeminiRequest::from_generation_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error("Gemini", status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(model = self.model.as_str(), duration_ms, "Gemini generation complete");

        gemini_response.into_image(GenerationMetadata {
            model: Some(self.model.as_str().to_string()),
            duration_ms: Some(duration_ms),
            revised_prompt: None,
        })
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        self.generate_impl(request).await
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Gemini
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(SceneVisionError::Auth("Invalid API key".into())),
            404 => Err(SceneVisionError::InvalidModel(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(SceneVisionError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiTextPart>,
}

#[derive(Debug, Serialize)]
struct GeminiTextPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

impl GeminiRequest {
    fn from_generation_request(req: &GenerationRequest) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiTextPart {
                    text: req.prompt.clone(),
                }],
            }],
            generation_config: GeminiConfig {
                response_modalities: req
                    .modalities
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
                seed: req.seed,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    data: String,
}

impl GeminiResponse {
    fn into_image(self, metadata: GenerationMetadata) -> Result<GeneratedImage> {
        // Blocks arrive as HTTP 200 with prompt feedback
        if let Some(feedback) = self.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("Prompt blocked: {reason}"));
                return Err(SceneVisionError::ContentBlocked(msg));
            }
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            SceneVisionError::EmptyResult("no candidates in Gemini response".into())
        })?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(SceneVisionError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {finish_reason}"
                    )));
                }
                "IMAGE_OTHER" | "NO_IMAGE" => {
                    return Err(SceneVisionError::EmptyResult(format!(
                        "Gemini produced no image ({finish_reason}). Try a different prompt."
                    )));
                }
                _ => {} // STOP, MAX_TOKENS, etc. are normal
            }
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();

        let caption: String = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        let inline = parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or_else(|| {
                SceneVisionError::EmptyResult("no image data in Gemini response".into())
            })?;

        Ok(GeneratedImage::from_inline(
            &inline.mime_type,
            &inline.data,
            ImageProviderKind::Gemini,
            metadata,
        )?
        .with_caption(Some(caption)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ResponseModality;

    fn parse(json: &str) -> Result<GeneratedImage> {
        let resp: GeminiResponse = serde_json::from_str(json).unwrap();
        resp.into_image(GenerationMetadata::default())
    }

    #[test]
    fn test_model_as_str_and_parse() {
        assert_eq!(GeminiImageModel::FlashImage.as_str(), "gemini-2.5-flash-image");
        assert_eq!(
            "gemini-2.0-flash-preview-image-generation"
                .parse::<GeminiImageModel>()
                .unwrap(),
            GeminiImageModel::FlashPreviewImageGeneration
        );
        assert!("dall-e-3".parse::<GeminiImageModel>().is_err());
    }

    #[test]
    fn test_builder_with_explicit_key() {
        let provider = GeminiImageProviderBuilder::new()
            .api_key("test-key")
            .model(GeminiImageModel::FlashPreviewImageGeneration)
            .build();
        assert!(provider.is_ok());
    }

    #[test]
    fn test_request_asks_for_text_and_image() {
        let req = GenerationRequest::new("A harbour at dusk");
        let gemini_req = GeminiRequest::from_generation_request(&req);

        assert_eq!(gemini_req.contents.len(), 1);
        assert_eq!(gemini_req.contents[0].parts.len(), 1);
        assert_eq!(
            gemini_req.generation_config.response_modalities,
            vec!["TEXT", "IMAGE"]
        );
        assert!(gemini_req.generation_config.seed.is_none());
    }

    #[test]
    fn test_request_serialization_uses_camel_case() {
        let req = GenerationRequest::new("A harbour")
            .with_seed(1)
            .with_modalities(vec![ResponseModality::Image]);
        let json = serde_json::to_value(GeminiRequest::from_generation_request(&req)).unwrap();

        assert_eq!(json["generationConfig"]["responseModalities"][0], "IMAGE");
        assert_eq!(json["generationConfig"]["seed"], 1);
        assert!(json.get("generation_config").is_none());
    }

    #[test]
    fn test_response_with_text_and_image() {
        let image = parse(
            r#"{
                "candidates": [{
                    "content": {
                        "parts": [
                            {"text": "Here is your scene."},
                            {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}
                        ]
                    },
                    "finishReason": "STOP"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(image.url, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.caption.as_deref(), Some("Here is your scene."));
        assert_eq!(image.provider, ImageProviderKind::Gemini);
    }

    #[test]
    fn test_text_only_response_is_empty_result() {
        let err = parse(
            r#"{"candidates": [{"content": {"parts": [{"text": "I cannot draw that."}]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[test]
    fn test_empty_inline_payload_is_empty_result() {
        let err = parse(
            r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": ""}}]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[test]
    fn test_no_candidates_is_empty_result() {
        let err = parse(r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[test]
    fn test_prompt_feedback_block() {
        let err = parse(
            r#"{
                "candidates": [],
                "promptFeedback": {
                    "blockReason": "SAFETY",
                    "blockReasonMessage": "Prompt was blocked due to safety"
                }
            }"#,
        )
        .unwrap_err();
        match err {
            SceneVisionError::ContentBlocked(msg) => {
                assert_eq!(msg, "Prompt was blocked due to safety")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_safety_finish_reason() {
        let err = parse(r#"{"candidates": [{"finishReason": "IMAGE_SAFETY"}]}"#).unwrap_err();
        assert!(matches!(err, SceneVisionError::ContentBlocked(_)));
    }

    #[test]
    fn test_no_image_finish_reason() {
        let err = parse(r#"{"candidates": [{"finishReason": "NO_IMAGE"}]}"#).unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }
}
