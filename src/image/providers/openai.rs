//! OpenAI image generation provider (dall-e-3, dall-e-2).

use crate::error::{classify_http_error, Result, SceneVisionError};
use crate::image::provider::ImageProvider;
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageProviderKind,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Preview frames are landscape.
const PREVIEW_SIZE: &str = "1792x1024";

/// OpenAI image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenAiImageModel {
    /// DALL-E 3 - high quality image generation.
    #[default]
    DallE3,
    /// DALL-E 2 - faster, lower fidelity.
    DallE2,
}

impl OpenAiImageModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DallE3 => "dall-e-3",
            Self::DallE2 => "dall-e-2",
        }
    }

    fn size(&self) -> &'static str {
        match self {
            Self::DallE3 => PREVIEW_SIZE,
            Self::DallE2 => "1024x1024",
        }
    }
}

impl std::str::FromStr for OpenAiImageModel {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dall-e-3" => Ok(Self::DallE3),
            "dall-e-2" => Ok(Self::DallE2),
            other => Err(SceneVisionError::InvalidModel(format!(
                "unknown OpenAI image model: {other}"
            ))),
        }
    }
}

/// Builder for OpenAiImageProvider.
#[derive(Debug, Clone, Default)]
pub struct OpenAiImageProviderBuilder {
    api_key: Option<String>,
    model: OpenAiImageModel,
    quality: Option<String>,
    base_url: Option<String>,
}

impl OpenAiImageProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the OpenAI image model variant.
    pub fn model(mut self, model: OpenAiImageModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the quality: "standard" or "hd" (dall-e-3 only).
    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the provider, resolving the API key.
    pub fn build(self) -> Result<OpenAiImageProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                SceneVisionError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(OpenAiImageProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            quality: self.quality,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// OpenAI image generation provider.
///
/// Single-image output only; requested modalities are ignored and the hosted
/// image URL is returned as is.
pub struct OpenAiImageProvider {
    client: reqwest::Client,
    api_key: String,
    model: OpenAiImageModel,
    quality: Option<String>,
    base_url: String,
}

impl OpenAiImageProvider {
    /// Creates a new `OpenAiImageProviderBuilder`.
    pub fn builder() -> OpenAiImageProviderBuilder {
        OpenAiImageProviderBuilder::new()
    }
}

#[async_trait]
impl ImageProvider for OpenAiImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;
        let start = Instant::now();

        let body = OpenAiImageRequest::from_generation_request(request, &self.model, &self.quality);

        let response = self
            .client
            .post(format!("{}/images/generations", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error("OpenAI", status.as_u16(), &text, &headers));
        }

        let openai_response: OpenAiImageResponse = response.json().await?;
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(model = self.model.as_str(), duration_ms, "OpenAI generation complete");

        openai_response.into_image(self.model, duration_ms)
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::OpenAI
    }

    async fn health_check(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model.as_str()))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(SceneVisionError::Auth("Invalid API key".into())),
            404 => Err(SceneVisionError::InvalidModel(format!(
                "Model {} not available for this key",
                self.model.as_str()
            ))),
            s if !(200..300).contains(&s) => Err(SceneVisionError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<String>,
}

impl OpenAiImageRequest {
    fn from_generation_request(
        req: &GenerationRequest,
        model: &OpenAiImageModel,
        quality: &Option<String>,
    ) -> Self {
        Self {
            model: model.as_str().to_string(),
            prompt: req.prompt.clone(),
            n: 1,
            size: model.size().to_string(),
            response_format: "url",
            quality: quality.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiImageResponse {
    #[serde(default)]
    data: Vec<OpenAiImageData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

impl OpenAiImageResponse {
    fn into_image(self, model: OpenAiImageModel, duration_ms: u64) -> Result<GeneratedImage> {
        let image_data = self.data.into_iter().next().ok_or_else(|| {
            SceneVisionError::EmptyResult("no images in OpenAI response".into())
        })?;

        let metadata = GenerationMetadata {
            model: Some(model.as_str().to_string()),
            duration_ms: Some(duration_ms),
            revised_prompt: image_data.revised_prompt,
        };

        match (image_data.url, image_data.b64_json) {
            (Some(url), _) if !url.trim().is_empty() => {
                GeneratedImage::new(url, ImageProviderKind::OpenAI, metadata)
            }
            (_, Some(b64)) => {
                GeneratedImage::from_inline("image/png", &b64, ImageProviderKind::OpenAI, metadata)
            }
            _ => Err(SceneVisionError::EmptyResult(
                "OpenAI response contained no image data".into(),
            )),
        }
    }
}
