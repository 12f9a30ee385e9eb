//! Core types for image generation.

use crate::error::{Result, SceneVisionError};
use crate::scene::is_displayable_url;
use serde::{Deserialize, Serialize};

/// Image provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// Google Gemini multimodal models (text + image output).
    #[default]
    Gemini,
    /// OpenAI image models (DALL-E).
    OpenAI,
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ImageProviderKind {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => Err(SceneVisionError::ProviderNotAvailable(format!(
                "unknown image provider: {other}"
            ))),
        }
    }
}

/// Output modality requested from a multimodal model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    /// Accompanying text.
    Text,
    /// The image itself.
    Image,
}

impl ResponseModality {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
    /// Prompt as rewritten by the provider, if it reports one.
    pub revised_prompt: Option<String>,
}

/// A request to generate an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// Requested output modalities. Providers without modality control ignore this.
    pub modalities: Vec<ResponseModality>,
    /// Seed for deterministic generation.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    /// Creates a new request asking for both text and image output.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            modalities: vec![ResponseModality::Text, ResponseModality::Image],
            seed: None,
        }
    }

    /// Sets the seed for deterministic generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replaces the requested modalities.
    pub fn with_modalities(mut self, modalities: Vec<ResponseModality>) -> Self {
        self.modalities = modalities;
        self
    }

    /// Rejects requests that should never reach a provider.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(SceneVisionError::Validation("prompt is empty".into()));
        }
        if !self.modalities.contains(&ResponseModality::Image) {
            return Err(SceneVisionError::Validation(
                "IMAGE must be among the requested modalities".into(),
            ));
        }
        Ok(())
    }
}

/// A generated image, addressed by URL.
#[derive(Debug, Clone)]
#[must_use = "generated image should be displayed or stored"]
pub struct GeneratedImage {
    /// Location of the image: an `https://` URL or a `data:` URI.
    pub url: String,
    /// Text the model returned alongside the image.
    pub caption: Option<String>,
    /// Provider that generated this image.
    pub provider: ImageProviderKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a generated image, refusing empty or malformed URLs.
    pub fn new(
        url: impl Into<String>,
        provider: ImageProviderKind,
        metadata: GenerationMetadata,
    ) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SceneVisionError::EmptyResult(format!(
                "{provider} returned an empty image URL"
            )));
        }
        if !is_displayable_url(&url) {
            return Err(SceneVisionError::UnexpectedResponse(format!(
                "{provider} returned an unusable image URL"
            )));
        }
        Ok(Self {
            url,
            caption: None,
            provider,
            metadata,
        })
    }

    /// Creates a generated image from inline base64 bytes, as a `data:` URI.
    pub fn from_inline(
        mime_type: &str,
        base64_data: &str,
        provider: ImageProviderKind,
        metadata: GenerationMetadata,
    ) -> Result<Self> {
        if base64_data.trim().is_empty() {
            return Err(SceneVisionError::EmptyResult(format!(
                "{provider} returned an empty image payload"
            )));
        }
        let mime_type = if mime_type.starts_with("image/") {
            mime_type
        } else {
            "image/png"
        };
        Self::new(
            format!("data:{mime_type};base64,{}", base64_data.trim()),
            provider,
            metadata,
        )
    }

    /// Attaches the model's accompanying text.
    pub fn with_caption(mut self, caption: Option<String>) -> Self {
        self.caption = caption.filter(|c| !c.trim().is_empty());
        self
    }

    /// Returns true when the image is embedded rather than hosted.
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_text_and_image() {
        let req = GenerationRequest::new("A lighthouse");
        assert_eq!(
            req.modalities,
            vec![ResponseModality::Text, ResponseModality::Image]
        );
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new("  ").validate().is_err());
        let text_only =
            GenerationRequest::new("A lighthouse").with_modalities(vec![ResponseModality::Text]);
        assert!(text_only.validate().is_err());
    }

    #[test]
    fn test_empty_url_is_empty_result() {
        let err = GeneratedImage::new("", ImageProviderKind::OpenAI, Default::default())
            .unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[test]
    fn test_from_inline_builds_data_uri() {
        let image = GeneratedImage::from_inline(
            "image/jpeg",
            "/9j/4AAQ",
            ImageProviderKind::Gemini,
            Default::default(),
        )
        .unwrap();
        assert_eq!(image.url, "data:image/jpeg;base64,/9j/4AAQ");
        assert!(image.is_inline());
    }

    #[test]
    fn test_from_inline_empty_payload() {
        let err = GeneratedImage::from_inline(
            "image/png",
            "",
            ImageProviderKind::Gemini,
            Default::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[test]
    fn test_caption_ignores_blank_text() {
        let image = GeneratedImage::new(
            "https://cdn.example.com/x.png",
            ImageProviderKind::OpenAI,
            Default::default(),
        )
        .unwrap()
        .with_caption(Some(" ".into()));
        assert!(image.caption.is_none());
    }

    #[test]
    fn test_provider_kind_display_and_parse() {
        assert_eq!(ImageProviderKind::Gemini.to_string(), "gemini");
        assert_eq!(ImageProviderKind::OpenAI.to_string(), "openai");
        assert_eq!(
            "OpenAI".parse::<ImageProviderKind>().unwrap(),
            ImageProviderKind::OpenAI
        );
        assert!("flux".parse::<ImageProviderKind>().is_err());
    }

    #[test]
    fn test_modality_wire_names() {
        assert_eq!(ResponseModality::Image.as_str(), "IMAGE");
        assert_eq!(
            serde_json::to_string(&ResponseModality::Text).unwrap(),
            "\"TEXT\""
        );
    }
}
