//! Scene preview generation: final prompt in, image URL out.

use crate::error::{Result, SceneVisionError};
use crate::image::{GenerationRequest, ImageProvider};
use crate::prompt::compose_preview_prompt;
use crate::scene::{is_displayable_url, validate_fields};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input of the scene preview contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePreviewRequest {
    /// Location text.
    pub location: String,
    /// Combined date and time text.
    pub date_time: String,
    /// Weather label.
    pub weather_condition: String,
    /// Composed or augmented prompt carrying the scene details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    /// Voice instructions, when the request came from audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_input_transcript: Option<String>,
}

impl ScenePreviewRequest {
    /// Rejects requests that would not survive the typed schema.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.location, &self.date_time, &self.weather_condition, &[])
    }
}

/// Output of the scene preview contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePreviewResponse {
    /// Where the generated preview can be loaded from.
    pub generated_preview_url: String,
}

/// Generates a scene preview image.
#[async_trait]
pub trait ScenePreviewGenerator: Send + Sync {
    /// Generates a preview. Never succeeds with an empty URL.
    async fn generate_preview(&self, request: &ScenePreviewRequest)
        -> Result<ScenePreviewResponse>;
}

/// Preview generator that embeds the scene fields into a photorealistic
/// prompt and sends it to an [`ImageProvider`].
pub struct ImagePreviewGenerator {
    provider: Arc<dyn ImageProvider>,
    seed: Option<u64>,
}

impl ImagePreviewGenerator {
    /// Creates a generator over the given image provider.
    pub fn new(provider: Arc<dyn ImageProvider>) -> Self {
        Self {
            provider,
            seed: None,
        }
    }

    /// Fixes the generation seed, where the provider supports one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[async_trait]
impl ScenePreviewGenerator for ImagePreviewGenerator {
    async fn generate_preview(
        &self,
        request: &ScenePreviewRequest,
    ) -> Result<ScenePreviewResponse> {
        request.validate()?;

        let mut generation = GenerationRequest::new(compose_preview_prompt(request));
        if let Some(seed) = self.seed {
            generation = generation.with_seed(seed);
        }

        tracing::info!(
            provider = self.provider.name(),
            location = %request.location,
            "generating scene preview"
        );
        let image = self.provider.generate(&generation).await?;

        if image.url.trim().is_empty() {
            return Err(SceneVisionError::EmptyResult(format!(
                "{} returned no media",
                self.provider.name()
            )));
        }
        if !is_displayable_url(&image.url) {
            return Err(SceneVisionError::UnexpectedResponse(format!(
                "{} returned an unusable preview URL",
                self.provider.name()
            )));
        }

        Ok(ScenePreviewResponse {
            generated_preview_url: image.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingImageProvider, StaticImageProvider};

    fn request() -> ScenePreviewRequest {
        ScenePreviewRequest {
            location: "Eiffel Tower, Paris".into(),
            date_time: "2024-05-01 18:00".into(),
            weather_condition: "Sunny".into(),
            custom_prompt: Some("Effects: Golden Hour.".into()),
            voice_input_transcript: None,
        }
    }

    #[tokio::test]
    async fn test_preview_returns_provider_url() {
        let provider = Arc::new(StaticImageProvider::new("https://cdn.example.com/eiffel.png"));
        let generator = ImagePreviewGenerator::new(provider.clone()).with_seed(7);

        let response = generator.generate_preview(&request()).await.unwrap();
        assert_eq!(response.generated_preview_url, "https://cdn.example.com/eiffel.png");

        let sent = provider.requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].prompt.starts_with("Photorealistic scene. Location: Eiffel Tower, Paris."));
        assert!(sent[0].prompt.contains("Details: Effects: Golden Hour."));
        assert_eq!(sent[0].seed, Some(7));
    }

    #[tokio::test]
    async fn test_preview_rejects_empty_media() {
        let generator = ImagePreviewGenerator::new(Arc::new(StaticImageProvider::unguarded("")));
        let err = generator.generate_preview(&request()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn test_preview_propagates_upstream_error() {
        let generator = ImagePreviewGenerator::new(Arc::new(FailingImageProvider::upstream()));
        let err = generator.generate_preview(&request()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_preview_validates_weather() {
        let provider = Arc::new(StaticImageProvider::new("https://cdn.example.com/x.png"));
        let generator = ImagePreviewGenerator::new(provider.clone());
        let mut bad = request();
        bad.weather_condition = "Blizzard".into();

        let err = generator.generate_preview(&bad).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::Validation(_)));
        assert!(provider.requests().is_empty());
    }

    #[test]
    fn test_request_wire_format() {
        let json: ScenePreviewRequest = serde_json::from_str(
            r#"{"location": "Oslo", "dateTime": "08:00", "weatherCondition": "Snowy"}"#,
        )
        .unwrap();
        assert_eq!(json.custom_prompt, None);
        assert!(json.validate().is_ok());

        let out = serde_json::to_value(ScenePreviewResponse {
            generated_preview_url: "https://x.example/p.png".into(),
        })
        .unwrap();
        assert_eq!(out["generatedPreviewUrl"], "https://x.example/p.png");
    }
}
