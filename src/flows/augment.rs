//! Prompt augmentation through a hosted language model.

use crate::error::Result;
use crate::prompt::{compose_augmentation_prompt, AUGMENTATION_SYSTEM_PROMPT};
use crate::scene::SceneDescription;
use crate::text::{CompletionRequest, TextProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result of prompt augmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AugmentResponse {
    /// The final prompt to use for scene generation.
    pub augmented_prompt: String,
}

/// Rewrites a scene description into a richer image prompt.
///
/// One round trip, no retry. Failures propagate; deciding whether to fall
/// back to the baseline prompt is the caller's job.
#[async_trait]
pub trait PromptAugmenter: Send + Sync {
    /// Augments the scene with its custom instructions.
    async fn augment(&self, scene: &SceneDescription) -> Result<AugmentResponse>;
}

/// Augmenter backed by any [`TextProvider`].
pub struct LanguageModelAugmenter {
    model: Arc<dyn TextProvider>,
    temperature: Option<f32>,
}

impl LanguageModelAugmenter {
    /// Creates an augmenter over the given language model.
    pub fn new(model: Arc<dyn TextProvider>) -> Self {
        Self {
            model,
            temperature: None,
        }
    }

    /// Sets the sampling temperature passed to the model.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    fn completion_request(&self, scene: &SceneDescription) -> CompletionRequest {
        let request = CompletionRequest::new(compose_augmentation_prompt(scene))
            .with_system(AUGMENTATION_SYSTEM_PROMPT);
        match self.temperature {
            Some(t) => request.with_temperature(t),
            None => request,
        }
    }
}

#[async_trait]
impl PromptAugmenter for LanguageModelAugmenter {
    async fn augment(&self, scene: &SceneDescription) -> Result<AugmentResponse> {
        scene.validate()?;

        let completion = self.model.complete(&self.completion_request(scene)).await?;
        tracing::info!(
            provider = %completion.provider,
            chars = completion.text.len(),
            "prompt augmented"
        );

        Ok(AugmentResponse {
            augmented_prompt: completion.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneVisionError;
    use crate::testing::ScriptedTextProvider;

    fn scene() -> SceneDescription {
        SceneDescription {
            location: "Eiffel Tower, Paris".into(),
            date_time: "2024-05-01 18:00".into(),
            weather_condition: "Sunny".into(),
            atmospheric_effects: vec!["Golden Hour".into()],
            custom_prompt: Some("Impressionist style".into()),
        }
    }

    #[tokio::test]
    async fn test_augment_returns_model_text() {
        let model = Arc::new(ScriptedTextProvider::replying(
            "An impressionist painting-like view of the Eiffel Tower at golden hour.",
        ));
        let augmenter = LanguageModelAugmenter::new(model.clone()).with_temperature(0.4);

        let response = augmenter.augment(&scene()).await.unwrap();
        assert_eq!(
            response.augmented_prompt,
            "An impressionist painting-like view of the Eiffel Tower at golden hour."
        );

        let sent = model.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].system.as_deref(), Some(AUGMENTATION_SYSTEM_PROMPT));
        assert!(sent[0].prompt.contains("Custom Instructions: Impressionist style"));
        assert_eq!(sent[0].temperature, Some(0.4));
    }

    #[tokio::test]
    async fn test_augment_propagates_upstream_error() {
        let augmenter = LanguageModelAugmenter::new(Arc::new(ScriptedTextProvider::failing()));
        let err = augmenter.augment(&scene()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::Api { .. }));
    }

    #[tokio::test]
    async fn test_augment_blank_output_is_empty_result() {
        let augmenter = LanguageModelAugmenter::new(Arc::new(ScriptedTextProvider::replying("  ")));
        let err = augmenter.augment(&scene()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn test_augment_validates_before_calling_model() {
        let model = Arc::new(ScriptedTextProvider::replying("unused"));
        let augmenter = LanguageModelAugmenter::new(model.clone());
        let mut bad = scene();
        bad.weather_condition = "Windy".into();

        let err = augmenter.augment(&bad).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::Validation(_)));
        assert!(model.requests().is_empty());
    }

    #[test]
    fn test_response_wire_format() {
        let json = serde_json::to_value(AugmentResponse {
            augmented_prompt: "p".into(),
        })
        .unwrap();
        assert_eq!(json["augmentedPrompt"], "p");
    }
}
