//! Voice-to-image pipeline: transcribe, compose, generate.

use crate::error::{Result, SceneVisionError};
use crate::image::{GenerationRequest, ImageProvider};
use crate::prompt::compose_voice_prompt;
use crate::scene::{is_displayable_url, validate_fields, SceneDescription};
use crate::voice::{AudioDataUri, Transcriber};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input of the voice-to-image contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInputRequest {
    /// Recorded audio as `data:<mimetype>;base64,<data>`.
    pub audio_data_uri: AudioDataUri,
    /// Location text.
    pub location: String,
    /// Combined date and time text.
    pub date_time: String,
    /// Weather label.
    pub weather_condition: String,
    /// Effect labels in selection order.
    #[serde(default)]
    pub atmospheric_effects: Vec<String>,
}

impl VoiceInputRequest {
    /// Builds a request from a scene description and recorded audio.
    pub fn new(audio_data_uri: AudioDataUri, scene: &SceneDescription) -> Self {
        Self {
            audio_data_uri,
            location: scene.location.clone(),
            date_time: scene.date_time.clone(),
            weather_condition: scene.weather_condition.clone(),
            atmospheric_effects: scene.atmospheric_effects.clone(),
        }
    }

    /// Rejects requests that would not survive the typed schema.
    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.location,
            &self.date_time,
            &self.weather_condition,
            &self.atmospheric_effects,
        )
    }

    fn scene(&self) -> SceneDescription {
        SceneDescription {
            location: self.location.clone(),
            date_time: self.date_time.clone(),
            weather_condition: self.weather_condition.clone(),
            atmospheric_effects: self.atmospheric_effects.clone(),
            custom_prompt: None,
        }
    }
}

/// Output of the voice-to-image contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInputResponse {
    /// Where the generated image can be loaded from.
    pub generated_image_url: String,
    /// What the user said.
    pub voice_input_transcript: String,
}

/// Turns recorded voice instructions into a scene image.
#[async_trait]
pub trait VoiceToImage: Send + Sync {
    /// Runs the whole pipeline. Any failing step aborts with a single error.
    async fn voice_to_image(&self, request: &VoiceInputRequest) -> Result<VoiceInputResponse>;
}

/// Three-stage pipeline over a [`Transcriber`] and an [`ImageProvider`].
///
/// Stages run strictly in order; each stage's output is the next stage's
/// input.
pub struct VoicePipeline {
    transcriber: Arc<dyn Transcriber>,
    images: Arc<dyn ImageProvider>,
}

impl VoicePipeline {
    /// Creates a pipeline from its two providers.
    pub fn new(transcriber: Arc<dyn Transcriber>, images: Arc<dyn ImageProvider>) -> Self {
        Self {
            transcriber,
            images,
        }
    }

    async fn transcribe(&self, request: &VoiceInputRequest, scene: &SceneDescription) -> Result<String> {
        let transcript = self
            .transcriber
            .transcribe(&request.audio_data_uri, scene)
            .await?;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(SceneVisionError::EmptyResult(format!(
                "{} returned an empty transcript",
                self.transcriber.name()
            )));
        }
        Ok(transcript.to_string())
    }

    async fn generate_image(&self, scene_prompt: String) -> Result<String> {
        let image = self
            .images
            .generate(&GenerationRequest::new(scene_prompt))
            .await?;
        if image.url.trim().is_empty() {
            return Err(SceneVisionError::EmptyResult(format!(
                "{} returned no media",
                self.images.name()
            )));
        }
        if !is_displayable_url(&image.url) {
            return Err(SceneVisionError::UnexpectedResponse(format!(
                "{} returned an unusable image URL",
                self.images.name()
            )));
        }
        Ok(image.url)
    }
}

#[async_trait]
impl VoiceToImage for VoicePipeline {
    async fn voice_to_image(&self, request: &VoiceInputRequest) -> Result<VoiceInputResponse> {
        request.validate()?;
        let scene = request.scene();

        tracing::info!(audio = %request.audio_data_uri, "transcribing voice input");
        let transcript = self.transcribe(request, &scene).await.inspect_err(|e| {
            tracing::warn!(stage = "transcribe", "voice pipeline aborted: {e}");
        })?;

        let scene_prompt = compose_voice_prompt(&scene, &transcript);
        tracing::debug!(prompt = %scene_prompt, "composed voice scene prompt");

        let generated_image_url = self.generate_image(scene_prompt).await.inspect_err(|e| {
            tracing::warn!(stage = "generate", "voice pipeline aborted: {e}");
        })?;

        Ok(VoiceInputResponse {
            generated_image_url,
            voice_input_transcript: transcript,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FailingImageProvider, FailingTranscriber, ParameterTranscriber, StaticImageProvider,
    };

    fn request() -> VoiceInputRequest {
        VoiceInputRequest {
            audio_data_uri: AudioDataUri::parse("data:audio/webm;base64,GkXfo59ChoEB").unwrap(),
            location: "Eiffel Tower, Paris".into(),
            date_time: "2024-05-01 18:00".into(),
            weather_condition: "Sunny".into(),
            atmospheric_effects: vec!["Golden Hour".into(), "Hazy".into()],
        }
    }

    #[tokio::test]
    async fn test_pipeline_chains_all_three_steps() {
        let images = Arc::new(StaticImageProvider::new("https://cdn.example.com/voice.png"));
        let pipeline = VoicePipeline::new(Arc::new(ParameterTranscriber), images.clone());

        let response = pipeline.voice_to_image(&request()).await.unwrap();
        assert_eq!(response.generated_image_url, "https://cdn.example.com/voice.png");
        assert!(!response.voice_input_transcript.is_empty());
        assert!(response.voice_input_transcript.contains("Eiffel Tower, Paris"));

        let sent = images.requests();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].prompt.starts_with(
            "Create a scene of Eiffel Tower, Paris on 2024-05-01 18:00 in Sunny with Golden Hour, Hazy."
        ));
        assert!(sent[0]
            .prompt
            .ends_with(&format!("Voice input details: {}", response.voice_input_transcript)));
    }

    #[tokio::test]
    async fn test_transcript_is_deterministic() {
        let pipeline = VoicePipeline::new(
            Arc::new(ParameterTranscriber),
            Arc::new(StaticImageProvider::new("https://cdn.example.com/voice.png")),
        );
        let first = pipeline.voice_to_image(&request()).await.unwrap();
        let second = pipeline.voice_to_image(&request()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_transcription_failure_skips_generation() {
        let images = Arc::new(StaticImageProvider::new("https://cdn.example.com/voice.png"));
        let pipeline = VoicePipeline::new(Arc::new(FailingTranscriber), images.clone());

        let err = pipeline.voice_to_image(&request()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::Transcription(_)));
        assert!(images.requests().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_returns_no_partial_result() {
        let pipeline = VoicePipeline::new(
            Arc::new(ParameterTranscriber),
            Arc::new(FailingImageProvider::empty()),
        );
        let err = pipeline.voice_to_image(&request()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn test_unguarded_empty_url_is_rejected() {
        let pipeline = VoicePipeline::new(
            Arc::new(ParameterTranscriber),
            Arc::new(StaticImageProvider::unguarded("")),
        );
        let err = pipeline.voice_to_image(&request()).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[tokio::test]
    async fn test_invalid_effect_rejected_before_transcription() {
        let mut bad = request();
        bad.atmospheric_effects.push("Aurora".into());
        let pipeline = VoicePipeline::new(
            Arc::new(FailingTranscriber),
            Arc::new(StaticImageProvider::new("https://cdn.example.com/voice.png")),
        );
        let err = pipeline.voice_to_image(&bad).await.unwrap_err();
        assert!(matches!(err, SceneVisionError::Validation(_)));
    }

    #[test]
    fn test_request_wire_format() {
        let parsed: VoiceInputRequest = serde_json::from_str(
            r#"{
                "audioDataUri": "data:audio/wav;base64,UklGRg==",
                "location": "Kyoto",
                "dateTime": "2024-04-02 06:00",
                "weatherCondition": "Rainy",
                "atmosphericEffects": ["Misty"]
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.audio_data_uri.mime_type(), "audio/wav");
        assert!(parsed.validate().is_ok());

        let bad = serde_json::from_str::<VoiceInputRequest>(
            r#"{"audioDataUri": "hello", "location": "Kyoto", "dateTime": "06:00", "weatherCondition": "Rainy"}"#,
        );
        assert!(bad.is_err());
    }
}
