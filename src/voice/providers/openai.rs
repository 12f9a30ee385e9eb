//! OpenAI audio transcription provider.

use crate::error::{classify_http_error, Result, SceneVisionError};
use crate::scene::SceneDescription;
use crate::voice::audio::AudioDataUri;
use crate::voice::provider::Transcriber;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "whisper-1";

/// Upload limit of the transcription endpoint (25 MiB).
const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// Builder for OpenAiTranscriber.
#[derive(Debug, Clone, Default)]
pub struct OpenAiTranscriberBuilder {
    api_key: Option<String>,
    model: Option<String>,
    language: Option<String>,
    base_url: Option<String>,
}

impl OpenAiTranscriberBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the transcription model (default `whisper-1`).
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the ISO-639-1 input language hint.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the transcriber, resolving the API key.
    pub fn build(self) -> Result<OpenAiTranscriber> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                SceneVisionError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(OpenAiTranscriber {
            client: reqwest::Client::new(),
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            language: self.language,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// Transcribes audio through OpenAI's `audio/transcriptions` endpoint.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: Option<String>,
    base_url: String,
}

impl OpenAiTranscriber {
    /// Creates a new `OpenAiTranscriberBuilder`.
    pub fn builder() -> OpenAiTranscriberBuilder {
        OpenAiTranscriberBuilder::new()
    }
}

/// Vocabulary hint built from the scene, so place names are spelled right.
fn vocabulary_hint(scene: &SceneDescription) -> String {
    let mut hint = format!("A scene at {}, {}.", scene.location, scene.weather_condition);
    if !scene.atmospheric_effects.is_empty() {
        hint.push_str(&format!(" {}.", scene.atmospheric_effects.join(", ")));
    }
    hint
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio: &AudioDataUri, scene: &SceneDescription) -> Result<String> {
        let bytes = audio.decode()?;
        if bytes.is_empty() {
            return Err(SceneVisionError::Validation("audio payload is empty".into()));
        }
        if bytes.len() > MAX_AUDIO_BYTES {
            return Err(SceneVisionError::Validation(format!(
                "audio exceeds maximum size: {} bytes (limit: {} bytes)",
                bytes.len(),
                MAX_AUDIO_BYTES
            )));
        }

        let mime = audio
            .mime_type()
            .split(';')
            .next()
            .unwrap_or("audio/webm")
            .to_string();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(format!("voice-input.{}", audio.file_extension()))
            .mime_str(&mime)
            .map_err(|e| SceneVisionError::Validation(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("prompt", vocabulary_hint(scene))
            .part("file", part);
        if let Some(ref language) = self.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(match classify_http_error("OpenAI", status.as_u16(), &text, &headers) {
                SceneVisionError::Api { status, message } => {
                    SceneVisionError::Transcription(format!("{status} - {message}"))
                }
                other => other,
            });
        }

        let transcription: TranscriptionResponse = response.json().await?;
        tracing::debug!(model = %self.model, chars = transcription.text.len(), "transcription received");
        transcription.into_text()
    }

    fn name(&self) -> &str {
        "OpenAI transcription"
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl TranscriptionResponse {
    fn into_text(self) -> Result<String> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(SceneVisionError::EmptyResult(
                "transcription contained no speech".into(),
            ));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneDescription {
        SceneDescription {
            location: "Reykjavík".into(),
            date_time: "2024-12-21 17:00".into(),
            weather_condition: "Snowy".into(),
            atmospheric_effects: vec!["Twilight".into(), "Starry Night".into()],
            custom_prompt: None,
        }
    }

    #[test]
    fn test_builder_defaults() {
        let t = OpenAiTranscriberBuilder::new()
            .api_key("sk-test")
            .language("is")
            .build()
            .unwrap();
        assert_eq!(t.model, DEFAULT_MODEL);
        assert_eq!(t.language.as_deref(), Some("is"));
        assert_eq!(t.name(), "OpenAI transcription");
    }

    #[test]
    fn test_vocabulary_hint() {
        assert_eq!(
            vocabulary_hint(&scene()),
            "A scene at Reykjavík, Snowy. Twilight, Starry Night."
        );
        let mut bare = scene();
        bare.atmospheric_effects.clear();
        assert_eq!(vocabulary_hint(&bare), "A scene at Reykjavík, Snowy.");
    }

    #[test]
    fn test_response_parsing() {
        let resp: TranscriptionResponse =
            serde_json::from_str(r#"{"text": " Show the harbour with northern lights. "}"#)
                .unwrap();
        assert_eq!(
            resp.into_text().unwrap(),
            "Show the harbour with northern lights."
        );
    }

    #[test]
    fn test_silent_audio_is_empty_result() {
        let resp: TranscriptionResponse = serde_json::from_str(r#"{"text": ""}"#).unwrap();
        assert!(matches!(
            resp.into_text(),
            Err(SceneVisionError::EmptyResult(_))
        ));
    }
}
