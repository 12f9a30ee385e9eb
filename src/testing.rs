//! Deterministic stand-ins for the hosted services.
//!
//! These implement the provider traits without touching the network, so
//! flows and the assembler can be exercised offline.

use crate::error::{Result, SceneVisionError};
use crate::image::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageProvider, ImageProviderKind,
};
use crate::scene::SceneDescription;
use crate::text::{Completion, CompletionRequest, TextProvider, TextProviderKind};
use crate::voice::{AudioDataUri, Transcriber};
use async_trait::async_trait;
use std::sync::Mutex;

fn record<T: Clone>(log: &Mutex<Vec<T>>, item: &T) {
    if let Ok(mut log) = log.lock() {
        log.push(item.clone());
    }
}

fn snapshot<T: Clone>(log: &Mutex<Vec<T>>) -> Vec<T> {
    log.lock().map(|l| l.clone()).unwrap_or_default()
}

/// Language model that answers every request with the same text, or fails.
pub struct ScriptedTextProvider {
    reply: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedTextProvider {
    /// Answers every completion with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Some(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fails every completion with a 500 API error.
    pub fn failing() -> Self {
        Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        snapshot(&self.requests)
    }
}

#[async_trait]
impl TextProvider for ScriptedTextProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        record(&self.requests, request);
        match self.reply {
            Some(ref text) => Completion::new(text.as_str(), TextProviderKind::OpenAI, None),
            None => Err(SceneVisionError::Api {
                status: 500,
                message: "scripted failure".into(),
            }),
        }
    }

    fn kind(&self) -> TextProviderKind {
        TextProviderKind::OpenAI
    }
}

/// Image provider that always returns the same URL.
pub struct StaticImageProvider {
    url: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl StaticImageProvider {
    /// Returns `url` for every request.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Like [`new`](Self::new), but hands the URL back without the
    /// empty-result guard real adapters apply. Use it to check that
    /// callers guard as well.
    pub fn unguarded(url: impl Into<String>) -> UnguardedImageProvider {
        UnguardedImageProvider(Self::new(url))
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        snapshot(&self.requests)
    }
}

#[async_trait]
impl ImageProvider for StaticImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        request.validate()?;
        record(&self.requests, request);
        GeneratedImage::new(
            self.url.clone(),
            ImageProviderKind::Gemini,
            GenerationMetadata {
                model: Some("static".into()),
                ..Default::default()
            },
        )
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Gemini
    }

    fn name(&self) -> &str {
        "static"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Image provider that returns its URL verbatim, even when empty.
pub struct UnguardedImageProvider(StaticImageProvider);

impl UnguardedImageProvider {
    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.0.requests()
    }
}

#[async_trait]
impl ImageProvider for UnguardedImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        record(&self.0.requests, request);
        Ok(GeneratedImage {
            url: self.0.url.clone(),
            caption: None,
            provider: ImageProviderKind::Gemini,
            metadata: GenerationMetadata::default(),
        })
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Gemini
    }

    fn name(&self) -> &str {
        "unguarded"
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    Upstream,
    Empty,
}

/// Image provider whose every call fails.
pub struct FailingImageProvider {
    failure: Failure,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl FailingImageProvider {
    /// Fails with a 503 API error.
    pub fn upstream() -> Self {
        Self {
            failure: Failure::Upstream,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails as if the provider answered without media.
    pub fn empty() -> Self {
        Self {
            failure: Failure::Empty,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        snapshot(&self.calls)
    }
}

#[async_trait]
impl ImageProvider for FailingImageProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage> {
        record(&self.calls, request);
        Err(match self.failure {
            Failure::Upstream => SceneVisionError::Api {
                status: 503,
                message: "model overloaded".into(),
            },
            Failure::Empty => SceneVisionError::EmptyResult("response carried no media".into()),
        })
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Gemini
    }

    fn name(&self) -> &str {
        "failing"
    }

    async fn health_check(&self) -> Result<()> {
        Err(SceneVisionError::Api {
            status: 503,
            message: "unavailable".into(),
        })
    }
}

/// Transcriber whose transcript is a pure function of the scene fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterTranscriber;

impl ParameterTranscriber {
    /// The transcript produced for `scene`.
    pub fn transcript_for(scene: &SceneDescription) -> String {
        let mut text = format!(
            "The user said create a scene at {} on {} in {} weather",
            scene.location, scene.date_time, scene.weather_condition
        );
        if !scene.atmospheric_effects.is_empty() {
            text.push_str(" with ");
            text.push_str(&scene.atmospheric_effects.join(", "));
        }
        text.push('.');
        text
    }
}

#[async_trait]
impl Transcriber for ParameterTranscriber {
    async fn transcribe(&self, audio: &AudioDataUri, scene: &SceneDescription) -> Result<String> {
        audio.decode()?;
        Ok(Self::transcript_for(scene))
    }

    fn name(&self) -> &str {
        "parameter transcriber"
    }
}

/// Transcriber that always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingTranscriber;

#[async_trait]
impl Transcriber for FailingTranscriber {
    async fn transcribe(&self, _audio: &AudioDataUri, _scene: &SceneDescription) -> Result<String> {
        Err(SceneVisionError::Transcription("speech service unavailable".into()))
    }

    fn name(&self) -> &str {
        "failing transcriber"
    }
}
