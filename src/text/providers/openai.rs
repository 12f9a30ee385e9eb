//! OpenAI chat completions provider.

use crate::error::{classify_http_error, Result, SceneVisionError};
use crate::text::provider::TextProvider;
use crate::text::types::{Completion, CompletionRequest, TextProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Builder for OpenAiTextProvider.
#[derive(Debug, Clone, Default)]
pub struct OpenAiTextProviderBuilder {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

impl OpenAiTextProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the chat model (default `gpt-4o-mini`).
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
    pub fn build(self) -> Result<OpenAiTextProvider> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                SceneVisionError::Auth("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(OpenAiTextProvider {
            client: reqwest::Client::new(),
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

/// OpenAI chat completions provider.
pub struct OpenAiTextProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiTextProvider {
    /// Creates a new `OpenAiTextProviderBuilder`.
    pub fn builder() -> OpenAiTextProviderBuilder {
        OpenAiTextProviderBuilder::new()
    }
}

#[async_trait]
impl TextProvider for OpenAiTextProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = ChatRequest::new(&self.model, request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_http_error("OpenAI", status.as_u16(), &text, &headers));
        }

        let chat: ChatResponse = response.json().await?;
        tracing::debug!(model = %self.model, "OpenAI completion received");
        chat.into_completion()
    }

    fn kind(&self) -> TextProviderKind {
        TextProviderKind::OpenAI
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

impl ChatRequest {
    fn new(model: &str, request: &CompletionRequest) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });
        Self {
            model: model.to_string(),
            messages,
            temperature: request.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl ChatResponse {
    fn into_completion(self) -> Result<Completion> {
        let choice = self.choices.into_iter().next().ok_or_else(|| {
            SceneVisionError::EmptyResult("no choices in OpenAI response".into())
        })?;

        if let Some(refusal) = choice.message.refusal {
            return Err(SceneVisionError::ContentBlocked(refusal));
        }
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(SceneVisionError::ContentBlocked(
                "completion stopped by content filter".into(),
            ));
        }

        Completion::new(
            choice.message.content.unwrap_or_default(),
            TextProviderKind::OpenAI,
            self.model,
        )
    }
}
