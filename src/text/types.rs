//! Core types for text completion.

use crate::error::{Result, SceneVisionError};
use serde::{Deserialize, Serialize};

/// Text provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextProviderKind {
    /// OpenAI chat completions.
    #[default]
    OpenAI,
    /// Google Gemini.
    Gemini,
}

impl std::fmt::Display for TextProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for TextProviderKind {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" => Ok(Self::Gemini),
            other => Err(SceneVisionError::ProviderNotAvailable(format!(
                "unknown text provider: {other}"
            ))),
        }
    }
}

/// A single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Optional system instruction.
    pub system: Option<String>,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Creates a request with just a user prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
        }
    }

    /// Sets the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Text returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated text, trimmed.
    pub text: String,
    /// Provider that produced it.
    pub provider: TextProviderKind,
    /// Model identifier, when reported.
    pub model: Option<String>,
}

impl Completion {
    /// Creates a completion, refusing blank output.
    pub fn new(
        text: impl Into<String>,
        provider: TextProviderKind,
        model: Option<String>,
    ) -> Result<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(SceneVisionError::EmptyResult(format!(
                "{provider} returned no text"
            )));
        }
        Ok(Self {
            text,
            provider,
            model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_completion_is_empty_result() {
        let err = Completion::new("  \n", TextProviderKind::OpenAI, None).unwrap_err();
        assert!(matches!(err, SceneVisionError::EmptyResult(_)));
    }

    #[test]
    fn test_completion_is_trimmed() {
        let completion = Completion::new(" A prompt. \n", TextProviderKind::Gemini, None).unwrap();
        assert_eq!(completion.text, "A prompt.");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(
            "Gemini".parse::<TextProviderKind>().unwrap(),
            TextProviderKind::Gemini
        );
        assert!("claude".parse::<TextProviderKind>().is_err());
    }
}
