//! Error types for the scene generation pipeline.

use std::time::Duration;

/// Maximum length of a provider error message kept for display.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while composing, augmenting or generating scenes.
#[derive(Debug, thiserror::Error)]
pub enum SceneVisionError {
    /// Input rejected against the request schema before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized error body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the provider.
        retry_after: Option<Duration>,
    },

    /// Quota exhausted or billing not enabled.
    #[error("billing error: {0}")]
    Billing(String),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Provider answered with a shape we could not interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Speech-to-text call failed.
    #[error("transcription failed: {0}")]
    Transcription(String),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// Provider call succeeded but carried no usable payload.
    #[error("empty generation result: {0}")]
    EmptyResult(String),

    /// A generation request is already in flight.
    #[error("a scene generation is already in progress")]
    Busy,

    /// The configured model does not exist at the provider.
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// Provider not available (feature not enabled).
    #[error("provider not available: {0}")]
    ProviderNotAvailable(String),

    /// I/O error (e.g., gallery file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by the orchestration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input, rejected locally.
    Validation,
    /// The hosted text, image or speech API failed.
    Upstream,
    /// The hosted API succeeded without a usable payload.
    EmptyResult,
    /// Local failure unrelated to a provider (storage, busy flag).
    Local,
}

impl SceneVisionError {
    /// Folds this error into the pipeline's error taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::EmptyResult(_) => ErrorCategory::EmptyResult,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::Billing(_)
            | Self::ContentBlocked(_)
            | Self::Network(_)
            | Self::UnexpectedResponse(_)
            | Self::Transcription(_)
            | Self::Decode(_)
            | Self::InvalidModel(_)
            | Self::ProviderNotAvailable(_) => ErrorCategory::Upstream,
            Self::Busy | Self::Io(_) | Self::Json(_) => ErrorCategory::Local,
        }
    }

    /// Returns the suggested retry delay, if the provider sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for scene pipeline operations.
pub type Result<T> = std::result::Result<T, SceneVisionError>;

/// Parses a `Retry-After` header given in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Maps a non-success provider response to an error variant.
pub(crate) fn classify_http_error(
    provider: &str,
    status: u16,
    text: &str,
    headers: &reqwest::header::HeaderMap,
) -> SceneVisionError {
    let text = sanitize_error_message(text);
    let lower = text.to_lowercase();
    match status {
        401 | 403 => SceneVisionError::Auth(text),
        402 => SceneVisionError::Billing(format!("{provider} billing issue: {text}")),
        404 => SceneVisionError::InvalidModel(format!(
            "{provider} model not found. Verify the model name is correct."
        )),
        429 if lower.contains("insufficient_quota") || lower.contains("exceeded your current quota") => {
            SceneVisionError::Billing(text)
        }
        429 => SceneVisionError::RateLimited {
            retry_after: parse_retry_after(headers).map(Duration::from_secs),
        },
        _ if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("content_policy")
            || lower.contains("prohibited") =>
        {
            SceneVisionError::ContentBlocked(text)
        }
        _ => SceneVisionError::Api {
            status,
            message: text,
        },
    }
}

/// Trims a provider error body for display, redacting anything that looks
/// like an API key.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let is_token_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

    let mut joined = String::with_capacity(text.len());
    let mut token = String::new();
    fn flush(token: &mut String, out: &mut String) {
        if token.starts_with("sk-") || token.starts_with("AIza") {
            out.push_str("[REDACTED]");
        } else {
            out.push_str(token);
        }
        token.clear();
    }
    for c in text.split_whitespace().collect::<Vec<_>>().join(" ").chars() {
        if is_token_char(c) {
            token.push(c);
        } else {
            flush(&mut token, &mut joined);
            joined.push(c);
        }
    }
    flush(&mut token, &mut joined);

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category() {
        assert_eq!(
            SceneVisionError::Validation("no location".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            SceneVisionError::EmptyResult("no media".into()).category(),
            ErrorCategory::EmptyResult
        );
        assert_eq!(
            SceneVisionError::Auth("bad key".into()).category(),
            ErrorCategory::Upstream
        );
        assert_eq!(
            SceneVisionError::RateLimited { retry_after: None }.category(),
            ErrorCategory::Upstream
        );
        assert_eq!(SceneVisionError::Busy.category(), ErrorCategory::Local);
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = SceneVisionError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));
        assert_eq!(SceneVisionError::Auth("bad".into()).retry_after(), None);
    }

    #[test]
    fn test_error_display() {
        let err = SceneVisionError::Api {
            status: 404,
            message: "Not found".into(),
        };
        assert_eq!(err.to_string(), "API error: 404 - Not found");

        let err = SceneVisionError::EmptyResult("no image in response".into());
        assert_eq!(
            err.to_string(),
            "empty generation result: no image in response"
        );
    }

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = sanitize_error_message("Incorrect API key provided: sk-abc123XYZ. Check it.");
        assert!(!msg.contains("sk-abc123XYZ"));
        assert!(msg.contains("[REDACTED]"));

        let msg = sanitize_error_message("key=AIzaSyFAKE is invalid");
        assert!(!msg.contains("AIzaSyFAKE"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(2000);
        let msg = sanitize_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn test_classify_http_error() {
        let headers = reqwest::header::HeaderMap::new();
        assert!(matches!(
            classify_http_error("Gemini", 401, "bad key", &headers),
            SceneVisionError::Auth(_)
        ));
        assert!(matches!(
            classify_http_error("OpenAI", 429, "insufficient_quota", &headers),
            SceneVisionError::Billing(_)
        ));
        assert!(matches!(
            classify_http_error("OpenAI", 429, "slow down", &headers),
            SceneVisionError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            classify_http_error("OpenAI", 400, "rejected by content_policy", &headers),
            SceneVisionError::ContentBlocked(_)
        ));
        assert!(matches!(
            classify_http_error("Gemini", 500, "internal", &headers),
            SceneVisionError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(30));
    }
}
