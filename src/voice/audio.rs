//! Audio payloads carried as `data:<mime>;base64,<data>` URIs.

use crate::error::{Result, SceneVisionError};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A validated audio data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AudioDataUri {
    uri: String,
    mime_end: usize,
}

impl AudioDataUri {
    /// Parses and validates a data URI.
    pub fn parse(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into().trim().to_string();
        let invalid = |why: &str| {
            SceneVisionError::Validation(format!(
                "audioDataUri must be 'data:<mimetype>;base64,<data>': {why}"
            ))
        };

        let rest = uri.strip_prefix("data:").ok_or_else(|| invalid("missing data: prefix"))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| invalid("missing ;base64, marker"))?;
        if mime.is_empty() || !mime.contains('/') {
            return Err(invalid("missing mime type"));
        }
        if !is_audio_mime(mime) {
            return Err(invalid("not an audio mime type"));
        }
        if payload.trim().is_empty() {
            return Err(invalid("empty audio payload"));
        }

        let mime_end = "data:".len() + mime.len();
        Ok(Self { uri, mime_end })
    }

    /// Encodes raw audio bytes.
    pub fn from_bytes(mime_type: &str, data: &[u8]) -> Result<Self> {
        Self::parse(format!(
            "data:{mime_type};base64,{}",
            base64::engine::general_purpose::STANDARD.encode(data)
        ))
    }

    /// Returns the full URI.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Returns the declared mime type, e.g. `audio/webm`.
    pub fn mime_type(&self) -> &str {
        &self.uri["data:".len()..self.mime_end]
    }

    /// Returns the base64 payload.
    pub fn payload(&self) -> &str {
        &self.uri[self.mime_end + ";base64,".len()..]
    }

    /// Decodes the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        decode_base64_lenient(self.payload()).map_err(|e| SceneVisionError::Decode(e.to_string()))
    }

    /// File extension matching the mime type, for multipart uploads.
    pub fn file_extension(&self) -> &'static str {
        let subtype = self
            .mime_type()
            .split(';')
            .next()
            .unwrap_or_default()
            .rsplit('/')
            .next()
            .unwrap_or_default();
        match subtype {
            "webm" => "webm",
            "ogg" | "opus" => "ogg",
            "wav" | "x-wav" | "wave" => "wav",
            "mpeg" | "mp3" => "mp3",
            "mp4" | "m4a" | "x-m4a" => "m4a",
            "flac" | "x-flac" => "flac",
            _ => "webm",
        }
    }
}

impl TryFrom<String> for AudioDataUri {
    type Error = SceneVisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<AudioDataUri> for String {
    fn from(value: AudioDataUri) -> Self {
        value.uri
    }
}

impl std::fmt::Display for AudioDataUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,<{} chars>", self.mime_type(), self.payload().len())
    }
}

/// `audio/*`, plus `video/webm` which browser recorders emit for audio-only takes.
fn is_audio_mime(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence.starts_with("audio/") || essence == "video/webm"
}

/// Decodes base64 that may carry whitespace or lack padding.
fn decode_base64_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    if let Ok(data) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
        return Ok(data);
    }

    base64::engine::general_purpose::STANDARD_NO_PAD.decode(cleaned.trim_end_matches('='))
}
