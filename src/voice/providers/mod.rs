//! Speech-to-text providers.

#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiTranscriber, OpenAiTranscriberBuilder};
