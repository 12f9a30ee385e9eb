//! Text completion providers.

#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiTextProvider, GeminiTextProviderBuilder};

#[cfg(feature = "openai")]
pub use openai::{OpenAiTextProvider, OpenAiTextProviderBuilder};
