//! Image generation providers.

#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "openai")]
mod openai;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiImageModel, GeminiImageProvider, GeminiImageProviderBuilder};

#[cfg(feature = "openai")]
pub use openai::{OpenAiImageModel, OpenAiImageProvider, OpenAiImageProviderBuilder};
