#![warn(missing_docs)]
//! SceneVision - photorealistic scene previews from structured parameters.
//!
//! A user picks a location, date/time, weather and atmospheric effects,
//! optionally adds free-text or spoken instructions, and a hosted
//! generative-image model renders the scene. This crate implements that
//! request pipeline: compose a prompt, optionally augment it with a language
//! model, generate the image, and assemble a [`Scene`].
//!
//! # Quick Start
//!
//! ```no_run
//! use scenevision::{load_config, AtmosphericEffect, SceneParameters, WeatherCondition};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config(None)?;
//!     let assembler = config.build_assembler()?;
//!
//!     let params = SceneParameters::new("Eiffel Tower, Paris", WeatherCondition::Sunny)
//!         .with_time("18:00")
//!         .with_effect(AtmosphericEffect::GoldenHour);
//!     let outcome = assembler.generate(&params).await?;
//!     println!("{}", outcome.scene.preview_url);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `gemini`: Gemini (Google) image and text models
//! - `openai`: OpenAI image, text and transcription models
//! - `cli`: Command-line interface

mod error;

pub mod assembler;
pub mod config;
pub mod flows;
pub mod gallery;
pub mod identity;
pub mod image;
pub mod prompt;
pub mod scene;
pub mod testing;
pub mod text;
pub mod voice;

// Re-export error types at crate root
pub use error::{ErrorCategory, Result, SceneVisionError};

pub use assembler::{GenerationState, Notification, NotificationLevel, SceneAssembler, SceneOutcome};
pub use config::{load_config, Config, ConfigError};
pub use flows::{
    AugmentResponse, ImagePreviewGenerator, LanguageModelAugmenter, PromptAugmenter,
    ScenePreviewGenerator, ScenePreviewRequest, ScenePreviewResponse, VoiceInputRequest,
    VoiceInputResponse, VoicePipeline, VoiceToImage,
};
pub use gallery::{GalleryQuery, JsonFileGallery, MemoryGallery, SceneRepository, SortOrder};
pub use identity::{AnonymousIdentity, FixedIdentity, IdentityProvider, Tier, UserProfile};
pub use image::{GeneratedImage, GenerationRequest, ImageProvider, ImageProviderKind};
pub use scene::{
    AtmosphericEffect, Scene, SceneDescription, SceneParameters, WeatherCondition,
    GENERATION_FAILED_PLACEHOLDER_URL,
};
pub use text::{TextProvider, TextProviderKind};
pub use voice::{AudioDataUri, Transcriber};

#[cfg(feature = "gemini")]
pub use image::providers::{GeminiImageModel, GeminiImageProvider, GeminiImageProviderBuilder};

#[cfg(feature = "openai")]
pub use image::providers::{OpenAiImageModel, OpenAiImageProvider, OpenAiImageProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::assembler::{SceneAssembler, SceneOutcome};
    pub use crate::error::{Result, SceneVisionError};
    pub use crate::flows::{PromptAugmenter, ScenePreviewGenerator, VoiceToImage};
    pub use crate::gallery::SceneRepository;
    pub use crate::identity::IdentityProvider;
    pub use crate::image::ImageProvider;
    pub use crate::scene::{AtmosphericEffect, Scene, SceneParameters, WeatherCondition};
    pub use crate::text::TextProvider;
    pub use crate::voice::Transcriber;
}
