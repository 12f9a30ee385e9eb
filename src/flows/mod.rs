//! Request/response flows behind the three scene contracts.
//!
//! Each flow is a trait with one production implementation built on the
//! provider traits; callers receive the flow as a trait object so hosted
//! and scripted backends are interchangeable.

mod augment;
mod preview;
mod voice;

pub use augment::{AugmentResponse, LanguageModelAugmenter, PromptAugmenter};
pub use preview::{
    ImagePreviewGenerator, ScenePreviewGenerator, ScenePreviewRequest, ScenePreviewResponse,
};
pub use voice::{VoiceInputRequest, VoiceInputResponse, VoicePipeline, VoiceToImage};
