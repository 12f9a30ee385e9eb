//! Image provider trait.

use crate::error::Result;
use crate::image::types::{GeneratedImage, GenerationRequest, ImageProviderKind};
use async_trait::async_trait;

/// Trait for image generation providers.
///
/// Implementations make a single round trip per call and must never return
/// an image with an empty URL: a response without media is
/// [`SceneVisionError::EmptyResult`](crate::SceneVisionError::EmptyResult).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates an image from the given request.
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedImage>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ImageProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ImageProviderKind::Gemini => "Gemini (Google)",
            ImageProviderKind::OpenAI => "OpenAI (dall-e)",
        }
    }

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
