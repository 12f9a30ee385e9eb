//! Speech-to-text trait.

use crate::error::Result;
use crate::scene::SceneDescription;
use crate::voice::audio::AudioDataUri;
use async_trait::async_trait;

/// Turns recorded audio into transcript text.
///
/// The scene fields are passed along so implementations can bias
/// recognition toward place names and weather vocabulary.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes the audio. Implementations return non-empty text or an error.
    async fn transcribe(&self, audio: &AudioDataUri, scene: &SceneDescription) -> Result<String>;

    /// Returns the name of this transcriber for display.
    fn name(&self) -> &str;
}
