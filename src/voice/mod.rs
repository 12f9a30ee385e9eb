//! Voice input: audio payloads and speech-to-text.

mod audio;
mod provider;
pub mod providers;

pub use audio::AudioDataUri;
pub use provider::Transcriber;
