//! Configuration loading from file and environment variables, and provider
//! construction from that configuration.

use crate::assembler::SceneAssembler;
use crate::error::SceneVisionError;
use crate::flows::{ImagePreviewGenerator, LanguageModelAugmenter, VoicePipeline};
use crate::gallery::{JsonFileGallery, MemoryGallery, SceneRepository};
use crate::identity::{AnonymousIdentity, FixedIdentity, IdentityProvider, UserProfile};
use crate::image::{ImageProvider, ImageProviderKind};
use crate::text::{TextProvider, TextProviderKind};
use crate::voice::Transcriber;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Image generation settings.
    #[serde(default)]
    pub image: ImageConfig,

    /// Prompt augmentation model settings.
    #[serde(default)]
    pub text: TextConfig,

    /// Speech-to-text settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Gallery storage settings.
    #[serde(default)]
    pub gallery: GalleryConfig,

    /// Identity settings.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Image provider selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageConfig {
    /// Which hosted image model to call.
    #[serde(default)]
    pub provider: ImageProviderKind,

    /// Model identifier; the provider's default when unset.
    #[serde(default)]
    pub model: Option<String>,
}

/// Language model used for prompt augmentation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextConfig {
    /// Which hosted language model to call.
    #[serde(default)]
    pub provider: TextProviderKind,

    /// Model identifier; the provider's default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Speech-to-text settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoiceConfig {
    /// Transcription model; the provider's default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// ISO-639-1 language hint.
    #[serde(default)]
    pub language: Option<String>,
}

/// Gallery backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GalleryBackend {
    /// JSON file at [`GalleryConfig::path`].
    #[default]
    File,
    /// Process memory; nothing survives a restart.
    Memory,
}

/// Gallery storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
    /// Storage backend.
    #[serde(default)]
    pub backend: GalleryBackend,

    /// Path of the gallery file.
    #[serde(default = "default_gallery_path")]
    pub path: PathBuf,
}

/// How the current user is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityMode {
    /// Nobody is signed in.
    #[default]
    Anonymous,
    /// A fixed user, for development and demos.
    Fixed,
}

impl std::str::FromStr for IdentityMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "anonymous" => Ok(Self::Anonymous),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::Invalid(format!("unknown identity mode: {other}"))),
        }
    }
}

/// Identity settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Anonymous or fixed.
    #[serde(default)]
    pub mode: IdentityMode,

    /// User id for the fixed identity.
    #[serde(default)]
    pub uid: Option<String>,

    /// Email for the fixed identity.
    #[serde(default)]
    pub email: Option<String>,

    /// Display name for the fixed identity.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "scenevision=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_gallery_path() -> PathBuf {
    PathBuf::from("scenevision-gallery.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            backend: GalleryBackend::default(),
            path: default_gallery_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An override carried a value that is not allowed.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `SCENEVISION_IMAGE_PROVIDER` overrides `image.provider`
/// - `SCENEVISION_TEXT_PROVIDER` overrides `text.provider`
/// - `SCENEVISION_GALLERY_PATH` overrides `gallery.path`
/// - `SCENEVISION_IDENTITY` overrides `identity.mode`
/// - `SCENEVISION_LOG_LEVEL` overrides `logging.level`
/// - `SCENEVISION_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// API keys are not part of the file; each provider reads its own
/// environment variable.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if an override names an unknown provider or mode.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %p.display(), "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(
    mut config: Config,
    var: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let invalid = |e: SceneVisionError| ConfigError::Invalid(e.to_string());

    if let Some(provider) = var("SCENEVISION_IMAGE_PROVIDER") {
        config.image.provider = provider.parse().map_err(invalid)?;
    }
    if let Some(provider) = var("SCENEVISION_TEXT_PROVIDER") {
        config.text.provider = provider.parse().map_err(invalid)?;
    }
    if let Some(path) = var("SCENEVISION_GALLERY_PATH") {
        config.gallery.path = PathBuf::from(path);
    }
    if let Some(mode) = var("SCENEVISION_IDENTITY") {
        config.identity.mode = mode.parse()?;
    }
    if let Some(level) = var("SCENEVISION_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("SCENEVISION_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}

#[cfg(not(all(feature = "gemini", feature = "openai")))]
fn not_enabled(what: &str, feature: &str) -> SceneVisionError {
    SceneVisionError::ProviderNotAvailable(format!(
        "{what} requires the `{feature}` feature"
    ))
}

/// Builds the configured image provider.
pub fn build_image_provider(config: &ImageConfig) -> crate::Result<Arc<dyn ImageProvider>> {
    match config.provider {
        #[cfg(feature = "gemini")]
        ImageProviderKind::Gemini => {
            use crate::image::providers::GeminiImageProvider;
            let mut builder = GeminiImageProvider::builder();
            if let Some(ref model) = config.model {
                builder = builder.model(model.parse()?);
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(not(feature = "gemini"))]
        ImageProviderKind::Gemini => Err(not_enabled("Gemini image generation", "gemini")),

        #[cfg(feature = "openai")]
        ImageProviderKind::OpenAI => {
            use crate::image::providers::OpenAiImageProvider;
            let mut builder = OpenAiImageProvider::builder();
            if let Some(ref model) = config.model {
                builder = builder.model(model.parse()?);
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(not(feature = "openai"))]
        ImageProviderKind::OpenAI => Err(not_enabled("OpenAI image generation", "openai")),
    }
}

/// Builds the configured language model.
pub fn build_text_provider(config: &TextConfig) -> crate::Result<Arc<dyn TextProvider>> {
    match config.provider {
        #[cfg(feature = "openai")]
        TextProviderKind::OpenAI => {
            use crate::text::providers::OpenAiTextProvider;
            let mut builder = OpenAiTextProvider::builder();
            if let Some(ref model) = config.model {
                builder = builder.model(model.clone());
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(not(feature = "openai"))]
        TextProviderKind::OpenAI => Err(not_enabled("OpenAI prompt augmentation", "openai")),

        #[cfg(feature = "gemini")]
        TextProviderKind::Gemini => {
            use crate::text::providers::GeminiTextProvider;
            let mut builder = GeminiTextProvider::builder();
            if let Some(ref model) = config.model {
                builder = builder.model(model.clone());
            }
            Ok(Arc::new(builder.build()?))
        }
        #[cfg(not(feature = "gemini"))]
        TextProviderKind::Gemini => Err(not_enabled("Gemini prompt augmentation", "gemini")),
    }
}

/// Builds the speech-to-text provider.
#[cfg(feature = "openai")]
pub fn build_transcriber(config: &VoiceConfig) -> crate::Result<Arc<dyn Transcriber>> {
    use crate::voice::providers::OpenAiTranscriber;
    let mut builder = OpenAiTranscriber::builder();
    if let Some(ref model) = config.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref language) = config.language {
        builder = builder.language(language.clone());
    }
    Ok(Arc::new(builder.build()?))
}

/// Builds the speech-to-text provider.
#[cfg(not(feature = "openai"))]
pub fn build_transcriber(_config: &VoiceConfig) -> crate::Result<Arc<dyn Transcriber>> {
    Err(not_enabled("Voice transcription", "openai"))
}

/// Builds the configured identity provider.
pub fn build_identity(config: &IdentityConfig) -> Arc<dyn IdentityProvider> {
    match config.mode {
        IdentityMode::Anonymous => Arc::new(AnonymousIdentity),
        IdentityMode::Fixed => {
            let mut user = match config.uid {
                Some(ref uid) => UserProfile::new(uid.clone()),
                None => UserProfile::development(),
            };
            if let Some(ref email) = config.email {
                user = user.with_email(email.clone());
            }
            if let Some(ref name) = config.display_name {
                user = user.with_display_name(name.clone());
            }
            Arc::new(FixedIdentity::new(user))
        }
    }
}

/// Opens the configured gallery.
pub fn build_gallery(config: &GalleryConfig) -> Arc<dyn SceneRepository> {
    match config.backend {
        GalleryBackend::File => Arc::new(JsonFileGallery::new(config.path.clone())),
        GalleryBackend::Memory => Arc::new(MemoryGallery::new()),
    }
}

impl Config {
    /// Wires providers, flows and identity into a [`SceneAssembler`].
    ///
    /// The voice pipeline is attached only if a transcriber can be built;
    /// without one, voice generation reports `ProviderNotAvailable`.
    pub fn build_assembler(&self) -> crate::Result<SceneAssembler> {
        let images = build_image_provider(&self.image)?;
        let mut augmenter = LanguageModelAugmenter::new(build_text_provider(&self.text)?);
        if let Some(temperature) = self.text.temperature {
            augmenter = augmenter.with_temperature(temperature);
        }

        let mut assembler = SceneAssembler::new(
            Arc::new(augmenter),
            Arc::new(ImagePreviewGenerator::new(images.clone())),
        )
        .with_identity(build_identity(&self.identity));

        match build_transcriber(&self.voice) {
            Ok(transcriber) => {
                assembler = assembler.with_voice(Arc::new(VoicePipeline::new(transcriber, images)));
            }
            Err(e) => tracing::debug!(error = %e, "voice pipeline disabled"),
        }

        Ok(assembler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.image.provider, ImageProviderKind::Gemini);
        assert_eq!(config.text.provider, TextProviderKind::OpenAI);
        assert_eq!(config.gallery.backend, GalleryBackend::File);
        assert_eq!(config.gallery.path, PathBuf::from("scenevision-gallery.json"));
        assert_eq!(config.identity.mode, IdentityMode::Anonymous);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.gallery.backend, GalleryBackend::File);
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenevision.toml");
        std::fs::write(
            &path,
            r#"
[image]
provider = "openai"
model = "dall-e-3"

[text]
provider = "gemini"
temperature = 0.5

[gallery]
backend = "memory"

[identity]
mode = "fixed"
uid = "u-42"
display_name = "Ana"

[logging]
level = "debug"
json = true
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.image.provider, ImageProviderKind::OpenAI);
        assert_eq!(config.image.model.as_deref(), Some("dall-e-3"));
        assert_eq!(config.text.provider, TextProviderKind::Gemini);
        assert_eq!(config.text.temperature, Some(0.5));
        assert_eq!(config.gallery.backend, GalleryBackend::Memory);
        assert_eq!(config.identity.mode, IdentityMode::Fixed);
        assert!(config.logging.json);

        let identity = build_identity(&config.identity);
        let user = identity.current_user().unwrap();
        assert_eq!(user.uid, "u-42");
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[image\nprovider = ").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_overrides(
            Config::default(),
            env(&[
                ("SCENEVISION_IMAGE_PROVIDER", "openai"),
                ("SCENEVISION_TEXT_PROVIDER", "Gemini"),
                ("SCENEVISION_GALLERY_PATH", "/tmp/scenes.json"),
                ("SCENEVISION_IDENTITY", "fixed"),
                ("SCENEVISION_LOG_LEVEL", "scenevision=debug"),
                ("SCENEVISION_LOG_JSON", "1"),
            ]),
        )
        .unwrap();
        assert_eq!(config.image.provider, ImageProviderKind::OpenAI);
        assert_eq!(config.text.provider, TextProviderKind::Gemini);
        assert_eq!(config.gallery.path, PathBuf::from("/tmp/scenes.json"));
        assert_eq!(config.identity.mode, IdentityMode::Fixed);
        assert_eq!(config.logging.level, "scenevision=debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_unknown_provider_override_is_rejected() {
        let err = apply_overrides(
            Config::default(),
            env(&[("SCENEVISION_IMAGE_PROVIDER", "midjourney")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_anonymous_identity_by_default() {
        assert!(build_identity(&IdentityConfig::default()).current_user().is_none());
    }

    #[cfg(feature = "gemini")]
    #[test]
    fn test_unknown_image_model_is_rejected() {
        let config = ImageConfig {
            provider: ImageProviderKind::Gemini,
            model: Some("imagen-1".into()),
        };
        assert!(matches!(
            build_image_provider(&config),
            Err(SceneVisionError::InvalidModel(_))
        ));
    }
}
