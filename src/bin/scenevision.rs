//! CLI for SceneVision - scene preview generation.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use scenevision::config::{build_gallery, build_image_provider, build_text_provider};
use scenevision::flows::{LanguageModelAugmenter, PromptAugmenter};
use scenevision::{
    load_config, AtmosphericEffect, AudioDataUri, Config, GalleryQuery, SceneOutcome,
    SceneParameters, SortOrder, WeatherCondition,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenevision")]
#[command(about = "Generate photorealistic scene previews via hosted AI models (Gemini, OpenAI)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file
    #[arg(long, global = true, default_value = "scenevision.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a scene preview
    Generate(GenerateArgs),

    /// Generate a scene preview from recorded voice instructions
    Voice(VoiceArgs),

    /// Show the prompt a language model writes for a scene
    Augment(SceneArgs),

    /// Browse or prune saved scenes
    #[command(subcommand)]
    Gallery(GalleryCommand),

    /// List available providers
    Providers {
        /// Also check that the configured image provider is reachable
        #[arg(long)]
        check: bool,
    },
}

#[derive(Args)]
struct SceneArgs {
    /// Location, e.g. "Eiffel Tower, Paris"
    #[arg(short, long)]
    location: String,

    /// Calendar date (YYYY-MM-DD)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Time of day (HH:MM)
    #[arg(short, long, default_value = "12:00")]
    time: String,

    /// Weather: Sunny, Cloudy, Rainy, Stormy, Snowy or Foggy
    #[arg(short, long, default_value = "Sunny")]
    weather: WeatherCondition,

    /// Atmospheric effect; repeat for several
    #[arg(short, long = "effect")]
    effects: Vec<AtmosphericEffect>,

    /// Custom instructions for the scene
    #[arg(short, long)]
    prompt: Option<String>,
}

impl SceneArgs {
    fn parameters(&self) -> SceneParameters {
        let mut params = SceneParameters::new(&self.location, self.weather)
            .with_time(&self.time)
            .with_effects(self.effects.iter().copied());
        if let Some(date) = self.date {
            params = params.with_date(date);
        }
        if let Some(ref prompt) = self.prompt {
            params = params.with_custom_prompt(prompt);
        }
        params
    }
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Do not save the scene to the gallery
    #[arg(long)]
    no_save: bool,
}

#[derive(Args)]
struct VoiceArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Recorded audio file (webm, ogg, wav, mp3, m4a, flac)
    #[arg(short, long)]
    audio: PathBuf,

    /// Do not save the scene to the gallery
    #[arg(long)]
    no_save: bool,
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List saved scenes
    List {
        /// Case-insensitive search over location, custom prompt and weather
        #[arg(short, long)]
        search: Option<String>,

        /// createdAt_desc, createdAt_asc, locationName_asc or locationName_desc
        #[arg(long, default_value = "createdAt_desc")]
        sort: SortOrder,
    },

    /// Delete a saved scene
    Delete {
        /// Scene id
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(Some(&cli.config))?;
    init_logging(&config);

    match cli.command {
        Commands::Generate(args) => {
            generate(&config, args, cli.json).await?;
        }
        Commands::Voice(args) => {
            generate_from_voice(&config, args, cli.json).await?;
        }
        Commands::Augment(args) => {
            augment(&config, args, cli.json).await?;
        }
        Commands::Gallery(command) => {
            gallery(&config, command, cli.json)?;
        }
        Commands::Providers { check } => {
            list_providers(&config, check, cli.json).await?;
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn generate(config: &Config, args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let assembler = config.build_assembler()?;
    let outcome = assembler.generate(&args.scene.parameters()).await?;
    finish(config, outcome, args.no_save, json_output)
}

async fn generate_from_voice(
    config: &Config,
    args: VoiceArgs,
    json_output: bool,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.audio)
        .with_context(|| format!("failed to read {}", args.audio.display()))?;
    let audio = AudioDataUri::from_bytes(audio_mime_type(&args.audio), &bytes)?;

    let assembler = config.build_assembler()?;
    let outcome = assembler
        .generate_from_voice(&args.scene.parameters(), audio)
        .await?;
    finish(config, outcome, args.no_save, json_output)
}

fn audio_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("ogg" | "opus") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a" | "mp4") => "audio/mp4",
        Some("flac") => "audio/flac",
        _ => "audio/webm",
    }
}

fn finish(
    config: &Config,
    outcome: SceneOutcome,
    no_save: bool,
    json_output: bool,
) -> anyhow::Result<()> {
    let saved = outcome.is_success() && !no_save;
    if saved {
        build_gallery(&config.gallery).prepend(outcome.scene.clone())?;
    }

    if json_output {
        let result = serde_json::json!({
            "success": outcome.is_success(),
            "state": outcome.state,
            "notification": outcome.notification,
            "scene": outcome.scene,
            "prompt": outcome.prompt,
            "augmentation_fallback": outcome.augmentation_fallback,
            "saved": saved,
            "error": outcome.failure.as_ref().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}: {}", outcome.notification.title, outcome.notification.description);
        println!("Scene: {}", outcome.scene.id);
        println!("Preview: {}", display_url(&outcome.scene.preview_url));
        if let Some(ref transcript) = outcome.scene.voice_input_transcript {
            println!("Transcript: {}", transcript);
        }
        if outcome.augmentation_fallback {
            println!("Note: prompt augmentation failed, the baseline prompt was used");
        }
        if saved {
            println!("Saved to {}", config.gallery.path.display());
        }
    }

    match outcome.failure {
        Some(e) => Err(anyhow::Error::new(e).context("scene generation failed")),
        None => Ok(()),
    }
}

// Inline images are far too long for a terminal.
fn display_url(url: &str) -> String {
    match url.split_once(',') {
        Some((head, data)) if url.starts_with("data:") => {
            format!("{head},... ({} base64 chars)", data.len())
        }
        _ => url.to_string(),
    }
}

async fn augment(config: &Config, args: SceneArgs, json_output: bool) -> anyhow::Result<()> {
    if args.prompt.is_none() {
        anyhow::bail!("augment needs custom instructions (--prompt)");
    }
    let params = args.parameters();
    params.validate()?;

    let augmenter = LanguageModelAugmenter::new(build_text_provider(&config.text)?);
    let augmenter = match config.text.temperature {
        Some(t) => augmenter.with_temperature(t),
        None => augmenter,
    };
    let response = augmenter.augment(&params.describe()).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", response.augmented_prompt);
    }
    Ok(())
}

fn gallery(config: &Config, command: GalleryCommand, json_output: bool) -> anyhow::Result<()> {
    let gallery = build_gallery(&config.gallery);
    match command {
        GalleryCommand::List { search, sort } => {
            let mut query = GalleryQuery::new().with_sort(sort);
            if let Some(term) = search {
                query = query.with_search(term);
            }
            let scenes = gallery.query(&query)?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&scenes)?);
            } else if scenes.is_empty() {
                println!("No scenes found.");
            } else {
                for scene in &scenes {
                    println!(
                        "{}  {}  {}  {}",
                        scene.id,
                        scene.created_at,
                        scene.weather_condition,
                        scene.location_name.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        GalleryCommand::Delete { id } => {
            let deleted = gallery.delete(&id)?;
            if json_output {
                println!("{}", serde_json::json!({ "id": id, "deleted": deleted }));
            } else if deleted {
                println!("Deleted scene {}", id);
            } else {
                anyhow::bail!("no scene with id {id}");
            }
        }
    }
    Ok(())
}

async fn list_providers(config: &Config, check: bool, json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderInfo {
        name: &'static str,
        kind: &'static str,
        role: &'static str,
        env_var: &'static str,
        enabled: bool,
    }

    let providers = vec![
        ProviderInfo {
            name: "Gemini (Google)",
            kind: "gemini",
            role: "image",
            env_var: "GOOGLE_API_KEY",
            enabled: cfg!(feature = "gemini"),
        },
        ProviderInfo {
            name: "OpenAI (dall-e)",
            kind: "openai",
            role: "image",
            env_var: "OPENAI_API_KEY",
            enabled: cfg!(feature = "openai"),
        },
        ProviderInfo {
            name: "OpenAI chat completions",
            kind: "openai",
            role: "text",
            env_var: "OPENAI_API_KEY",
            enabled: cfg!(feature = "openai"),
        },
        ProviderInfo {
            name: "Gemini (Google)",
            kind: "gemini",
            role: "text",
            env_var: "GOOGLE_API_KEY",
            enabled: cfg!(feature = "gemini"),
        },
        ProviderInfo {
            name: "OpenAI transcription",
            kind: "openai",
            role: "voice",
            env_var: "OPENAI_API_KEY",
            enabled: cfg!(feature = "openai"),
        },
    ];

    let health = if check {
        let provider = build_image_provider(&config.image)?;
        Some(provider.health_check().await.map_err(|e| e.to_string()))
    } else {
        None
    };

    if json_output {
        let result = serde_json::json!({
            "providers": providers,
            "configured": {
                "image": config.image.provider.to_string(),
                "text": config.text.provider.to_string(),
            },
            "health": health.as_ref().map(|h| match h {
                Ok(()) => serde_json::json!({ "ok": true }),
                Err(e) => serde_json::json!({ "ok": false, "error": e }),
            }),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Available providers:\n");
        for role in ["image", "text", "voice"] {
            println!("{}:", role.to_uppercase());
            for p in providers.iter().filter(|p| p.role == role) {
                let status = if p.enabled { "✓" } else { "✗" };
                println!("  {} {} ({})", status, p.name, p.kind);
                println!("    API key: {}", p.env_var);
            }
        }
        println!(
            "\nConfigured: image={}, text={}",
            config.image.provider, config.text.provider
        );
        match health {
            Some(Ok(())) => println!("Health check: ok"),
            Some(Err(e)) => println!("Health check: failed ({})", e),
            None => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_args_build_parameters() {
        let cli = Cli::parse_from([
            "scenevision",
            "generate",
            "--location",
            "Eiffel Tower, Paris",
            "--date",
            "2024-05-01",
            "--time",
            "18:00",
            "--weather",
            "sunny",
            "--effect",
            "Golden Hour",
            "--effect",
            "Hazy",
        ]);
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let params = args.scene.parameters();
        assert_eq!(params.date_time(), "2024-05-01 18:00");
        assert_eq!(params.weather_condition, WeatherCondition::Sunny);
        assert_eq!(
            params.atmospheric_effects,
            vec![AtmosphericEffect::GoldenHour, AtmosphericEffect::Hazy]
        );
        assert!(params.custom_prompt().is_none());
    }

    #[test]
    fn test_unknown_weather_is_rejected() {
        let parsed = Cli::try_parse_from([
            "scenevision",
            "generate",
            "--location",
            "Oslo",
            "--weather",
            "Blizzard",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_audio_mime_type() {
        assert_eq!(audio_mime_type(Path::new("note.WAV")), "audio/wav");
        assert_eq!(audio_mime_type(Path::new("note.m4a")), "audio/mp4");
        assert_eq!(audio_mime_type(Path::new("note")), "audio/webm");
    }

    #[test]
    fn test_display_url_shortens_data_uri() {
        assert_eq!(
            display_url("data:image/png;base64,iVBORw0KGgo="),
            "data:image/png;base64,... (12 base64 chars)"
        );
        assert_eq!(display_url("https://x.example/a.png"), "https://x.example/a.png");
    }
}
