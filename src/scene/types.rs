//! Core types for scene parameters and generated scene records.

use crate::error::{Result, SceneVisionError};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Preview shown when generation fails.
pub const GENERATION_FAILED_PLACEHOLDER_URL: &str =
    "https://placehold.co/1280x720.png?text=Generation+Failed";

/// Stand-in comparison image attached to generated scenes.
pub const SOURCE_IMAGE_PLACEHOLDER_URL: &str =
    "https://placehold.co/1280x720.png?text=Source+Street+View";

/// Id carried by the sentinel scene produced on failure.
pub const FAILED_SCENE_ID: &str = "error-scene";

/// Weather conditions a scene can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeatherCondition {
    /// Clear sky, direct sunlight.
    Sunny,
    /// Overcast.
    Cloudy,
    /// Rain.
    Rainy,
    /// Thunderstorm.
    Stormy,
    /// Snowfall.
    Snowy,
    /// Fog.
    Foggy,
}

impl WeatherCondition {
    /// Every supported weather condition, in display order.
    pub const ALL: [Self; 6] = [
        Self::Sunny,
        Self::Cloudy,
        Self::Rainy,
        Self::Stormy,
        Self::Snowy,
        Self::Foggy,
    ];

    /// Returns the display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunny => "Sunny",
            Self::Cloudy => "Cloudy",
            Self::Rainy => "Rainy",
            Self::Stormy => "Stormy",
            Self::Snowy => "Snowy",
            Self::Foggy => "Foggy",
        }
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WeatherCondition {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                SceneVisionError::Validation(format!("unknown weather condition: {s:?}"))
            })
    }
}

/// Atmospheric effects layered over a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AtmosphericEffect {
    /// No particular effect.
    Clear,
    /// Warm light right after sunrise.
    #[serde(rename = "Sunrise Glow")]
    SunriseGlow,
    /// Low, golden sunlight.
    #[serde(rename = "Golden Hour")]
    GoldenHour,
    /// Dusk.
    Twilight,
    /// Light mist.
    Misty,
    /// Haze.
    Hazy,
    /// Night sky with visible stars.
    #[serde(rename = "Starry Night")]
    StarryNight,
}

impl AtmosphericEffect {
    /// Every supported effect, in display order.
    pub const ALL: [Self; 7] = [
        Self::Clear,
        Self::SunriseGlow,
        Self::GoldenHour,
        Self::Twilight,
        Self::Misty,
        Self::Hazy,
        Self::StarryNight,
    ];

    /// Returns the display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::SunriseGlow => "Sunrise Glow",
            Self::GoldenHour => "Golden Hour",
            Self::Twilight => "Twilight",
            Self::Misty => "Misty",
            Self::Hazy => "Hazy",
            Self::StarryNight => "Starry Night",
        }
    }
}

impl std::fmt::Display for AtmosphericEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AtmosphericEffect {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                SceneVisionError::Validation(format!("unknown atmospheric effect: {s:?}"))
            })
    }
}

/// User-editable input to a single scene generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneParameters {
    /// Free-text location, e.g. "Eiffel Tower, Paris".
    pub location: String,
    /// Calendar date of the scene.
    pub date: Option<NaiveDate>,
    /// Time of day as `HH:MM`.
    pub time: String,
    /// Weather to render.
    pub weather_condition: WeatherCondition,
    /// Effects in selection order, without duplicates.
    #[serde(deserialize_with = "deserialize_effects")]
    pub atmospheric_effects: Vec<AtmosphericEffect>,
    /// Extra instructions for the prompt augmenter.
    pub custom_prompt: Option<String>,
}

impl SceneParameters {
    /// Creates parameters for a location and weather, at noon with no date.
    pub fn new(location: impl Into<String>, weather_condition: WeatherCondition) -> Self {
        Self {
            location: location.into(),
            date: None,
            time: "12:00".to_string(),
            weather_condition,
            atmospheric_effects: Vec::new(),
            custom_prompt: None,
        }
    }

    /// Sets the calendar date.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Sets the time of day (`HH:MM`).
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = time.into();
        self
    }

    /// Adds an effect, ignoring it if already selected.
    pub fn with_effect(mut self, effect: AtmosphericEffect) -> Self {
        if !self.atmospheric_effects.contains(&effect) {
            self.atmospheric_effects.push(effect);
        }
        self
    }

    /// Adds several effects in order, skipping duplicates.
    pub fn with_effects(self, effects: impl IntoIterator<Item = AtmosphericEffect>) -> Self {
        effects.into_iter().fold(self, Self::with_effect)
    }

    /// Sets the custom prompt.
    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = Some(prompt.into());
        self
    }

    /// Selected effects in order, first occurrence wins.
    pub fn effects(&self) -> Vec<AtmosphericEffect> {
        dedup_effects(self.atmospheric_effects.iter().copied())
    }

    /// Returns the custom prompt, treating blank text as absent.
    pub fn custom_prompt(&self) -> Option<&str> {
        self.custom_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Combined date and time: `YYYY-MM-DD HH:MM`, or just `HH:MM` without a date.
    pub fn date_time(&self) -> String {
        match self.date {
            Some(date) => format!("{} {}", date.format("%Y-%m-%d"), self.time.trim()),
            None => self.time.trim().to_string(),
        }
    }

    /// Checks the parameters before any provider is contacted.
    pub fn validate(&self) -> Result<()> {
        if self.location.trim().is_empty() {
            return Err(SceneVisionError::Validation("location is required".into()));
        }
        validate_time(&self.time)?;
        Ok(())
    }

    /// Converts to the string-typed description used by the flows.
    pub fn describe(&self) -> SceneDescription {
        SceneDescription {
            location: self.location.trim().to_string(),
            date_time: self.date_time(),
            weather_condition: self.weather_condition.to_string(),
            atmospheric_effects: self.effects().iter().map(ToString::to_string).collect(),
            custom_prompt: self.custom_prompt().map(str::to_string),
        }
    }
}

fn dedup_effects(effects: impl IntoIterator<Item = AtmosphericEffect>) -> Vec<AtmosphericEffect> {
    let mut unique = Vec::new();
    for effect in effects {
        if !unique.contains(&effect) {
            unique.push(effect);
        }
    }
    unique
}

fn deserialize_effects<'de, D>(deserializer: D) -> std::result::Result<Vec<AtmosphericEffect>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Vec::<AtmosphericEffect>::deserialize(deserializer).map(dedup_effects)
}

fn validate_time(time: &str) -> Result<()> {
    let invalid = || SceneVisionError::Validation(format!("time must be HH:MM, got {time:?}"));

    let (hours, minutes) = time.trim().split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(())
}

/// String-typed scene fields as they travel in flow requests.
///
/// This is also the prompt augmentation request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDescription {
    /// Location text.
    pub location: String,
    /// Combined date and time text.
    pub date_time: String,
    /// Weather label, one of [`WeatherCondition::ALL`].
    pub weather_condition: String,
    /// Effect labels in selection order.
    #[serde(default)]
    pub atmospheric_effects: Vec<String>,
    /// Optional custom instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

impl SceneDescription {
    /// Rejects descriptions that would not survive the typed schema.
    pub fn validate(&self) -> Result<()> {
        validate_fields(
            &self.location,
            &self.date_time,
            &self.weather_condition,
            &self.atmospheric_effects,
        )
    }
}

/// Shared schema check for the string-typed request bodies.
pub(crate) fn validate_fields(
    location: &str,
    date_time: &str,
    weather_condition: &str,
    atmospheric_effects: &[String],
) -> Result<()> {
    if location.trim().is_empty() {
        return Err(SceneVisionError::Validation("location is required".into()));
    }
    if date_time.trim().is_empty() {
        return Err(SceneVisionError::Validation("dateTime is required".into()));
    }
    weather_condition.parse::<WeatherCondition>()?;
    for effect in atmospheric_effects {
        effect.parse::<AtmosphericEffect>()?;
    }
    Ok(())
}

/// A generated scene preview and the parameters that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Unique id (UUID v4), or [`FAILED_SCENE_ID`] for the sentinel.
    pub id: String,
    /// Owner, when an identity is signed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Location text as entered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    /// Requested date and time of the scene.
    pub date_time: String,
    /// Weather the scene was rendered in.
    pub weather_condition: WeatherCondition,
    /// Effects in selection order.
    #[serde(default)]
    pub atmospheric_effects: Vec<AtmosphericEffect>,
    /// Custom instructions the user supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    /// Transcript of the voice input, for voice-driven scenes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_input_transcript: Option<String>,
    /// Where the preview image can be loaded from.
    pub preview_url: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Baseline image for side-by-side comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image_url: Option<String>,
}

impl Scene {
    /// Builds a scene for a successful generation.
    pub fn generated(
        params: &SceneParameters,
        preview_url: impl Into<String>,
        user_id: Option<String>,
    ) -> Self {
        let created_at = now_rfc3339();
        let date_time = match params.date {
            Some(_) => params.date_time(),
            None => created_at.clone(),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            location_name: Some(params.location.trim().to_string()),
            date_time,
            weather_condition: params.weather_condition,
            atmospheric_effects: params.effects(),
            custom_prompt: params.custom_prompt().map(str::to_string),
            voice_input_transcript: None,
            preview_url: preview_url.into(),
            created_at,
            source_image_url: Some(SOURCE_IMAGE_PLACEHOLDER_URL.to_string()),
        }
    }

    /// Builds the sentinel scene shown when generation fails.
    pub fn failed(params: &SceneParameters) -> Self {
        let created_at = now_rfc3339();
        Self {
            id: FAILED_SCENE_ID.to_string(),
            user_id: None,
            location_name: None,
            date_time: created_at.clone(),
            weather_condition: params.weather_condition,
            atmospheric_effects: params.effects(),
            custom_prompt: None,
            voice_input_transcript: None,
            preview_url: GENERATION_FAILED_PLACEHOLDER_URL.to_string(),
            created_at,
            source_image_url: None,
        }
    }

    /// Attaches a voice transcript.
    pub fn with_voice_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.voice_input_transcript = Some(transcript.into());
        self
    }

    /// Returns true for the sentinel produced by a failed generation.
    pub fn is_placeholder(&self) -> bool {
        self.id == FAILED_SCENE_ID
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Returns true for `http(s)://host...` URLs and `data:` URIs.
pub fn is_displayable_url(url: &str) -> bool {
    if let Some(rest) = url.strip_prefix("data:") {
        return rest.contains(',') && !rest.ends_with(',');
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(r) if !r.is_empty() && !r.starts_with('/'))
}
