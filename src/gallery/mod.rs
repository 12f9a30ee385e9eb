//! Scene gallery: storage of generated scenes, newest first.

mod json_file;
mod memory;

pub use json_file::JsonFileGallery;
pub use memory::MemoryGallery;

use crate::error::{Result, SceneVisionError};
use crate::scene::Scene;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Storage for generated scenes.
///
/// Scenes are immutable once stored; the only mutations are prepend and
/// delete-by-id.
pub trait SceneRepository: Send + Sync {
    /// Stores a scene ahead of all existing ones.
    fn prepend(&self, scene: Scene) -> Result<()>;

    /// All scenes, newest first.
    fn list(&self) -> Result<Vec<Scene>>;

    /// Looks up a scene by id.
    fn get(&self, id: &str) -> Result<Option<Scene>> {
        Ok(self.list()?.into_iter().find(|s| s.id == id))
    }

    /// Deletes a scene by id. Returns false when no such scene exists.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Filters and sorts the stored scenes.
    fn query(&self, query: &GalleryQuery) -> Result<Vec<Scene>> {
        Ok(query.apply(self.list()?))
    }
}

/// Refuses scenes that must never be persisted.
pub(crate) fn ensure_storable(scene: &Scene) -> Result<()> {
    if scene.is_placeholder() {
        return Err(SceneVisionError::Validation(
            "failed generations are not stored in the gallery".into(),
        ));
    }
    if scene.id.trim().is_empty() {
        return Err(SceneVisionError::Validation("scene id is empty".into()));
    }
    Ok(())
}

/// Gallery sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Newest first.
    #[default]
    #[serde(rename = "createdAt_desc")]
    CreatedAtDesc,
    /// Oldest first.
    #[serde(rename = "createdAt_asc")]
    CreatedAtAsc,
    /// Location A to Z.
    #[serde(rename = "locationName_asc")]
    LocationNameAsc,
    /// Location Z to A.
    #[serde(rename = "locationName_desc")]
    LocationNameDesc,
}

impl SortOrder {
    /// All orders, in menu order.
    pub const ALL: [Self; 4] = [
        Self::CreatedAtDesc,
        Self::CreatedAtAsc,
        Self::LocationNameAsc,
        Self::LocationNameDesc,
    ];

    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreatedAtDesc => "createdAt_desc",
            Self::CreatedAtAsc => "createdAt_asc",
            Self::LocationNameAsc => "locationName_asc",
            Self::LocationNameDesc => "locationName_desc",
        }
    }

    fn compare(&self, a: &Scene, b: &Scene) -> Ordering {
        match self {
            Self::CreatedAtDesc => created_at(b).cmp(&created_at(a)),
            Self::CreatedAtAsc => created_at(a).cmp(&created_at(b)),
            Self::LocationNameAsc => location_key(a).cmp(&location_key(b)),
            Self::LocationNameDesc => location_key(b).cmp(&location_key(a)),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortOrder {
    type Err = SceneVisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SceneVisionError::Validation(format!("unknown sort order: {s}")))
    }
}

// Unparseable timestamps sort as oldest.
fn created_at(scene: &Scene) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&scene.created_at).ok()
}

fn location_key(scene: &Scene) -> String {
    scene
        .location_name
        .as_deref()
        .unwrap_or_default()
        .to_lowercase()
}

/// Search and sort applied to a gallery listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryQuery {
    /// Case-insensitive substring matched against location, custom prompt
    /// and weather.
    #[serde(default)]
    pub search: Option<String>,
    /// Result order.
    #[serde(default)]
    pub sort: SortOrder,
}

impl GalleryQuery {
    /// Creates a query that keeps everything, newest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search term.
    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Sets the sort order.
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Returns true if `scene` matches the search term.
    pub fn matches(&self, scene: &Scene) -> bool {
        let term = match self.search.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_lowercase(),
            _ => return true,
        };
        [
            scene.location_name.as_deref().unwrap_or_default(),
            scene.custom_prompt.as_deref().unwrap_or_default(),
            scene.weather_condition.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }

    /// Filters then sorts. Ties keep their stored order.
    pub fn apply(&self, scenes: Vec<Scene>) -> Vec<Scene> {
        let mut kept: Vec<Scene> = scenes.into_iter().filter(|s| self.matches(s)).collect();
        kept.sort_by(|a, b| self.sort.compare(a, b));
        kept
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::scene::{AtmosphericEffect, Scene, SceneParameters, WeatherCondition};

    pub fn scene(id: &str, location: &str, weather: WeatherCondition, created_at: &str) -> Scene {
        let params = SceneParameters::new(location, weather).with_effect(AtmosphericEffect::Clear);
        let mut scene = Scene::generated(&params, format!("https://cdn.example.com/{id}.png"), None);
        scene.id = id.to_string();
        scene.created_at = created_at.to_string();
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::scene;
    use super::*;
    use crate::scene::{SceneParameters, WeatherCondition};

    fn sample() -> Vec<Scene> {
        let mut kyoto = scene("b", "Kyoto", WeatherCondition::Rainy, "2024-04-02T06:00:00.000Z");
        kyoto.custom_prompt = Some("cherry blossoms in the snow".into());
        vec![
            scene("c", "oslo harbour", WeatherCondition::Snowy, "2024-06-01T08:00:00.000Z"),
            kyoto,
            scene("a", "Amsterdam", WeatherCondition::Cloudy, "2024-05-01T18:00:00.000Z"),
        ]
    }

    fn ids(scenes: &[Scene]) -> Vec<&str> {
        scenes.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let sorted = GalleryQuery::new().apply(sample());
        assert_eq!(ids(&sorted), ["c", "a", "b"]);
    }

    #[test]
    fn test_sort_orders() {
        let by = |order| GalleryQuery::new().with_sort(order).apply(sample());
        assert_eq!(ids(&by(SortOrder::CreatedAtAsc)), ["b", "a", "c"]);
        assert_eq!(ids(&by(SortOrder::LocationNameAsc)), ["a", "b", "c"]);
        assert_eq!(ids(&by(SortOrder::LocationNameDesc)), ["c", "b", "a"]);
    }

    #[test]
    fn test_search_matches_location_prompt_and_weather() {
        let search = |term: &str| GalleryQuery::new().with_search(term).apply(sample());
        assert_eq!(ids(&search("KYOTO")), ["b"]);
        assert_eq!(ids(&search("snow")), ["c", "b"]);
        assert_eq!(ids(&search("cloudy")), ["a"]);
        assert!(search("lisbon").is_empty());
        assert_eq!(search("  ").len(), 3);
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(
            "locationName_asc".parse::<SortOrder>().unwrap(),
            SortOrder::LocationNameAsc
        );
        assert_eq!(SortOrder::default().to_string(), "createdAt_desc");
        assert!("newest".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_sentinel_is_not_storable() {
        let params = SceneParameters::new("Paris", WeatherCondition::Sunny);
        assert!(ensure_storable(&Scene::failed(&params)).is_err());
        assert!(ensure_storable(&Scene::generated(&params, "https://x.example/p.png", None)).is_ok());
    }
}
