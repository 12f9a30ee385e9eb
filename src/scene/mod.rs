//! Scene parameters and scene records.

mod types;

pub(crate) use types::validate_fields;
pub use types::{
    is_displayable_url, AtmosphericEffect, Scene, SceneDescription, SceneParameters,
    WeatherCondition, FAILED_SCENE_ID, GENERATION_FAILED_PLACEHOLDER_URL,
    SOURCE_IMAGE_PLACEHOLDER_URL,
};
