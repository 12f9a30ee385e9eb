//! Prompt composition from structured scene fields.
//!
//! Every function here is pure: identical input yields byte-identical text.

use crate::flows::ScenePreviewRequest;
use crate::scene::SceneDescription;

/// System instruction for the prompt augmentation model.
pub const AUGMENTATION_SYSTEM_PROMPT: &str =
    "You are an AI assistant that refines scene generation prompts based on user input.";

/// Baseline prompt describing the scene.
///
/// `Location: …, Date and Time: …, Weather: …, Effects: a, b.` with the
/// custom instructions appended when present.
pub fn compose_scene_prompt(scene: &SceneDescription) -> String {
    let mut prompt = format!(
        "Location: {}, Date and Time: {}, Weather: {}, Effects: {}.",
        scene.location,
        scene.date_time,
        scene.weather_condition,
        scene.atmospheric_effects.join(", "),
    );
    if let Some(custom) = non_blank(scene.custom_prompt.as_deref()) {
        prompt.push_str(&format!(" Custom instructions: {custom}."));
    }
    prompt
}

/// Scene prompt for the voice path, combining the fields with a transcript.
pub fn compose_voice_prompt(scene: &SceneDescription, transcript: &str) -> String {
    format!(
        "Create a scene of {} on {} in {} with {}. Voice input details: {}",
        scene.location,
        scene.date_time,
        scene.weather_condition,
        scene.atmospheric_effects.join(", "),
        transcript.trim(),
    )
}

/// Instruction asking a language model to write one richer image prompt.
pub fn compose_augmentation_prompt(scene: &SceneDescription) -> String {
    format!(
        "Take the following scene parameters and generate a comprehensive prompt for image \
         generation. Incorporate any custom instructions provided by the user to create a more \
         specific and personalized preview.\n\n\
         Location: {}\n\
         Date and Time: {}\n\
         Weather Condition: {}\n\
         Atmospheric Effects: {}\n\
         Custom Instructions: {}\n\n\
         Compose a detailed prompt that leverages the above information to generate a realistic \
         and visually compelling scene preview. Reply with the prompt only.",
        scene.location,
        scene.date_time,
        scene.weather_condition,
        scene.atmospheric_effects.join(", "),
        non_blank(scene.custom_prompt.as_deref()).unwrap_or(""),
    )
}

/// Final prompt sent to the image provider on the default path.
pub fn compose_preview_prompt(request: &ScenePreviewRequest) -> String {
    let mut segments = vec![
        "Photorealistic scene.".to_string(),
        format!("Location: {}.", request.location),
        format!("Date and Time: {}.", request.date_time),
        format!("Weather: {}.", request.weather_condition),
    ];
    if let Some(details) = non_blank(request.custom_prompt.as_deref()) {
        segments.push(format!("Details: {details}"));
        terminate(segments.last_mut());
    }
    if let Some(voice) = non_blank(request.voice_input_transcript.as_deref()) {
        segments.push(format!("Voice instructions: {voice}"));
        terminate(segments.last_mut());
    }
    segments.push("Highly detailed and visually appealing.".to_string());
    segments.join(" ")
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

// Avoids "..": augmented prompts usually end with their own period.
fn terminate(segment: Option<&mut String>) {
    if let Some(s) = segment {
        if !s.ends_with(['.', '!', '?']) {
            s.push('.');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> SceneDescription {
        SceneDescription {
            location: "Eiffel Tower, Paris".into(),
            date_time: "2024-05-01 18:00".into(),
            weather_condition: "Sunny".into(),
            atmospheric_effects: vec!["Golden Hour".into(), "Hazy".into()],
            custom_prompt: None,
        }
    }

    #[test]
    fn test_scene_prompt_template() {
        assert_eq!(
            compose_scene_prompt(&paris()),
            "Location: Eiffel Tower, Paris, Date and Time: 2024-05-01 18:00, Weather: Sunny, \
             Effects: Golden Hour, Hazy."
        );
    }

    #[test]
    fn test_scene_prompt_keeps_effect_order() {
        let mut scene = paris();
        scene.atmospheric_effects = vec!["Starry Night".into(), "Clear".into(), "Misty".into()];
        let prompt = compose_scene_prompt(&scene);

        let positions: Vec<usize> = scene
            .atmospheric_effects
            .iter()
            .map(|e| prompt.find(e.as_str()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("Eiffel Tower, Paris"));
        assert!(prompt.contains("Sunny"));
    }

    #[test]
    fn test_scene_prompt_with_custom_instructions() {
        let mut scene = paris();
        scene.custom_prompt = Some("Impressionist style".into());
        assert!(compose_scene_prompt(&scene).ends_with("Custom instructions: Impressionist style."));
    }

    #[test]
    fn test_scene_prompt_empty_effects() {
        let mut scene = paris();
        scene.atmospheric_effects.clear();
        assert!(compose_scene_prompt(&scene).ends_with("Weather: Sunny, Effects: ."));
    }

    #[test]
    fn test_scene_prompt_is_deterministic() {
        let scene = paris();
        assert_eq!(compose_scene_prompt(&scene), compose_scene_prompt(&scene.clone()));
    }

    #[test]
    fn test_voice_prompt() {
        let prompt = compose_voice_prompt(&paris(), "  add a street artist  ");
        assert_eq!(
            prompt,
            "Create a scene of Eiffel Tower, Paris on 2024-05-01 18:00 in Sunny with Golden Hour, \
             Hazy. Voice input details: add a street artist"
        );
    }

    #[test]
    fn test_augmentation_prompt_includes_fields() {
        let mut scene = paris();
        scene.custom_prompt = Some("Impressionist style".into());
        let prompt = compose_augmentation_prompt(&scene);
        assert!(prompt.contains("Location: Eiffel Tower, Paris\n"));
        assert!(prompt.contains("Atmospheric Effects: Golden Hour, Hazy\n"));
        assert!(prompt.contains("Custom Instructions: Impressionist style\n"));
    }

    #[test]
    fn test_preview_prompt_without_optional_segments() {
        let request = ScenePreviewRequest {
            location: "Kyoto".into(),
            date_time: "2024-04-02 06:00".into(),
            weather_condition: "Foggy".into(),
            custom_prompt: None,
            voice_input_transcript: Some("   ".into()),
        };
        assert_eq!(
            compose_preview_prompt(&request),
            "Photorealistic scene. Location: Kyoto. Date and Time: 2024-04-02 06:00. \
             Weather: Foggy. Highly detailed and visually appealing."
        );
    }

    #[test]
    fn test_preview_prompt_with_details_and_voice() {
        let request = ScenePreviewRequest {
            location: "Kyoto".into(),
            date_time: "06:00".into(),
            weather_condition: "Rainy".into(),
            custom_prompt: Some("A temple garden in soft rain.".into()),
            voice_input_transcript: Some("add lanterns".into()),
        };
        let prompt = compose_preview_prompt(&request);
        assert!(prompt.contains("Details: A temple garden in soft rain. Voice"));
        assert!(prompt.contains("Voice instructions: add lanterns. Highly"));
    }
}
