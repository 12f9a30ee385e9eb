//! Scene assembly: the orchestration behind the "Generate Scene" action.
//!
//! The assembler validates parameters, composes and optionally augments the
//! prompt, asks the preview generator for an image and turns the result into
//! a [`Scene`]. Failures never escape as errors: they become the sentinel
//! scene plus an error notification. The one exception is [`Busy`], returned
//! when a generation is already running.
//!
//! [`Busy`]: SceneVisionError::Busy

use crate::error::{Result, SceneVisionError};
use crate::flows::{
    PromptAugmenter, ScenePreviewGenerator, ScenePreviewRequest, VoiceInputRequest, VoiceToImage,
};
use crate::identity::{AnonymousIdentity, IdentityProvider};
use crate::prompt::compose_scene_prompt;
use crate::scene::{Scene, SceneDescription, SceneParameters};
use crate::voice::AudioDataUri;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Where the assembler is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationState {
    /// Nothing is running, and no run has finished since the last abandoned one.
    #[default]
    Idle,
    /// A request is in flight.
    Generating,
    /// The last request produced a scene.
    Succeeded,
    /// The last request produced the sentinel scene.
    Failed,
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Normal completion.
    Info,
    /// Something went wrong.
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Short headline.
    pub title: String,
    /// One sentence of detail.
    pub description: String,
    /// Severity.
    pub level: NotificationLevel,
}

impl Notification {
    fn success() -> Self {
        Self {
            title: "Scene Generated!".into(),
            description: "Your vision is ready to view.".into(),
            level: NotificationLevel::Info,
        }
    }

    fn failure() -> Self {
        Self {
            title: "Generation Failed".into(),
            description: "Could not generate scene. Please try again.".into(),
            level: NotificationLevel::Error,
        }
    }
}

/// Result of one assembler run.
#[derive(Debug)]
pub struct SceneOutcome {
    /// The generated scene, or the sentinel on failure.
    pub scene: Scene,
    /// [`GenerationState::Succeeded`] or [`GenerationState::Failed`].
    pub state: GenerationState,
    /// What to tell the user.
    pub notification: Notification,
    /// The final prompt handed to generation, when one was built.
    pub prompt: Option<String>,
    /// True when augmentation failed and the baseline prompt was used.
    pub augmentation_fallback: bool,
    /// The error behind a failed run.
    pub failure: Option<SceneVisionError>,
}

impl SceneOutcome {
    /// Returns true if a real scene was produced.
    pub fn is_success(&self) -> bool {
        self.state == GenerationState::Succeeded
    }

    fn succeeded(scene: Scene, prompt: Option<String>, augmentation_fallback: bool) -> Self {
        Self {
            scene,
            state: GenerationState::Succeeded,
            notification: Notification::success(),
            prompt,
            augmentation_fallback,
            failure: None,
        }
    }

    fn failed(
        params: &SceneParameters,
        error: SceneVisionError,
        prompt: Option<String>,
        augmentation_fallback: bool,
    ) -> Self {
        Self {
            scene: Scene::failed(params),
            state: GenerationState::Failed,
            notification: Notification::failure(),
            prompt,
            augmentation_fallback,
            failure: Some(error),
        }
    }
}

struct Prepared {
    prompt: String,
    fallback: bool,
}

/// The single-flight permit for one request. A request dropped before it
/// finishes leaves the assembler `Idle` rather than stuck in `Generating`.
struct InFlight<'a> {
    state: &'a Mutex<GenerationState>,
    _permit: SemaphorePermit<'a>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == GenerationState::Generating {
            *state = GenerationState::Idle;
        }
    }
}

/// Orchestrates scene generation. At most one request runs at a time.
pub struct SceneAssembler {
    augmenter: Arc<dyn PromptAugmenter>,
    generator: Arc<dyn ScenePreviewGenerator>,
    voice: Option<Arc<dyn VoiceToImage>>,
    identity: Arc<dyn IdentityProvider>,
    permit: Semaphore,
    state: Mutex<GenerationState>,
}

impl SceneAssembler {
    /// Creates an assembler with an anonymous identity and no voice pipeline.
    pub fn new(
        augmenter: Arc<dyn PromptAugmenter>,
        generator: Arc<dyn ScenePreviewGenerator>,
    ) -> Self {
        Self {
            augmenter,
            generator,
            voice: None,
            identity: Arc::new(AnonymousIdentity),
            permit: Semaphore::new(1),
            state: Mutex::new(GenerationState::Idle),
        }
    }

    /// Enables [`generate_from_voice`](Self::generate_from_voice).
    pub fn with_voice(mut self, voice: Arc<dyn VoiceToImage>) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Sets who scenes are attributed to.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    /// Current state of the request cycle.
    pub fn state(&self) -> GenerationState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: GenerationState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn begin(&self) -> Result<InFlight<'_>> {
        let permit = self
            .permit
            .try_acquire()
            .map_err(|_| SceneVisionError::Busy)?;
        self.set_state(GenerationState::Generating);
        Ok(InFlight {
            state: &self.state,
            _permit: permit,
        })
    }

    /// Generates a scene from the form parameters.
    ///
    /// Returns [`SceneVisionError::Busy`] if another generation is in flight;
    /// every other failure yields the sentinel scene.
    pub async fn generate(&self, params: &SceneParameters) -> Result<SceneOutcome> {
        let _in_flight = self.begin()?;
        let started = Instant::now();

        let outcome = match params.validate() {
            Err(e) => SceneOutcome::failed(params, e, None, false),
            Ok(()) => self.run(params).await,
        };

        self.finish(&outcome, started);
        Ok(outcome)
    }

    /// Generates a scene from recorded voice instructions and the form
    /// parameters. The scene carries the transcript but no custom prompt,
    /// since the voice path never sends one to the image model.
    ///
    /// Returns [`SceneVisionError::ProviderNotAvailable`] when no voice
    /// pipeline is configured, and [`SceneVisionError::Busy`] as
    /// [`generate`](Self::generate) does.
    pub async fn generate_from_voice(
        &self,
        params: &SceneParameters,
        audio: AudioDataUri,
    ) -> Result<SceneOutcome> {
        let voice = self.voice.as_ref().ok_or_else(|| {
            SceneVisionError::ProviderNotAvailable("no voice pipeline configured".into())
        })?;
        let _in_flight = self.begin()?;
        let started = Instant::now();

        let outcome = match params.validate() {
            Err(e) => SceneOutcome::failed(params, e, None, false),
            Ok(()) => {
                let request = VoiceInputRequest::new(audio, &params.describe());
                match voice.voice_to_image(&request).await {
                    Ok(response) => {
                        let mut scene = Scene::generated(
                            params,
                            response.generated_image_url,
                            self.identity.user_id(),
                        )
                        .with_voice_transcript(response.voice_input_transcript);
                        scene.custom_prompt = None;
                        SceneOutcome::succeeded(scene, None, false)
                    }
                    Err(e) => SceneOutcome::failed(params, e, None, false),
                }
            }
        };

        self.finish(&outcome, started);
        Ok(outcome)
    }

    async fn run(&self, params: &SceneParameters) -> SceneOutcome {
        let description = params.describe();
        let prepared = self.prepare_prompt(&description).await;

        let request = ScenePreviewRequest {
            location: description.location.clone(),
            date_time: description.date_time.clone(),
            weather_condition: description.weather_condition.clone(),
            custom_prompt: Some(prepared.prompt.clone()),
            voice_input_transcript: None,
        };

        match self.generator.generate_preview(&request).await {
            Ok(response) => {
                let scene = Scene::generated(
                    params,
                    response.generated_preview_url,
                    self.identity.user_id(),
                );
                SceneOutcome::succeeded(scene, Some(prepared.prompt), prepared.fallback)
            }
            Err(e) => SceneOutcome::failed(params, e, Some(prepared.prompt), prepared.fallback),
        }
    }

    async fn prepare_prompt(&self, description: &SceneDescription) -> Prepared {
        let baseline = compose_scene_prompt(description);
        if description.custom_prompt.is_none() {
            return Prepared {
                prompt: baseline,
                fallback: false,
            };
        }

        match self.augmenter.augment(description).await {
            Ok(response) => Prepared {
                prompt: response.augmented_prompt,
                fallback: false,
            },
            Err(e) => {
                tracing::warn!(error = %e, "prompt augmentation failed, using baseline prompt");
                Prepared {
                    prompt: baseline,
                    fallback: true,
                }
            }
        }
    }

    fn finish(&self, outcome: &SceneOutcome, started: Instant) {
        self.set_state(outcome.state);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome.failure {
            None => tracing::info!(
                scene_id = %outcome.scene.id,
                elapsed_ms,
                "scene generated"
            ),
            Some(ref e) => tracing::warn!(
                category = ?e.category(),
                elapsed_ms,
                "scene generation failed: {e}"
            ),
        }
    }
}
