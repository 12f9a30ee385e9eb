use super::{ensure_storable, SceneRepository};
use crate::error::Result;
use crate::scene::Scene;
use std::sync::Mutex;

/// Gallery kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryGallery {
    scenes: Mutex<Vec<Scene>>,
}

impl MemoryGallery {
    /// Creates an empty gallery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gallery holding `scenes`, already newest first.
    pub fn with_scenes(scenes: Vec<Scene>) -> Self {
        Self {
            scenes: Mutex::new(scenes),
        }
    }
}

impl SceneRepository for MemoryGallery {
    fn prepend(&self, scene: Scene) -> Result<()> {
        ensure_storable(&scene)?;
        let mut scenes = self.scenes.lock().unwrap_or_else(|e| e.into_inner());
        scenes.insert(0, scene);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Scene>> {
        Ok(self.scenes.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut scenes = self.scenes.lock().unwrap_or_else(|e| e.into_inner());
        let before = scenes.len();
        scenes.retain(|s| s.id != id);
        Ok(scenes.len() != before)
    }
}
