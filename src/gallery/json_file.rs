use super::{ensure_storable, SceneRepository};
use crate::error::Result;
use crate::scene::Scene;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Gallery persisted as a single JSON array on disk.
///
/// Every mutation rewrites the whole file through a sibling temp file and a
/// rename, so readers never see a half-written gallery.
#[derive(Debug)]
pub struct JsonFileGallery {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileGallery {
    /// Opens (lazily) the gallery at `path`. A missing file is an empty gallery.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the gallery file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Scene>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, scenes: &[Scene]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, serde_json::to_vec_pretty(scenes)?)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), scenes = scenes.len(), "gallery saved");
        Ok(())
    }
}

impl SceneRepository for JsonFileGallery {
    fn prepend(&self, scene: Scene) -> Result<()> {
        ensure_storable(&scene)?;
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut scenes = self.read()?;
        scenes.insert(0, scene);
        self.write(&scenes)
    }

    fn list(&self) -> Result<Vec<Scene>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read()
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut scenes = self.read()?;
        let before = scenes.len();
        scenes.retain(|s| s.id != id);
        if scenes.len() == before {
            return Ok(false);
        }
        self.write(&scenes)?;
        Ok(true)
    }
}
