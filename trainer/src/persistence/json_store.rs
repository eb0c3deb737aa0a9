use super::PersistenceError;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A single JSON document on disk, rewritten wholesale on every save.
pub struct JsonDocument<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> JsonDocument<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document. Returns None if the file does not exist.
    pub fn load(&self) -> Result<Option<T>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let data = serde_json::from_str(&contents)?;
        Ok(Some(data))
    }

    /// Load the document, falling back to `T::default()` when it is missing
    /// or unreadable.
    pub fn load_or_default(&self) -> T {
        match self.load() {
            Ok(Some(data)) => data,
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!("Discarding unreadable document {:?}: {}", self.path, e);
                T::default()
            }
        }
    }

    /// Write the document through a temporary file so a crash mid-write
    /// never leaves a truncated file behind.
    pub fn save(&self, data: &T) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
