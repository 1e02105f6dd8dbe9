//! Persistence for the single schedule configuration document.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use super::ScheduleConfig;
use crate::store::{StoreError, StoreResult};

/// Data access for the at-most-one [`ScheduleConfig`] document.
pub trait ScheduleStore: Send + Sync {
    /// Load the configuration, if one has been saved.
    fn load(&self) -> StoreResult<Option<ScheduleConfig>>;

    /// Save (create or overwrite) the configuration.
    fn save(&self, config: &ScheduleConfig) -> StoreResult<()>;
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("schedule store lock poisoned")
}

/// In-memory schedule store for tests.
#[derive(Debug, Default)]
pub struct MemoryScheduleStore {
    config: RwLock<Option<ScheduleConfig>>,
}

impl MemoryScheduleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with a configuration.
    pub fn with_config(config: ScheduleConfig) -> Self {
        Self { config: RwLock::new(Some(config)) }
    }
}

impl ScheduleStore for MemoryScheduleStore {
    fn load(&self) -> StoreResult<Option<ScheduleConfig>> {
        Ok(self.config.read().map_err(poisoned)?.clone())
    }

    fn save(&self, config: &ScheduleConfig) -> StoreResult<()> {
        *self.config.write().map_err(poisoned)? = Some(config.clone());
        Ok(())
    }
}

/// Schedule store backed by a single JSON document on disk.
#[derive(Debug)]
pub struct FileScheduleStore {
    path: PathBuf,
}

impl FileScheduleStore {
    /// Create a store persisting to `path`. The file is created on first
    /// save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ScheduleStore for FileScheduleStore {
    fn load(&self) -> StoreResult<Option<ScheduleConfig>> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, config: &ScheduleConfig) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(config)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // Write-then-rename so a crash mid-write cannot leave a truncated
        // file behind; rename within a directory is atomic.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
