//! Persistence for snapshot metadata records.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use uuid::Uuid;

use super::DatabaseSnapshot;
use crate::store::{StoreError, StoreResult};

/// Data access for [`DatabaseSnapshot`] metadata records.
///
/// Records are independent from the snapshot artifacts themselves, which
/// live wherever the dump utility wrote them.
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot record.
    fn save(&self, snapshot: &DatabaseSnapshot) -> StoreResult<()>;

    /// Fetch a record by id.
    fn get(&self, id: Uuid) -> StoreResult<Option<DatabaseSnapshot>>;

    /// Remove a record; returns whether it existed.
    fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// All records, in no particular order.
    fn list(&self) -> StoreResult<Vec<DatabaseSnapshot>>;
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("snapshot store lock poisoned")
}

/// In-memory snapshot store for tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    records: RwLock<Vec<DatabaseSnapshot>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &DatabaseSnapshot) -> StoreResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.retain(|r| r.id != snapshot.id);
        records.push(snapshot.clone());
        Ok(())
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<DatabaseSnapshot>> {
        Ok(self.records.read().map_err(poisoned)?.iter().find(|r| r.id == id).cloned())
    }

    fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() < before)
    }

    fn list(&self) -> StoreResult<Vec<DatabaseSnapshot>> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }
}

/// Snapshot store backed by a single JSON metadata file.
///
/// The whole record set is rewritten on every mutation. Snapshot churn is a
/// handful of records per day, so this stays trivially fast and keeps the
/// metadata human-inspectable next to the artifacts.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    records: RwLock<Vec<DatabaseSnapshot>>,
}

impl FileSnapshotStore {
    /// Open (or create) the metadata file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, records: RwLock::new(records) })
    }

    fn persist(&self, records: &[DatabaseSnapshot]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // Write-then-rename so a crash mid-write cannot leave a truncated
        // file behind; rename within a directory is atomic.
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &DatabaseSnapshot) -> StoreResult<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.retain(|r| r.id != snapshot.id);
        records.push(snapshot.clone());
        self.persist(&records)
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<DatabaseSnapshot>> {
        Ok(self.records.read().map_err(poisoned)?.iter().find(|r| r.id == id).cloned())
    }

    fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(poisoned)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        let removed = records.len() < before;
        if removed {
            self.persist(&records)?;
        }
        Ok(removed)
    }

    fn list(&self) -> StoreResult<Vec<DatabaseSnapshot>> {
        Ok(self.records.read().map_err(poisoned)?.clone())
    }
}
