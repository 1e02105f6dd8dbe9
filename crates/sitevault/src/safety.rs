//! Safety-net backups: short-lived, archive-based rollback points.
//!
//! Unlike database snapshots these never hit an external utility: they reuse
//! the archive machinery, scoped to exactly the collections an import is
//! about to overwrite, so taking one is fast and needs nothing but the store
//! ports. Exactly one exists per in-flight import; it lives on the
//! orchestrator's stack and is dropped when the import commits or after
//! rollback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::archive::{ArchiveResult, Exporter, Importer};
use crate::store::{BlobStore, ConfigStore};

/// An in-memory archive of the pre-import state of every collection.
pub struct SafetyNetBackup {
    /// Opaque token identifying this backup in logs.
    pub id: Uuid,
    /// The zipped archive of the captured state.
    pub archive_bytes: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Captures and restores safety-net backups.
pub struct SafetyNetService<S, B> {
    exporter: Exporter<S, B>,
    importer: Importer<S, B>,
}

impl<S: ConfigStore, B: BlobStore> SafetyNetService<S, B> {
    /// Create a service over the given store ports.
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self {
            exporter: Exporter::new(store.clone(), blobs.clone(), "safety-net"),
            importer: Importer::new(store, blobs),
        }
    }

    /// Snapshot the current state of every in-scope collection.
    pub fn capture(&self) -> ArchiveResult<SafetyNetBackup> {
        let backup = SafetyNetBackup {
            id: Uuid::new_v4(),
            archive_bytes: self.exporter.export_to_archive()?,
            created_at: Utc::now(),
        };
        info!(backup_id = %backup.id, size_bytes = backup.archive_bytes.len(), "captured safety-net backup");
        Ok(backup)
    }

    /// Re-apply a captured backup, replacing whatever a partial import left
    /// behind. Only called on the failure path.
    ///
    /// Skips the structural validation an inbound archive goes through: the
    /// captured state is whatever the store held, orphan references
    /// included, and refusing to put it back would strand the rollback.
    pub fn restore(&self, backup: &SafetyNetBackup) -> ArchiveResult<()> {
        self.importer.restore_archive(&backup.archive_bytes)?;
        info!(backup_id = %backup.id, "restored safety-net backup");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PageBody, Setting, SettingValue};
    use crate::store::{ConfigStore, MemoryStore};
    use chrono::TimeZone;

    #[test]
    fn capture_then_restore_round_trips_state() {
        let store = Arc::new(MemoryStore::new());
        store
            .replace_settings(vec![Setting {
                key: "siteTitle".into(),
                value: SettingValue::Text("Before".into()),
            }])
            .unwrap();

        let service = SafetyNetService::new(store.clone(), store.clone());
        let backup = service.capture().unwrap();

        // Clobber the live state, then roll back.
        store
            .replace_settings(vec![Setting {
                key: "siteTitle".into(),
                value: SettingValue::Text("After".into()),
            }])
            .unwrap();
        service.restore(&backup).unwrap();

        let settings = store.settings().unwrap();
        assert_eq!(settings[0].value, SettingValue::Text("Before".into()));
    }

    #[test]
    fn restore_accepts_dangling_references_in_the_captured_state() {
        // The store enforces no referential integrity, so the pre-import
        // state can contain a page body whose navigation entry was deleted.
        // Rollback has to put that state back verbatim.
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .replace_page_bodies(vec![PageBody {
                id: "page-orphan".into(),
                navigation_id: "nav-gone".into(),
                content: "<p>kept</p>".into(),
                created_at: ts,
                updated_at: ts,
            }])
            .unwrap();

        let service = SafetyNetService::new(store.clone(), store.clone());
        let backup = service.capture().unwrap();

        store.replace_page_bodies(Vec::new()).unwrap();
        service.restore(&backup).unwrap();

        let bodies = store.page_bodies().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].navigation_id, "nav-gone");
    }
}
