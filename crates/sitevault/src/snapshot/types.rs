//! Metadata types for full-database snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal state of a snapshot attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    /// The dump completed and the artifact is usable for restore.
    Completed,
    /// The dump failed; the record is kept so operators can inspect it.
    Failed,
}

/// Metadata for one full-database backup attempt.
///
/// Immutable once persisted: a failed attempt still produces a terminal
/// record, and there is no partial-update path. `error` is present exactly
/// when `status` is [`SnapshotStatus::Failed`]; the constructors enforce
/// this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSnapshot {
    /// Globally unique, generated at the start of the attempt.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Opaque path of the artifact.
    pub storage_location: String,
    pub size_bytes: u64,
    pub status: SnapshotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DatabaseSnapshot {
    /// Record a completed snapshot.
    pub fn completed(
        id: Uuid,
        created_at: DateTime<Utc>,
        storage_location: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            id,
            created_at,
            storage_location: storage_location.into(),
            size_bytes,
            status: SnapshotStatus::Completed,
            error: None,
        }
    }

    /// Record a failed snapshot attempt with the captured error text.
    pub fn failed(
        id: Uuid,
        created_at: DateTime<Utc>,
        storage_location: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id,
            created_at,
            storage_location: storage_location.into(),
            size_bytes: 0,
            status: SnapshotStatus::Failed,
            error: Some(error.into()),
        }
    }

    /// Whether this snapshot can be used for restore.
    pub fn is_completed(&self) -> bool {
        self.status == SnapshotStatus::Completed
    }
}
