//! Full-database snapshots: metadata, persistence, and the service that
//! drives an external dump/restore utility.
//!
//! A snapshot is a whole-database artifact written by an external tool (for
//! a document store, something like `mongodump --archive`), plus a metadata
//! record tracked independently so operators can list, restore, and prune
//! snapshots without touching the artifacts directory by hand.

mod service;
mod store;
mod types;

pub use service::{CommandTemplate, SnapshotService, SnapshotServiceConfig};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use types::{DatabaseSnapshot, SnapshotStatus};

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors surfaced by snapshot operations.
///
/// A failed dump is deliberately *not* an error: scheduled unattended runs
/// must not crash the scheduler, so `create_backup` records the failure as a
/// terminal snapshot state instead. Only metadata-store and filesystem
/// faults propagate.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// A filesystem error occurred around the artifacts directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The metadata store failed.
    #[error("snapshot store error: {0}")]
    Store(#[from] StoreError),

    /// No snapshot exists with the given id.
    #[error("snapshot not found: {0}")]
    NotFound(Uuid),

    /// The snapshot cannot be restored (it recorded a failed dump).
    #[error("snapshot {id} is not restorable: {reason}")]
    NotRestorable {
        /// Id of the rejected snapshot.
        id: Uuid,
        /// Why it cannot be restored.
        reason: String,
    },

    /// The external restore utility failed.
    #[error("restore command failed: {0}")]
    Command(String),
}

/// A specialized `Result` type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;
