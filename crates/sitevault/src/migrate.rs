//! The import orchestrator: safety-net backup + apply + rollback.
//!
//! This is the closest the subsystem comes to a transaction. The apply is
//! not atomic in the database sense, but it is recoverable: any failure
//! during commit has a defined undo path, and the outcome of that undo is
//! always reported to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::archive::{read_assets, ArchiveError, Importer};
use crate::package::PackageSummary;
use crate::safety::SafetyNetService;
use crate::store::{BlobStore, ConfigStore};

/// The reported result of an orchestrated import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub success: bool,
    /// Human-readable summary of what happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Per-collection counts, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<PackageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the pre-import state was restored after a failure.
    pub restored: bool,
}

impl ImportOutcome {
    fn committed(imported: PackageSummary) -> Self {
        Self {
            success: true,
            message: Some("import completed".to_owned()),
            imported: Some(imported),
            error: None,
            restored: false,
        }
    }

    fn rejected(error: &ArchiveError) -> Self {
        Self {
            success: false,
            message: Some("archive rejected before any data was touched".to_owned()),
            imported: None,
            error: Some(error.to_string()),
            restored: false,
        }
    }
}

/// Composes the safety-net service and the importer into a single
/// recoverable operation.
pub struct ImportOrchestrator<S, B> {
    importer: Importer<S, B>,
    safety: SafetyNetService<S, B>,
    blobs: Arc<B>,
}

impl<S: ConfigStore, B: BlobStore> ImportOrchestrator<S, B> {
    /// Create an orchestrator over the given store ports.
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self {
            importer: Importer::new(store.clone(), blobs.clone()),
            safety: SafetyNetService::new(store, blobs.clone()),
            blobs,
        }
    }

    /// Validate, back up, apply; roll back on failure.
    ///
    /// Never returns an `Err`: every path, including a failed rollback,
    /// produces a reportable [`ImportOutcome`].
    pub fn execute(&self, archive_bytes: &[u8]) -> ImportOutcome {
        // Validation first: a bad archive needs no rollback point.
        if let Err(err) = self.importer.preview(archive_bytes) {
            warn!(%err, "import rejected at validation");
            return ImportOutcome::rejected(&err);
        }

        // Refuse to import without a rollback point.
        let backup = match self.safety.capture() {
            Ok(backup) => backup,
            Err(err) => {
                error!(%err, "failed to capture safety-net backup, aborting import");
                return ImportOutcome {
                    success: false,
                    message: Some(
                        "refusing to import without a safety-net backup".to_owned(),
                    ),
                    imported: None,
                    error: Some(err.to_string()),
                    restored: false,
                };
            }
        };

        match self.importer.apply_archive(archive_bytes) {
            Ok(counts) => {
                info!(collections = ?counts, "import committed");
                ImportOutcome::committed(counts)
            }
            Err(apply_err) => {
                warn!(%apply_err, "import failed partway, restoring safety-net backup");
                self.remove_imported_assets(archive_bytes);
                match self.safety.restore(&backup) {
                    Ok(()) => ImportOutcome {
                        success: false,
                        message: Some("import failed, previous state restored".to_owned()),
                        imported: None,
                        error: Some(apply_err.to_string()),
                        restored: true,
                    },
                    Err(restore_err) => {
                        // The one unrecoverable state: surface it loudly.
                        error!(
                            %apply_err,
                            %restore_err,
                            "rollback failed, store may be half-migrated"
                        );
                        ImportOutcome {
                            success: false,
                            message: Some(
                                "import failed and rollback also failed; manual intervention required"
                                    .to_owned(),
                            ),
                            imported: None,
                            error: Some(format!(
                                "import error: {apply_err}; rollback error: {restore_err}"
                            )),
                            restored: false,
                        }
                    }
                }
            }
        }
    }

    /// Drop the blobs a failed apply already wrote; the safety-net restore
    /// then re-puts whichever of them existed before the import. Best-effort,
    /// since a leaked blob is better than an aborted rollback.
    fn remove_imported_assets(&self, archive_bytes: &[u8]) {
        let Ok(assets) = read_assets(archive_bytes) else {
            return;
        };
        for (name, _) in assets {
            if let Err(err) = self.blobs.delete(&name) {
                warn!(asset = %name, %err, "could not remove asset from failed import");
            }
        }
    }
}
