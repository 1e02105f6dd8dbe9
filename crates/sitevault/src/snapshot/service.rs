//! The snapshot service: drives the external dump/restore utility and
//! enforces the retention policy.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::SnapshotStore;
use super::types::DatabaseSnapshot;
use super::{SnapshotError, SnapshotResult};

/// Placeholder in command templates replaced with the artifact path.
pub const ARCHIVE_PLACEHOLDER: &str = "{archive}";

/// An external command with `{archive}` placeholders.
///
/// For a document store this would be something like
/// `mongodump --archive={archive} --gzip` and its restore counterpart.
#[derive(Debug, Clone)]
pub struct CommandTemplate {
    /// Program to execute.
    pub program: String,
    /// Arguments; any occurrence of [`ARCHIVE_PLACEHOLDER`] is substituted.
    pub args: Vec<String>,
}

impl CommandTemplate {
    /// Create a template.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { program: program.into(), args: args.into_iter().map(Into::into).collect() }
    }

    fn materialize(&self, artifact: &Path) -> (String, Vec<String>) {
        let path = artifact.display().to_string();
        let substitute = |s: &String| s.replace(ARCHIVE_PLACEHOLDER, &path);
        (substitute(&self.program), self.args.iter().map(substitute).collect())
    }
}

/// Configuration for [`SnapshotService`].
#[derive(Debug, Clone)]
pub struct SnapshotServiceConfig {
    /// Directory the snapshot artifacts are written to.
    pub backup_dir: PathBuf,
    /// Command that dumps the live store to `{archive}`.
    pub dump_command: CommandTemplate,
    /// Command that restores the live store from `{archive}`.
    pub restore_command: CommandTemplate,
    /// Bound on a single dump/restore invocation; the process is killed on
    /// expiry. A hung external utility must never hang a request or a
    /// scheduler tick indefinitely.
    pub timeout: Duration,
}

impl SnapshotServiceConfig {
    /// Default invocation timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

    /// Config with the default timeout.
    pub fn new(
        backup_dir: impl Into<PathBuf>,
        dump_command: CommandTemplate,
        restore_command: CommandTemplate,
    ) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            dump_command,
            restore_command,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Creates, lists, restores, and prunes full-database snapshots.
pub struct SnapshotService<M> {
    config: SnapshotServiceConfig,
    store: Arc<M>,
}

impl<M: SnapshotStore> SnapshotService<M> {
    /// Create a service over the given metadata store.
    pub fn new(config: SnapshotServiceConfig, store: Arc<M>) -> Self {
        Self { config, store }
    }

    /// Run the dump utility and persist a terminal metadata record.
    ///
    /// A dump failure (non-zero exit, spawn error, timeout) is *not* an
    /// `Err`: it produces a persisted record with
    /// [`SnapshotStatus::Failed`](super::SnapshotStatus::Failed) so that
    /// unattended scheduled runs keep running and operators can inspect the
    /// failure later. Only filesystem and metadata-store faults propagate.
    pub async fn create_backup(&self) -> SnapshotResult<DatabaseSnapshot> {
        tokio::fs::create_dir_all(&self.config.backup_dir).await?;

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let artifact = self.config.backup_dir.join(format!("{id}.archive"));
        let location = artifact.display().to_string();

        let snapshot = match self.run_command(&self.config.dump_command, &artifact).await {
            Ok(()) => match tokio::fs::metadata(&artifact).await {
                Ok(meta) => {
                    info!(%id, size_bytes = meta.len(), "database snapshot completed");
                    DatabaseSnapshot::completed(id, created_at, location, meta.len())
                }
                Err(err) => DatabaseSnapshot::failed(
                    id,
                    created_at,
                    location,
                    format!("dump reported success but artifact is missing: {err}"),
                ),
            },
            Err(cause) => {
                warn!(%id, error = %cause, "database dump failed");
                // Drop any partial artifact so it can't be mistaken for a
                // usable snapshot.
                if let Err(err) = tokio::fs::remove_file(&artifact).await {
                    if err.kind() != io::ErrorKind::NotFound {
                        warn!(%id, %err, "could not remove partial snapshot artifact");
                    }
                }
                DatabaseSnapshot::failed(id, created_at, location, cause)
            }
        };

        self.store.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Run the restore utility against a completed snapshot's artifact.
    ///
    /// Destructive: drops and replaces all live data. Only ever called from
    /// an explicit administrative action, never from the scheduler.
    pub async fn restore_backup(&self, id: Uuid) -> SnapshotResult<()> {
        let snapshot = self.store.get(id)?.ok_or(SnapshotError::NotFound(id))?;
        if !snapshot.is_completed() {
            return Err(SnapshotError::NotRestorable {
                id,
                reason: snapshot.error.unwrap_or_else(|| "dump did not complete".to_owned()),
            });
        }

        let artifact = PathBuf::from(&snapshot.storage_location);
        self.run_command(&self.config.restore_command, &artifact)
            .await
            .map_err(SnapshotError::Command)?;

        info!(%id, "database snapshot restored");
        Ok(())
    }

    /// Delete a snapshot's artifact (best-effort) and its metadata record
    /// (always). Returns `false` if no record existed.
    pub async fn delete_backup(&self, id: Uuid) -> SnapshotResult<bool> {
        let Some(snapshot) = self.store.get(id)? else {
            return Ok(false);
        };

        // The artifact may already be gone; metadata removal must still
        // happen or we leak orphan records.
        if let Err(err) = tokio::fs::remove_file(&snapshot.storage_location).await {
            if err.kind() == io::ErrorKind::NotFound {
                warn!(%id, location = %snapshot.storage_location, "snapshot artifact already missing");
            } else {
                warn!(%id, %err, "could not delete snapshot artifact");
            }
        }

        self.store.delete(id)?;
        info!(%id, "snapshot deleted");
        Ok(true)
    }

    /// All snapshots, newest first; ties broken by id for determinism.
    pub fn list_backups(&self) -> SnapshotResult<Vec<DatabaseSnapshot>> {
        let mut snapshots = self.store.list()?;
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(snapshots)
    }

    /// Keep the `keep` most recent completed snapshots, delete the rest.
    ///
    /// Failed snapshots are never counted against the limit and never
    /// auto-deleted. Individual deletion failures are logged and skipped so
    /// one bad artifact cannot stall eviction.
    pub async fn enforce_retention(&self, keep: usize) -> SnapshotResult<()> {
        let completed: Vec<_> =
            self.list_backups()?.into_iter().filter(DatabaseSnapshot::is_completed).collect();

        for snapshot in completed.iter().skip(keep) {
            if let Err(err) = self.delete_backup(snapshot.id).await {
                warn!(id = %snapshot.id, %err, "retention eviction failed for snapshot, skipping");
            }
        }

        Ok(())
    }
}

impl<M> SnapshotService<M> {
    /// Run one external command with the configured timeout; the process is
    /// killed if it exceeds it. Returns captured stderr as the error text.
    async fn run_command(
        &self,
        template: &CommandTemplate,
        artifact: &Path,
    ) -> Result<(), String> {
        let (program, args) = template.materialize(artifact);

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| format!("failed to spawn {program}: {err}"))?;

        // Drain stderr concurrently so a chatty utility cannot deadlock on a
        // full pipe.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut pipe) = stderr {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let status = tokio::select! {
            status = child.wait() => {
                status.map_err(|err| format!("failed to wait for {program}: {err}"))?
            }
            () = tokio::time::sleep(self.config.timeout) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(format!(
                    "{program} timed out after {}s and was killed",
                    self.config.timeout.as_secs()
                ));
            }
        };

        if status.success() {
            Ok(())
        } else {
            let stderr_text = stderr_task.await.unwrap_or_default();
            Err(format!(
                "{program} exited with {status}: {}",
                String::from_utf8_lossy(&stderr_text).trim()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::store::MemorySnapshotStore;
    use crate::snapshot::SnapshotStatus;

    fn sh(script: &str) -> CommandTemplate {
        CommandTemplate::new("sh", ["-c", script])
    }

    fn service(dir: &Path, dump: &str, restore: &str) -> SnapshotService<MemorySnapshotStore> {
        let mut config = SnapshotServiceConfig::new(dir, sh(dump), sh(restore));
        config.timeout = Duration::from_secs(5);
        SnapshotService::new(config, Arc::new(MemorySnapshotStore::new()))
    }

    #[tokio::test]
    async fn successful_dump_records_completed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "printf data > {archive}", "true");

        let snapshot = service.create_backup().await.unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Completed);
        assert_eq!(snapshot.size_bytes, 4);
        assert!(Path::new(&snapshot.storage_location).exists());
    }

    #[tokio::test]
    async fn failing_dump_records_failed_snapshot_without_erroring() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "echo nope >&2; exit 3", "true");

        let snapshot = service.create_backup().await.unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Failed);
        assert!(snapshot.error.as_deref().unwrap().contains("nope"));
        // The failed attempt is still a persisted terminal record.
        assert_eq!(service.list_backups().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn hung_dump_is_killed_and_recorded_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config =
            SnapshotServiceConfig::new(dir.path(), sh("sleep 30"), sh("true"));
        config.timeout = Duration::from_millis(200);
        let service = SnapshotService::new(config, Arc::new(MemorySnapshotStore::new()));

        let snapshot = service.create_backup().await.unwrap();
        assert_eq!(snapshot.status, SnapshotStatus::Failed);
        assert!(snapshot.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn restore_rejects_failed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "exit 1", "true");

        let snapshot = service.create_backup().await.unwrap();
        match service.restore_backup(snapshot.id).await {
            Err(SnapshotError::NotRestorable { id, .. }) => assert_eq!(id, snapshot.id),
            other => panic!("expected NotRestorable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn restore_runs_against_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "printf data > {archive}", "test -s {archive}");

        let snapshot = service.create_backup().await.unwrap();
        service.restore_backup(snapshot.id).await.unwrap();
    }

    #[tokio::test]
    async fn restore_of_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "true", "true");

        match service.restore_backup(Uuid::new_v4()).await {
            Err(SnapshotError::NotFound(_)) => (),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_removes_metadata_even_when_artifact_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "printf data > {archive}", "true");

        let snapshot = service.create_backup().await.unwrap();
        tokio::fs::remove_file(&snapshot.storage_location).await.unwrap();

        assert!(service.delete_backup(snapshot.id).await.unwrap());
        assert!(service.list_backups().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_reports_not_found_result() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "true", "true");
        assert!(!service.delete_backup(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "printf data > {archive}", "true");

        let first = service.create_backup().await.unwrap();
        let second = service.create_backup().await.unwrap();

        let listed = service.list_backups().unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn retention_keeps_n_most_recent_completed_and_ignores_failed() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), "printf data > {archive}", "true");

        let oldest = service.create_backup().await.unwrap();
        let kept_a = service.create_backup().await.unwrap();
        let kept_b = service.create_backup().await.unwrap();

        // A failed attempt in between must neither count nor be evicted.
        let failing = SnapshotService::new(
            SnapshotServiceConfig::new(dir.path(), sh("exit 1"), sh("true")),
            Arc::clone(&service.store),
        );
        let failed = failing.create_backup().await.unwrap();

        service.enforce_retention(2).await.unwrap();

        let remaining = service.list_backups().unwrap();
        let ids: Vec<Uuid> = remaining.iter().map(|s| s.id).collect();
        assert!(ids.contains(&kept_a.id));
        assert!(ids.contains(&kept_b.id));
        assert!(ids.contains(&failed.id));
        assert!(!ids.contains(&oldest.id));
        assert!(!Path::new(&oldest.storage_location).exists());
    }
}
