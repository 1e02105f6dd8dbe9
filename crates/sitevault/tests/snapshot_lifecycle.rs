//! Integration tests for the snapshot service with file-backed metadata.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use sitevault::snapshot::{
    CommandTemplate, FileSnapshotStore, SnapshotService, SnapshotServiceConfig, SnapshotStatus,
};

fn service_at(dir: &Path) -> SnapshotService<FileSnapshotStore> {
    let store = Arc::new(
        FileSnapshotStore::open(dir.join("snapshots.json")).expect("open metadata store"),
    );
    let mut config = SnapshotServiceConfig::new(
        dir,
        CommandTemplate::new("sh", ["-c", "printf 'dump contents' > {archive}"]),
        CommandTemplate::new("sh", ["-c", "test -s {archive}"]),
    );
    config.timeout = Duration::from_secs(5);
    SnapshotService::new(config, store)
}

#[tokio::test]
async fn metadata_survives_a_service_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    let first_id = {
        let service = service_at(dir.path());
        let snapshot = service.create_backup().await.expect("create");
        assert_eq!(snapshot.status, SnapshotStatus::Completed);
        snapshot.id
    };

    // A new service over the same directory sees the record.
    let service = service_at(dir.path());
    let listed = service.list_backups().expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, first_id);

    // And can restore from it.
    service.restore_backup(first_id).await.expect("restore");
}

#[tokio::test]
async fn retention_across_restarts_keeps_newest() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let service = service_at(dir.path());
        for _ in 0..3 {
            service.create_backup().await.expect("create");
        }
    }

    let service = service_at(dir.path());
    let newest = service.create_backup().await.expect("create");
    service.enforce_retention(2).await.expect("retention");

    let remaining = service.list_backups().expect("list");
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].id, newest.id);

    // Evicted artifacts are gone from disk too; kept ones remain.
    for snapshot in &remaining {
        assert!(Path::new(&snapshot.storage_location).exists());
    }
    let archives: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "archive"))
        .collect();
    assert_eq!(archives.len(), 2);
}

#[tokio::test]
async fn deleting_a_snapshot_removes_artifact_and_metadata() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = service_at(dir.path());

    let snapshot = service.create_backup().await.expect("create");
    assert!(service.delete_backup(snapshot.id).await.expect("delete"));

    assert!(!Path::new(&snapshot.storage_location).exists());
    assert!(service.list_backups().expect("list").is_empty());
}
