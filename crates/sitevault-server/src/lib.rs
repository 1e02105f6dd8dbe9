//! HTTP surface for the SiteVault configuration backup & migration engine.
//!
//! Thin routing glue over the `sitevault` library: export/import of
//! configuration archives, snapshot administration, and the backup
//! schedule. All responses are structured JSON (or archive bytes for the
//! export download), never raw stack traces.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

use sitevault::archive::{Exporter, Importer};
use sitevault::migrate::ImportOrchestrator;
use sitevault::package::PackageSummary;
use sitevault::schedule::{FileScheduleStore, ScheduleConfig, ScheduleStore, SnapshotScheduler};
use sitevault::snapshot::{FileSnapshotStore, SnapshotError, SnapshotService};
use sitevault::store::MemoryStore;

/// Shared application state.
pub struct AppState {
    /// The configuration document store (and blob store) behind the ports.
    pub store: Arc<MemoryStore>,
    /// Snapshot service over the artifacts directory.
    pub snapshots: Arc<SnapshotService<FileSnapshotStore>>,
    /// The process-wide scheduler.
    pub scheduler: SnapshotScheduler<FileSnapshotStore, FileScheduleStore>,
    /// Persistence for the schedule configuration document.
    pub schedule_store: Arc<FileScheduleStore>,
    /// Stamped into exported manifests.
    pub source_identifier: String,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/config/export", get(export_config))
        .route("/api/config/import", post(import_config))
        .route("/api/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/api/snapshots/schedule", get(get_schedule).put(put_schedule))
        .route("/api/snapshots/:id/restore", post(restore_snapshot))
        .route("/api/snapshots/:id", delete(delete_snapshot))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "success": false, "error": message.into() }))).into_response()
}

/// `GET /api/config/export` — download the configuration archive.
pub async fn export_config(State(state): State<Arc<AppState>>) -> Response {
    let exporter = Exporter::new(
        state.store.clone(),
        state.store.clone(),
        state.source_identifier.clone(),
    );

    match exporter.export_to_archive() {
        Ok(bytes) => {
            let filename =
                format!("site-config-{}.zip", Utc::now().format("%Y%m%dT%H%M%SZ"));
            (
                [
                    (header::CONTENT_TYPE, "application/zip".to_owned()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) => {
            warn!(%err, "configuration export failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Flags for the import endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ImportFlags {
    /// Validate only, touch nothing.
    #[serde(default)]
    pub preview: bool,
    /// Must be `true` for a non-preview import; guards against accidental
    /// destructive calls.
    #[serde(default)]
    pub confirmed: bool,
}

/// What `preview` reports back to the caller.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PackageSummary>,
}

/// `POST /api/config/import?preview=&confirmed=` — preview or commit an
/// archive upload.
pub async fn import_config(
    State(state): State<Arc<AppState>>,
    Query(flags): Query<ImportFlags>,
    body: Bytes,
) -> Response {
    if flags.preview {
        let importer = Importer::new(state.store.clone(), state.store.clone());
        let report = match importer.preview(&body) {
            Ok(preview) => PreviewReport {
                valid: true,
                error: None,
                schema_version: Some(preview.package.schema_version),
                source_identifier: Some(preview.package.source_identifier.clone()),
                summary: Some(preview.package.summary.clone()),
            },
            Err(err) => PreviewReport {
                valid: false,
                error: Some(err.to_string()),
                schema_version: None,
                source_identifier: None,
                summary: None,
            },
        };
        return Json(report).into_response();
    }

    if !flags.confirmed {
        return json_error(
            StatusCode::BAD_REQUEST,
            "import requires confirmed=true; nothing was changed",
        );
    }

    let orchestrator = ImportOrchestrator::new(state.store.clone(), state.store.clone());
    let outcome = orchestrator.execute(&body);
    let status =
        if outcome.success { StatusCode::OK } else { StatusCode::INTERNAL_SERVER_ERROR };
    (status, Json(outcome)).into_response()
}

/// `GET /api/snapshots` — all snapshots, newest first.
pub async fn list_snapshots(State(state): State<Arc<AppState>>) -> Response {
    match state.snapshots.list_backups() {
        Ok(snapshots) => Json(snapshots).into_response(),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// `POST /api/snapshots` — trigger a backup now.
pub async fn create_snapshot(State(state): State<Arc<AppState>>) -> Response {
    match state.snapshots.create_backup().await {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// `POST /api/snapshots/:id/restore` — destructive, admin-only restore.
pub async fn restore_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.snapshots.restore_backup(id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(SnapshotError::NotFound(id)) => {
            json_error(StatusCode::NOT_FOUND, format!("snapshot not found: {id}"))
        }
        Err(err @ SnapshotError::NotRestorable { .. }) => {
            json_error(StatusCode::CONFLICT, err.to_string())
        }
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// `DELETE /api/snapshots/:id`.
pub async fn delete_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.snapshots.delete_backup(id).await {
        Ok(true) => Json(json!({ "success": true })).into_response(),
        Ok(false) => json_error(StatusCode::NOT_FOUND, format!("snapshot not found: {id}")),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// `GET /api/snapshots/schedule` — the stored configuration, or the
/// disabled default when none was ever saved.
pub async fn get_schedule(State(state): State<Arc<AppState>>) -> Response {
    match state.schedule_store.load() {
        Ok(config) => Json(config.unwrap_or_else(ScheduleConfig::disabled)).into_response(),
        Err(err) => json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

/// `PUT /api/snapshots/schedule` — save and re-register the trigger.
///
/// Range and timezone validation happens during deserialization of
/// [`ScheduleConfig`], so an invalid document never reaches the store.
pub async fn put_schedule(
    State(state): State<Arc<AppState>>,
    Json(config): Json<ScheduleConfig>,
) -> Response {
    if let Err(err) = state.schedule_store.save(&config) {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
    }
    state.scheduler.schedule(&config);
    Json(config).into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use sitevault::snapshot::{CommandTemplate, SnapshotServiceConfig};

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        let store = Arc::new(MemoryStore::new());
        let snapshot_store = Arc::new(
            FileSnapshotStore::open(dir.join("snapshots.json")).expect("metadata store"),
        );
        let mut config = SnapshotServiceConfig::new(
            dir,
            CommandTemplate::new("sh", ["-c", "printf data > {archive}"]),
            CommandTemplate::new("sh", ["-c", "true"]),
        );
        config.timeout = Duration::from_secs(5);
        let snapshots = Arc::new(SnapshotService::new(config, snapshot_store));
        let schedule_store = Arc::new(FileScheduleStore::new(dir.join("schedule.json")));
        let scheduler = SnapshotScheduler::new(snapshots.clone(), schedule_store.clone());

        Arc::new(AppState {
            store,
            snapshots,
            scheduler,
            schedule_store,
            source_identifier: "test-site".into(),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn unconfirmed_import_is_rejected_without_writes() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        // A valid archive, so rejection can only come from the flag check.
        let archive = Exporter::new(state.store.clone(), state.store.clone(), "x")
            .export_to_archive()
            .unwrap();

        let response = import_config(
            State(state.clone()),
            Query(ImportFlags { preview: false, confirmed: false }),
            Bytes::from(archive),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn preview_of_garbage_reports_invalid_not_500() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let response = import_config(
            State(state),
            Query(ImportFlags { preview: true, confirmed: false }),
            Bytes::from_static(b"not an archive"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["valid"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn confirmed_import_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let archive = Exporter::new(state.store.clone(), state.store.clone(), "x")
            .export_to_archive()
            .unwrap();

        let response = import_config(
            State(state),
            Query(ImportFlags { preview: false, confirmed: true }),
            Bytes::from(archive),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn export_sets_download_headers() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let response = export_config(State(state)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .expect("content-disposition")
            .to_str()
            .unwrap()
            .to_owned();
        assert!(disposition.contains("site-config-"), "got {disposition}");
    }

    #[tokio::test]
    async fn snapshot_endpoints_cover_create_list_delete() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let created = create_snapshot(State(state.clone())).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let snapshot = body_json(created).await;
        let id: Uuid = snapshot["id"].as_str().unwrap().parse().unwrap();

        let listed = body_json(list_snapshots(State(state.clone())).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let deleted = delete_snapshot(State(state.clone()), Path(id)).await;
        assert_eq!(deleted.status(), StatusCode::OK);

        let missing = delete_snapshot(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn schedule_put_registers_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let config =
            ScheduleConfig::new(true, 3, 2, chrono_tz::Europe::Paris).expect("valid config");
        let response = put_schedule(State(state.clone()), Json(config)).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(state.scheduler.is_scheduled());
        let stored = body_json(get_schedule(State(state.clone())).await).await;
        assert_eq!(stored["enabled"], true);
        assert_eq!(stored["timezone"], "Europe/Paris");

        state.scheduler.stop();
    }
}
