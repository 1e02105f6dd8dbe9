//! `SiteVault` — configuration backup & migration engine.
//!
//! SiteVault serializes the entire mutable configuration of a
//! content-management/booking site (navigation, page bodies, settings,
//! catalog, appointment scheduling data) into a single portable archive,
//! imports such archives back with a preview/commit protocol and automatic
//! rollback, and keeps full-database snapshots on a recurring schedule with
//! top-N retention.
//!
//! # Quick Start
//!
//! ## Exporting and importing configuration
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitevault::archive::{Exporter, Importer};
//! use sitevault::migrate::ImportOrchestrator;
//! use sitevault::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//!
//! // Export: read-only, returns zipped archive bytes.
//! let exporter = Exporter::new(store.clone(), store.clone(), "my-site");
//! let archive = exporter.export_to_archive()?;
//!
//! // Preview: validates without touching anything.
//! let importer = Importer::new(store.clone(), store.clone());
//! let preview = importer.preview(&archive)?;
//! println!("would import {:?}", preview.summary());
//!
//! // Commit: safety-net backup, apply, rollback on failure.
//! let orchestrator = ImportOrchestrator::new(store.clone(), store.clone());
//! let outcome = orchestrator.execute(&archive);
//! assert!(outcome.success);
//! ```
//!
//! ## Scheduled database snapshots
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitevault::schedule::{ScheduleConfig, SnapshotScheduler, MemoryScheduleStore};
//! use sitevault::snapshot::{
//!     CommandTemplate, FileSnapshotStore, SnapshotService, SnapshotServiceConfig,
//! };
//!
//! let store = Arc::new(FileSnapshotStore::open("/var/backups/snapshots.json")?);
//! let service = Arc::new(SnapshotService::new(
//!     SnapshotServiceConfig::new(
//!         "/var/backups",
//!         CommandTemplate::new("mongodump", ["--archive={archive}", "--gzip"]),
//!         CommandTemplate::new("mongorestore", ["--archive={archive}", "--gzip", "--drop"]),
//!     ),
//!     store,
//! ));
//!
//! let schedule_store = Arc::new(MemoryScheduleStore::with_config(
//!     ScheduleConfig::new(true, 3, 7, chrono_tz::Europe::Paris)?,
//! ));
//! let scheduler = SnapshotScheduler::new(service, schedule_store);
//! scheduler.start()?;
//! ```
//!
//! # Design
//!
//! The data store behind the configuration collections is an external
//! collaborator reached through the ports in [`store`]; the engine itself
//! never assumes a particular database. Imports are recoverable rather than
//! atomic: a [safety-net backup](safety) is always taken before the
//! destructive apply, and a failed apply triggers a restore whose own
//! outcome is always reported.

pub mod archive;
pub mod migrate;
pub mod package;
pub mod record;
pub mod safety;
pub mod schedule;
pub mod snapshot;
pub mod store;

pub use archive::{ArchiveError, Exporter, ImportPreview, Importer};
pub use migrate::{ImportOrchestrator, ImportOutcome};
pub use package::{ConfigurationPackage, PackageSummary, SCHEMA_VERSION};
pub use safety::{SafetyNetBackup, SafetyNetService};
pub use schedule::{ScheduleConfig, ScheduleError, SnapshotScheduler};
pub use snapshot::{DatabaseSnapshot, SnapshotError, SnapshotService, SnapshotStatus};
