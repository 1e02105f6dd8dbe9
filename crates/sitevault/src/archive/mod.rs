//! Configuration archive export and import.
//!
//! An archive is a zip container holding a `manifest.json` entry (the
//! serialized [`ConfigurationPackage`](crate::package::ConfigurationPackage))
//! plus one binary entry under `assets/` per referenced uploaded file.
//!
//! Export is read-only. Import is two-phase: [`Importer::preview`] validates
//! an archive without touching anything, and the destructive apply path is
//! only reachable through the import orchestrator so that a safety-net backup
//! is always taken first.

mod error;
mod export;
mod import;

pub use error::{ArchiveError, ArchiveResult};
pub use export::Exporter;
pub use import::{ImportPreview, Importer};

pub(crate) use import::read_assets;
