//! Archive export: serialize every collection into a portable zip.

use std::io::{Cursor, Write};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::{ArchiveError, ArchiveResult};
use crate::package::{ConfigurationPackage, ASSET_DIR, MANIFEST_NAME, SCHEMA_VERSION};
use crate::store::{BlobStore, ConfigStore};

/// Builds configuration archives from the live collections.
///
/// Export is read-only and takes no locks: the result is a best-effort
/// point-in-time view, and concurrent writes may land in or miss the archive.
pub struct Exporter<S, B> {
    store: Arc<S>,
    blobs: Arc<B>,
    source_identifier: String,
}

impl<S: ConfigStore, B: BlobStore> Exporter<S, B> {
    /// Create an exporter reading from the given store ports.
    ///
    /// `source_identifier` names the origin instance and is stamped into
    /// every manifest this exporter produces.
    pub fn new(store: Arc<S>, blobs: Arc<B>, source_identifier: impl Into<String>) -> Self {
        Self { store, blobs, source_identifier: source_identifier.into() }
    }

    /// Read every collection and assemble a [`ConfigurationPackage`] stamped
    /// with the current schema version and a fresh export date.
    pub fn build_package(&self) -> ArchiveResult<ConfigurationPackage> {
        let mut package = ConfigurationPackage {
            schema_version: SCHEMA_VERSION,
            export_date: Utc::now(),
            source_identifier: self.source_identifier.clone(),
            summary: Default::default(),
            navigation_entries: self.store.navigation_entries()?,
            page_bodies: self.store.page_bodies()?,
            settings: self.store.settings()?,
            social_links: self.store.social_links()?,
            catalog_categories: self.store.catalog_categories()?,
            catalog_items: self.store.catalog_items()?,
            appointment_activities: self.store.appointment_activities()?,
            appointment_availability: self.store.appointment_availability()?,
        };
        package.summary = package.summarize();
        Ok(package)
    }

    /// Export the full configuration as zipped archive bytes.
    pub fn export_to_archive(&self) -> ArchiveResult<Vec<u8>> {
        let package = self.build_package()?;
        let bytes = write_archive(&package, self.blobs.as_ref())?;
        info!(
            collections = ?package.summary,
            size_bytes = bytes.len(),
            "exported configuration archive"
        );
        Ok(bytes)
    }
}

/// Serialize a package plus its referenced assets into zip bytes.
pub(crate) fn write_archive<B: BlobStore + ?Sized>(
    package: &ConfigurationPackage,
    blobs: &B,
) -> ArchiveResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest =
        serde_json::to_vec_pretty(package).map_err(ArchiveError::serialization)?;
    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(&manifest)?;

    for name in package.referenced_assets() {
        match blobs.get(&name)? {
            Some(bytes) => {
                zip.start_file(format!("{ASSET_DIR}{name}"), options)?;
                zip.write_all(&bytes)?;
            }
            // A manifest record can point at a file that was deleted from
            // storage; the archive stays usable without it.
            None => warn!(asset = %name, "referenced asset not found in blob store, skipping"),
        }
    }

    Ok(zip.finish()?.into_inner())
}
