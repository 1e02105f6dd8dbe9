//! Archive import: validation (preview) and the destructive apply path.

use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::sync::Arc;

use tracing::info;
use zip::ZipArchive;

use super::error::{ArchiveError, ArchiveResult};
use crate::package::{ConfigurationPackage, PackageSummary, ASSET_DIR, MANIFEST_NAME, SCHEMA_VERSION};
use crate::store::{BlobStore, ConfigStore};

/// The result of a successful preview: the parsed, validated package.
///
/// Holding the full package lets callers show a per-collection summary (and
/// anything else they want to diff) before committing.
#[derive(Debug, Clone)]
pub struct ImportPreview {
    /// The validated package as parsed from the manifest.
    pub package: ConfigurationPackage,
}

impl ImportPreview {
    /// Per-collection counts of what an import would write.
    pub fn summary(&self) -> &PackageSummary {
        &self.package.summary
    }
}

/// Validates and applies configuration archives.
///
/// Only [`preview`](Importer::preview) is part of the public surface. The
/// destructive apply path is crate-private and reached through the import
/// orchestrator, which guarantees a safety-net backup exists before any
/// collection is replaced.
pub struct Importer<S, B> {
    store: Arc<S>,
    blobs: Arc<B>,
}

impl<S: ConfigStore, B: BlobStore> Importer<S, B> {
    /// Create an importer writing to the given store ports.
    pub fn new(store: Arc<S>, blobs: Arc<B>) -> Self {
        Self { store, blobs }
    }

    /// Unpack and validate an archive without touching the live store.
    ///
    /// # Errors
    ///
    /// Returns an error for a damaged container, a manifest that fails to
    /// parse, a schema version newer than [`SCHEMA_VERSION`], an inconsistent
    /// summary, or dangling cross-collection references.
    pub fn preview(&self, archive_bytes: &[u8]) -> ArchiveResult<ImportPreview> {
        let package = read_manifest(archive_bytes)?;
        validate_package(&package)?;
        Ok(ImportPreview { package })
    }

    /// Validate, then destructively apply an archive: assets first, then
    /// every collection in parent-before-child order.
    pub(crate) fn apply_archive(&self, archive_bytes: &[u8]) -> ArchiveResult<PackageSummary> {
        let preview = self.preview(archive_bytes)?;

        for (name, bytes) in read_assets(archive_bytes)? {
            self.blobs.put(&name, bytes)?;
        }

        self.apply_package(&preview.package)
    }

    /// Re-apply a previously captured archive without structural validation.
    ///
    /// Rollback must accept whatever state the store held before an import,
    /// including cross-collection references the store itself never
    /// enforced; only the container and manifest have to parse.
    pub(crate) fn restore_archive(&self, archive_bytes: &[u8]) -> ArchiveResult<PackageSummary> {
        let package = read_manifest(archive_bytes)?;

        for (name, bytes) in read_assets(archive_bytes)? {
            self.blobs.put(&name, bytes)?;
        }

        self.apply_package(&package)
    }

    /// Replace every collection with the package's contents.
    ///
    /// Parent collections are written before the collections that reference
    /// them, so references never dangle mid-import even though the store
    /// enforces no referential integrity.
    pub(crate) fn apply_package(
        &self,
        package: &ConfigurationPackage,
    ) -> ArchiveResult<PackageSummary> {
        self.store.replace_navigation_entries(package.navigation_entries.clone())?;
        self.store.replace_page_bodies(package.page_bodies.clone())?;
        self.store.replace_catalog_categories(package.catalog_categories.clone())?;
        self.store.replace_catalog_items(package.catalog_items.clone())?;
        self.store.replace_settings(package.settings.clone())?;
        self.store.replace_social_links(package.social_links.clone())?;
        self.store.replace_appointment_activities(package.appointment_activities.clone())?;
        self.store.replace_appointment_availability(package.appointment_availability.clone())?;

        let counts = package.summarize();
        info!(collections = ?counts, source = %package.source_identifier, "applied configuration package");
        Ok(counts)
    }
}

/// Parse the manifest entry out of archive bytes.
pub(crate) fn read_manifest(archive_bytes: &[u8]) -> ArchiveResult<ConfigurationPackage> {
    let mut zip = ZipArchive::new(Cursor::new(archive_bytes))?;

    let mut manifest = zip
        .by_name(MANIFEST_NAME)
        .map_err(|_| ArchiveError::invalid(format!("archive has no {MANIFEST_NAME} entry")))?;

    let mut raw = String::new();
    manifest.read_to_string(&mut raw)?;

    serde_json::from_str(&raw).map_err(ArchiveError::deserialization)
}

/// Extract every `assets/` entry as `(name, bytes)` pairs.
pub(crate) fn read_assets(archive_bytes: &[u8]) -> ArchiveResult<Vec<(String, Vec<u8>)>> {
    let mut zip = ZipArchive::new(Cursor::new(archive_bytes))?;
    let mut assets = Vec::new();

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(name) = entry.name().strip_prefix(ASSET_DIR).map(str::to_owned) else {
            continue;
        };
        if name.is_empty() || name.contains('/') {
            continue;
        }

        // The header's claimed uncompressed size is attacker-controlled;
        // never pre-allocate from it. `read_to_end` grows as data arrives.
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        assets.push((name, bytes));
    }

    Ok(assets)
}

/// Structural and version validation, run before any mutation.
pub(crate) fn validate_package(package: &ConfigurationPackage) -> ArchiveResult<()> {
    if package.schema_version > SCHEMA_VERSION {
        return Err(ArchiveError::UnsupportedVersion {
            found: package.schema_version,
            supported: SCHEMA_VERSION,
        });
    }

    if package.summary != package.summarize() {
        return Err(ArchiveError::invalid(
            "manifest summary does not match collection contents",
        ));
    }

    let navigation_ids: HashSet<&str> =
        package.navigation_entries.iter().map(|e| e.id.as_str()).collect();
    for body in &package.page_bodies {
        if !navigation_ids.contains(body.navigation_id.as_str()) {
            return Err(ArchiveError::missing_reference(format!(
                "page body {} references missing navigation entry {}",
                body.id, body.navigation_id
            )));
        }
    }

    let category_ids: HashSet<&str> =
        package.catalog_categories.iter().map(|c| c.id.as_str()).collect();
    for item in &package.catalog_items {
        for category_id in &item.category_ids {
            if !category_ids.contains(category_id.as_str()) {
                return Err(ArchiveError::missing_reference(format!(
                    "catalog item {} references missing category {category_id}",
                    item.id
                )));
            }
        }
    }

    Ok(())
}
