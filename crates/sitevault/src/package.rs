//! The [`ConfigurationPackage`]: the logical content of an exported archive.
//!
//! A package is constructed transiently by the exporter, serialized as the
//! archive's `manifest.json`, and parsed back by the importer. It is never
//! persisted server-side in its unpacked form.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{
    AppointmentActivity, AppointmentAvailability, CatalogCategory, CatalogItem, NavigationEntry,
    PageBody, Setting, SettingValue, SocialLink,
};

/// The current package schema version.
///
/// Incremented whenever the manifest shape changes incompatibly. The importer
/// accepts packages with an equal or older version and rejects newer ones.
pub const SCHEMA_VERSION: u32 = 2;

/// URL prefix under which uploaded assets are served. Asset entries inside an
/// archive are named by stripping this prefix.
pub const ASSET_URL_PREFIX: &str = "/uploads/";

/// Name of the manifest entry inside an archive.
pub const MANIFEST_NAME: &str = "manifest.json";

/// Directory prefix for binary asset entries inside an archive.
pub const ASSET_DIR: &str = "assets/";

/// Per-collection record counts, stamped into the manifest and reported back
/// to callers after an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub navigation_entries: usize,
    pub page_bodies: usize,
    pub settings: usize,
    pub social_links: usize,
    pub catalog_items: usize,
    pub catalog_categories: usize,
    pub appointment_activities: usize,
    pub appointment_availability: usize,
}

/// The exported configuration of one site instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationPackage {
    /// Manifest schema version; see [`SCHEMA_VERSION`].
    pub schema_version: u32,
    pub export_date: DateTime<Utc>,
    /// Identifies the origin instance (hostname, site name, ...).
    pub source_identifier: String,
    pub summary: PackageSummary,
    pub navigation_entries: Vec<NavigationEntry>,
    pub page_bodies: Vec<PageBody>,
    pub settings: Vec<Setting>,
    pub social_links: Vec<SocialLink>,
    pub catalog_categories: Vec<CatalogCategory>,
    pub catalog_items: Vec<CatalogItem>,
    pub appointment_activities: Vec<AppointmentActivity>,
    pub appointment_availability: Vec<AppointmentAvailability>,
}

impl ConfigurationPackage {
    /// Recompute the per-collection counts from the collection vectors.
    pub fn summarize(&self) -> PackageSummary {
        PackageSummary {
            navigation_entries: self.navigation_entries.len(),
            page_bodies: self.page_bodies.len(),
            settings: self.settings.len(),
            social_links: self.social_links.len(),
            catalog_items: self.catalog_items.len(),
            catalog_categories: self.catalog_categories.len(),
            appointment_activities: self.appointment_activities.len(),
            appointment_availability: self.appointment_availability.len(),
        }
    }

    /// The set of uploaded-asset names referenced by this package.
    ///
    /// Covers media-backed settings and catalog item images. Only URLs under
    /// [`ASSET_URL_PREFIX`] are considered stored assets; absolute URLs to
    /// external hosts are left alone.
    pub fn referenced_assets(&self) -> BTreeSet<String> {
        let mut assets = BTreeSet::new();

        for setting in &self.settings {
            if let SettingValue::Media { url, .. } = &setting.value {
                if let Some(name) = asset_name(url) {
                    assets.insert(name.to_owned());
                }
            }
        }

        for item in &self.catalog_items {
            if let Some(url) = &item.image_url {
                if let Some(name) = asset_name(url) {
                    assets.insert(name.to_owned());
                }
            }
        }

        assets
    }
}

/// Extract the stored-asset name from a URL, if it points at an upload.
pub(crate) fn asset_name(url: &str) -> Option<&str> {
    url.strip_prefix(ASSET_URL_PREFIX).filter(|name| !name.is_empty() && !name.contains('/'))
}
