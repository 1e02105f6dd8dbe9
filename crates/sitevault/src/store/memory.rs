//! In-memory implementation of the store ports.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{BlobStore, ConfigStore, StoreError, StoreResult};
use crate::record::{
    AppointmentActivity, AppointmentAvailability, CatalogCategory, CatalogItem, NavigationEntry,
    PageBody, Setting, SocialLink,
};

#[derive(Debug, Default)]
struct Collections {
    navigation_entries: Vec<NavigationEntry>,
    page_bodies: Vec<PageBody>,
    settings: Vec<Setting>,
    social_links: Vec<SocialLink>,
    catalog_categories: Vec<CatalogCategory>,
    catalog_items: Vec<CatalogItem>,
    appointment_activities: Vec<AppointmentActivity>,
    appointment_availability: Vec<AppointmentAvailability>,
}

/// An in-process document store implementing [`ConfigStore`] and
/// [`BlobStore`].
///
/// Thread-safe (`Send + Sync`); suitable for tests and single-process
/// deployments. Data does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("store lock poisoned")
}

macro_rules! collection_accessors {
    ($field:ident, $read:ident, $replace:ident, $record:ty) => {
        fn $read(&self) -> StoreResult<Vec<$record>> {
            Ok(self.collections.read().map_err(poisoned)?.$field.clone())
        }

        fn $replace(&self, records: Vec<$record>) -> StoreResult<()> {
            self.collections.write().map_err(poisoned)?.$field = records;
            Ok(())
        }
    };
}

impl ConfigStore for MemoryStore {
    collection_accessors!(
        navigation_entries,
        navigation_entries,
        replace_navigation_entries,
        NavigationEntry
    );
    collection_accessors!(page_bodies, page_bodies, replace_page_bodies, PageBody);
    collection_accessors!(settings, settings, replace_settings, Setting);
    collection_accessors!(social_links, social_links, replace_social_links, SocialLink);
    collection_accessors!(
        catalog_categories,
        catalog_categories,
        replace_catalog_categories,
        CatalogCategory
    );
    collection_accessors!(catalog_items, catalog_items, replace_catalog_items, CatalogItem);
    collection_accessors!(
        appointment_activities,
        appointment_activities,
        replace_appointment_activities,
        AppointmentActivity
    );
    collection_accessors!(
        appointment_availability,
        appointment_availability,
        replace_appointment_availability,
        AppointmentAvailability
    );
}

impl BlobStore for MemoryStore {
    fn get(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().map_err(poisoned)?.get(name).cloned())
    }

    fn put(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.blobs.write().map_err(poisoned)?.insert(name.to_owned(), bytes);
        Ok(())
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        self.blobs.write().map_err(poisoned)?.remove(name);
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        Ok(self.blobs.read().map_err(poisoned)?.keys().cloned().collect())
    }
}
