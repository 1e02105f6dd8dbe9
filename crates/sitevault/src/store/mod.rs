//! Data-access ports for the configuration collections.
//!
//! The backing document store is an external collaborator; this module only
//! defines the contract the backup engine consumes:
//!
//! - [`ConfigStore`] — read and destructively replace each in-scope collection
//! - [`BlobStore`] — the file-blob port for uploaded binary assets
//!
//! [`MemoryStore`] implements both and is used by the test suites and the
//! bundled server binary. Deployments implement the traits over their own
//! store.

mod memory;

use std::io;

use thiserror::Error;

pub use memory::MemoryStore;

use crate::record::{
    AppointmentActivity, AppointmentAvailability, CatalogCategory, CatalogItem, NavigationEntry,
    PageBody, Setting, SocialLink,
};

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred while talking to the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A serialization error occurred while encoding or decoding records.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backing store rejected the operation.
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A specialized `Result` type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Read/write contract over the configuration collections.
///
/// Reads return the full collection contents; writes are destructive
/// replacements (delete-then-insert semantics). The engine never performs
/// record-level updates through this port.
pub trait ConfigStore: Send + Sync {
    fn navigation_entries(&self) -> StoreResult<Vec<NavigationEntry>>;
    fn replace_navigation_entries(&self, entries: Vec<NavigationEntry>) -> StoreResult<()>;

    fn page_bodies(&self) -> StoreResult<Vec<PageBody>>;
    fn replace_page_bodies(&self, bodies: Vec<PageBody>) -> StoreResult<()>;

    fn settings(&self) -> StoreResult<Vec<Setting>>;
    fn replace_settings(&self, settings: Vec<Setting>) -> StoreResult<()>;

    fn social_links(&self) -> StoreResult<Vec<SocialLink>>;
    fn replace_social_links(&self, links: Vec<SocialLink>) -> StoreResult<()>;

    fn catalog_categories(&self) -> StoreResult<Vec<CatalogCategory>>;
    fn replace_catalog_categories(&self, categories: Vec<CatalogCategory>) -> StoreResult<()>;

    fn catalog_items(&self) -> StoreResult<Vec<CatalogItem>>;
    fn replace_catalog_items(&self, items: Vec<CatalogItem>) -> StoreResult<()>;

    fn appointment_activities(&self) -> StoreResult<Vec<AppointmentActivity>>;
    fn replace_appointment_activities(
        &self,
        activities: Vec<AppointmentActivity>,
    ) -> StoreResult<()>;

    fn appointment_availability(&self) -> StoreResult<Vec<AppointmentAvailability>>;
    fn replace_appointment_availability(
        &self,
        availability: Vec<AppointmentAvailability>,
    ) -> StoreResult<()>;
}

/// The file-blob port: stores uploaded binary assets by name.
pub trait BlobStore: Send + Sync {
    /// Fetch an asset's bytes, or `None` if it does not exist.
    fn get(&self, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Store an asset, overwriting any existing one with the same name.
    fn put(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()>;

    /// Remove an asset. Removing a name that does not exist is not an error.
    fn delete(&self, name: &str) -> StoreResult<()>;

    /// List the names of all stored assets.
    fn list(&self) -> StoreResult<Vec<String>>;
}
