//! Recurring snapshot scheduling.
//!
//! [`ScheduleConfig`] is the single, validated configuration document for
//! the daily backup job; [`SnapshotScheduler`] owns the process-wide timer
//! that fires it.

mod config;
mod scheduler;
mod store;

pub use config::ScheduleConfig;
pub use scheduler::SnapshotScheduler;
pub use store::{FileScheduleStore, MemoryScheduleStore, ScheduleStore};

use thiserror::Error;

use crate::store::StoreError;

/// Errors from schedule configuration and registration.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Hour outside 0..=23.
    #[error("scheduled hour must be between 0 and 23, got {0}")]
    InvalidHour(u8),

    /// Retention count outside 1..=30.
    #[error("retention count must be between 1 and 30, got {0}")]
    InvalidRetention(u32),

    /// Not a known IANA timezone name.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The schedule store failed.
    #[error("schedule store error: {0}")]
    Store(#[from] StoreError),
}

/// A specialized `Result` type for schedule operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;
