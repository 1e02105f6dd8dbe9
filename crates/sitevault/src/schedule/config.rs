//! The snapshot schedule configuration value object.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::{ScheduleError, ScheduleResult};

/// Valid scheduled hours.
const HOUR_RANGE: std::ops::RangeInclusive<u8> = 0..=23;
/// Valid retention counts.
const RETENTION_RANGE: std::ops::RangeInclusive<u32> = 1..=30;

/// The at-most-one-instance configuration of the recurring backup job.
///
/// A validated value object: construction and every `with_*` mutation
/// re-validate the whole object, so an in-range instance is the only kind
/// that can exist. Deserialization goes through the same validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScheduleConfig", into = "RawScheduleConfig")]
pub struct ScheduleConfig {
    enabled: bool,
    scheduled_hour: u8,
    retention_count: u32,
    timezone: Tz,
    last_backup_at: Option<DateTime<Utc>>,
}

impl ScheduleConfig {
    /// Create a validated configuration.
    pub fn new(
        enabled: bool,
        scheduled_hour: u8,
        retention_count: u32,
        timezone: Tz,
    ) -> ScheduleResult<Self> {
        let config =
            Self { enabled, scheduled_hour, retention_count, timezone, last_backup_at: None };
        config.validate()?;
        Ok(config)
    }

    /// Disabled default: 03:00 UTC, keep 7.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            scheduled_hour: 3,
            retention_count: 7,
            timezone: Tz::UTC,
            last_backup_at: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn scheduled_hour(&self) -> u8 {
        self.scheduled_hour
    }

    pub fn retention_count(&self) -> u32 {
        self.retention_count
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn last_backup_at(&self) -> Option<DateTime<Utc>> {
        self.last_backup_at
    }

    /// Copy with a different enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Copy with a different hour; re-validates.
    pub fn with_scheduled_hour(mut self, hour: u8) -> ScheduleResult<Self> {
        self.scheduled_hour = hour;
        self.validate()?;
        Ok(self)
    }

    /// Copy with a different retention count; re-validates.
    pub fn with_retention_count(mut self, count: u32) -> ScheduleResult<Self> {
        self.retention_count = count;
        self.validate()?;
        Ok(self)
    }

    /// Copy with a different timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Copy with an updated last-backup timestamp. The scheduled job is the
    /// only writer of this field.
    #[must_use]
    pub fn with_last_backup_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.last_backup_at = at;
        self
    }

    fn validate(&self) -> ScheduleResult<()> {
        if !HOUR_RANGE.contains(&self.scheduled_hour) {
            return Err(ScheduleError::InvalidHour(self.scheduled_hour));
        }
        if !RETENTION_RANGE.contains(&self.retention_count) {
            return Err(ScheduleError::InvalidRetention(self.retention_count));
        }
        Ok(())
    }
}

/// Unvalidated wire shape; [`ScheduleConfig`] is produced from it via
/// `TryFrom` so no out-of-range document can deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScheduleConfig {
    enabled: bool,
    scheduled_hour: u8,
    retention_count: u32,
    /// IANA zone name, e.g. `Europe/Paris`.
    timezone: String,
    #[serde(default)]
    last_backup_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawScheduleConfig> for ScheduleConfig {
    type Error = ScheduleError;

    fn try_from(raw: RawScheduleConfig) -> Result<Self, Self::Error> {
        let timezone: Tz =
            raw.timezone.parse().map_err(|_| ScheduleError::InvalidTimezone(raw.timezone))?;
        let config = Self {
            enabled: raw.enabled,
            scheduled_hour: raw.scheduled_hour,
            retention_count: raw.retention_count,
            timezone,
            last_backup_at: raw.last_backup_at,
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<ScheduleConfig> for RawScheduleConfig {
    fn from(config: ScheduleConfig) -> Self {
        Self {
            enabled: config.enabled,
            scheduled_hour: config.scheduled_hour,
            retention_count: config.retention_count,
            timezone: config.timezone.name().to_owned(),
            last_backup_at: config.last_backup_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_hour() {
        match ScheduleConfig::new(true, 24, 7, Tz::UTC) {
            Err(ScheduleError::InvalidHour(24)) => (),
            other => panic!("expected InvalidHour, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_retention() {
        assert!(matches!(
            ScheduleConfig::new(true, 3, 0, Tz::UTC),
            Err(ScheduleError::InvalidRetention(0))
        ));
        assert!(matches!(
            ScheduleConfig::new(true, 3, 31, Tz::UTC),
            Err(ScheduleError::InvalidRetention(31))
        ));
    }

    #[test]
    fn with_pattern_revalidates() {
        let config = ScheduleConfig::new(true, 3, 7, Tz::UTC).unwrap();
        assert!(config.clone().with_scheduled_hour(23).is_ok());
        assert!(matches!(
            config.with_scheduled_hour(99),
            Err(ScheduleError::InvalidHour(99))
        ));
    }

    #[test]
    fn deserialization_validates_timezone_and_ranges() {
        let ok: ScheduleConfig = serde_json::from_str(
            r#"{"enabled":true,"scheduledHour":3,"retentionCount":2,"timezone":"Europe/Paris"}"#,
        )
        .unwrap();
        assert_eq!(ok.timezone(), chrono_tz::Europe::Paris);

        let bad_tz = serde_json::from_str::<ScheduleConfig>(
            r#"{"enabled":true,"scheduledHour":3,"retentionCount":2,"timezone":"Mars/Olympus"}"#,
        );
        assert!(bad_tz.is_err());

        let bad_hour = serde_json::from_str::<ScheduleConfig>(
            r#"{"enabled":true,"scheduledHour":25,"retentionCount":2,"timezone":"UTC"}"#,
        );
        assert!(bad_hour.is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let config = ScheduleConfig::new(true, 5, 10, chrono_tz::Europe::Paris).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: ScheduleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
