//! The process-wide snapshot scheduler.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::store::ScheduleStore;
use super::{ScheduleConfig, ScheduleResult};
use crate::snapshot::{SnapshotService, SnapshotStore};

struct Inner {
    initialized: bool,
    handle: Option<JoinHandle<()>>,
}

/// Owns the single daily-backup timer of this process.
///
/// `start` is guarded by an initialization flag so that calling it twice
/// (hot reload, repeated wiring) registers exactly one trigger. The guard is
/// process-wide only: horizontally scaled deployments would each register
/// their own timer, which this design does not defend against
/// (single-instance deployment is assumed).
pub struct SnapshotScheduler<M, C> {
    service: Arc<SnapshotService<M>>,
    store: Arc<C>,
    inner: Mutex<Inner>,
}

impl<M, C> SnapshotScheduler<M, C>
where
    M: SnapshotStore + 'static,
    C: ScheduleStore + 'static,
{
    /// Create a scheduler in the uninitialized state.
    pub fn new(service: Arc<SnapshotService<M>>, store: Arc<C>) -> Self {
        Self { service, store, inner: Mutex::new(Inner { initialized: false, handle: None }) }
    }

    /// Load the stored configuration and register the daily trigger if
    /// enabled. No-op when already initialized in this process.
    ///
    /// A load failure (unreadable or invalid configuration) is reported here
    /// and leaves the scheduler stopped and uninitialized, so a later
    /// `start` can succeed once the configuration is fixed.
    pub fn start(&self) -> ScheduleResult<()> {
        let mut inner = self.lock();
        if inner.initialized {
            debug!("scheduler already initialized, ignoring start");
            return Ok(());
        }

        let config = self.store.load()?;
        inner.initialized = true;

        match config {
            Some(config) if config.enabled() => {
                inner.handle = Some(self.spawn_trigger(&config));
            }
            _ => info!("snapshot schedule disabled, no trigger registered"),
        }
        Ok(())
    }

    /// Cancel any existing trigger and, if `config.enabled`, register a new
    /// one. Used at startup and whenever an administrator changes the
    /// configuration.
    pub fn schedule(&self, config: &ScheduleConfig) {
        let mut inner = self.lock();
        if let Some(handle) = inner.handle.take() {
            handle.abort();
        }
        inner.initialized = true;
        if config.enabled() {
            inner.handle = Some(self.spawn_trigger(config));
        } else {
            info!("snapshot schedule disabled");
        }
    }

    /// Cancel the active trigger, if any. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if let Some(handle) = inner.handle.take() {
            handle.abort();
            info!("snapshot scheduler stopped");
        }
    }

    /// Whether a trigger is currently registered.
    pub fn is_scheduled(&self) -> bool {
        self.lock().handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn spawn_trigger(&self, config: &ScheduleConfig) -> JoinHandle<()> {
        let hour = config.scheduled_hour();
        let timezone = config.timezone();
        let service = Arc::clone(&self.service);
        let store = Arc::clone(&self.store);

        info!(hour, %timezone, "daily snapshot trigger registered");
        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = next_occurrence(now, hour, timezone);
                let delay = (next - now).to_std().unwrap_or_default();
                debug!(next = %next, "sleeping until next scheduled snapshot");
                tokio::time::sleep(delay).await;

                run_tick(service.as_ref(), store.as_ref()).await;
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding this lock is unrecoverable for the process
        // anyway, so poisoning is folded into the inner state.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// One scheduled run: back up, record `lastBackupAt`, enforce retention.
///
/// Nothing here is allowed to break the timer loop: every failure is logged
/// and the next scheduled tick is the retry.
async fn run_tick<M: SnapshotStore, C: ScheduleStore>(service: &SnapshotService<M>, store: &C) {
    let snapshot = match service.create_backup().await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            warn!(%err, "scheduled snapshot could not be recorded");
            return;
        }
    };

    let config = match store.load() {
        Ok(Some(config)) => config,
        Ok(None) => {
            warn!("schedule configuration disappeared, skipping retention");
            return;
        }
        Err(err) => {
            warn!(%err, "could not reload schedule configuration, skipping retention");
            return;
        }
    };

    // A failed backup is already logged and recorded by the service; it
    // only skips the timestamp update.
    if snapshot.is_completed() {
        let updated = config.clone().with_last_backup_at(Some(snapshot.created_at));
        if let Err(err) = store.save(&updated) {
            warn!(%err, "could not record last backup time");
        }
    }

    // Retention runs on every fire so a lowered limit takes effect even
    // when this tick's backup did not complete.
    if let Err(err) = service.enforce_retention(config.retention_count() as usize).await {
        warn!(%err, "retention enforcement failed");
    }
}

/// The next wall-clock occurrence of `hour:00` in `timezone`, strictly after
/// `now`. DST transitions are handled by taking the earliest valid mapping
/// and skipping to the next day when the hour does not exist.
fn next_occurrence(now: DateTime<Utc>, hour: u8, timezone: Tz) -> DateTime<Utc> {
    let local_now = now.with_timezone(&timezone);
    let mut date = local_now.date_naive();

    for _ in 0..3 {
        if let Some(time) = date.and_hms_opt(u32::from(hour), 0, 0) {
            if let Some(candidate) = timezone.from_local_datetime(&time).earliest() {
                if candidate > local_now {
                    return candidate.with_timezone(&Utc);
                }
            }
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    // Unreachable for valid hours; fall back to a plain 24h delay.
    now + chrono::Duration::hours(24)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::schedule::MemoryScheduleStore;
    use crate::snapshot::{
        CommandTemplate, MemorySnapshotStore, SnapshotServiceConfig, SnapshotStatus,
    };

    fn snapshot_service(dir: &Path) -> Arc<SnapshotService<MemorySnapshotStore>> {
        let mut config = SnapshotServiceConfig::new(
            dir,
            CommandTemplate::new("sh", ["-c", "printf data > {archive}"]),
            CommandTemplate::new("sh", ["-c", "true"]),
        );
        config.timeout = Duration::from_secs(5);
        Arc::new(SnapshotService::new(config, Arc::new(MemorySnapshotStore::new())))
    }

    fn paris_config(enabled: bool) -> ScheduleConfig {
        ScheduleConfig::new(enabled, 3, 2, chrono_tz::Europe::Paris).unwrap()
    }

    #[test]
    fn next_occurrence_same_day_when_hour_is_ahead() {
        // 01:00 in Paris (CEST, UTC+2) on 2024-05-01 is 23:00 UTC April 30.
        let now = Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap();
        let next = next_occurrence(now, 3, chrono_tz::Europe::Paris);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap());
    }

    #[test]
    fn next_occurrence_rolls_to_next_day_when_hour_passed() {
        // 12:00 in Paris on 2024-05-01.
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let next = next_occurrence(now, 3, chrono_tz::Europe::Paris);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 1, 0, 0).unwrap());
    }

    #[test]
    fn next_occurrence_is_strictly_in_the_future() {
        // Exactly 03:00 Paris: the next fire is tomorrow, not now.
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
        let next = next_occurrence(now, 3, chrono_tz::Europe::Paris);
        assert!(next > now);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 2, 1, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn start_twice_registers_one_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryScheduleStore::with_config(paris_config(true)));
        let scheduler = SnapshotScheduler::new(snapshot_service(dir.path()), store);

        scheduler.start().unwrap();
        assert!(scheduler.is_scheduled());

        // Second start must be a no-op, not a second trigger.
        scheduler.start().unwrap();
        assert!(scheduler.is_scheduled());

        scheduler.stop();
    }

    #[tokio::test]
    async fn start_with_disabled_config_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryScheduleStore::with_config(paris_config(false)));
        let scheduler = SnapshotScheduler::new(snapshot_service(dir.path()), store);

        scheduler.start().unwrap();
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn stop_then_schedule_toggles_registration() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryScheduleStore::with_config(paris_config(true)));
        let scheduler = SnapshotScheduler::new(snapshot_service(dir.path()), store);

        scheduler.start().unwrap();
        scheduler.stop();
        assert!(!scheduler.is_scheduled());
        scheduler.stop(); // idempotent

        scheduler.schedule(&paris_config(true));
        assert!(scheduler.is_scheduled());

        scheduler.schedule(&paris_config(false));
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn tick_backs_up_records_timestamp_and_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let service = snapshot_service(dir.path());
        let store = MemoryScheduleStore::with_config(paris_config(true));

        // Three prior completed backups.
        for _ in 0..3 {
            let snapshot = service.create_backup().await.unwrap();
            assert_eq!(snapshot.status, SnapshotStatus::Completed);
        }

        run_tick(service.as_ref(), &store).await;

        // The tick created a 4th and retention reduced the total to 2, the
        // two newest of which include the new one.
        let remaining = service.list_backups().unwrap();
        assert_eq!(remaining.len(), 2);

        let config = store.load().unwrap().unwrap();
        let last = config.last_backup_at().expect("lastBackupAt should be set");
        assert_eq!(last, remaining[0].created_at);
    }

    #[tokio::test]
    async fn failed_backup_does_not_unregister_or_touch_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SnapshotServiceConfig::new(
            dir.path(),
            CommandTemplate::new("sh", ["-c", "exit 1"]),
            CommandTemplate::new("sh", ["-c", "true"]),
        );
        config.timeout = Duration::from_secs(5);
        let service =
            Arc::new(SnapshotService::new(config, Arc::new(MemorySnapshotStore::new())));
        let store = MemoryScheduleStore::with_config(paris_config(true));

        run_tick(service.as_ref(), &store).await;

        assert!(store.load().unwrap().unwrap().last_backup_at().is_none());
        // The failed attempt is recorded, not dropped.
        assert_eq!(service.list_backups().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_backup_tick_still_enforces_retention() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = Arc::new(MemorySnapshotStore::new());

        // Three completed backups from earlier ticks.
        let mut working_config = SnapshotServiceConfig::new(
            dir.path(),
            CommandTemplate::new("sh", ["-c", "printf data > {archive}"]),
            CommandTemplate::new("sh", ["-c", "true"]),
        );
        working_config.timeout = Duration::from_secs(5);
        let working = SnapshotService::new(working_config, Arc::clone(&metadata));
        for _ in 0..3 {
            working.create_backup().await.unwrap();
        }

        // This tick's backup fails; the lowered limit (keep 2) must still
        // take effect.
        let mut failing_config = SnapshotServiceConfig::new(
            dir.path(),
            CommandTemplate::new("sh", ["-c", "exit 1"]),
            CommandTemplate::new("sh", ["-c", "true"]),
        );
        failing_config.timeout = Duration::from_secs(5);
        let failing = SnapshotService::new(failing_config, metadata);
        let store = MemoryScheduleStore::with_config(paris_config(true));

        run_tick(&failing, &store).await;

        let completed = failing
            .list_backups()
            .unwrap()
            .into_iter()
            .filter(|s| s.status == SnapshotStatus::Completed)
            .count();
        assert_eq!(completed, 2);
        assert!(store.load().unwrap().unwrap().last_backup_at().is_none());
    }
}
