//! Interval-driven automatic backups
//!
//! `BackupScheduler::run_if_due` is the whole policy: back up when there is
//! no backup yet or the newest one is older than the configured interval.
//! `spawn` repeats that check on a background thread.

use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::config::{BackupInterval, BackupSettings, SpoolPaths};
use crate::error::SpoolResult;

use super::manager::BackupManager;

/// Runs backups on an interval policy
pub struct BackupScheduler {
    manager: BackupManager,
    interval: BackupInterval,
}

impl BackupScheduler {
    pub fn new(manager: BackupManager, interval: BackupInterval) -> Self {
        Self { manager, interval }
    }

    pub fn from_settings(paths: SpoolPaths, settings: &BackupSettings) -> Self {
        Self::new(BackupManager::new(paths, settings), settings.interval)
    }

    pub fn interval(&self) -> BackupInterval {
        self.interval
    }

    /// When the next backup becomes due; `now` if none exists yet
    pub fn next_due(&self, now: DateTime<Utc>) -> SpoolResult<DateTime<Utc>> {
        Ok(match self.manager.get_latest_backup()? {
            Some(latest) => latest.created_at + self.interval.duration(),
            None => now,
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> SpoolResult<bool> {
        Ok(self.next_due(now)? <= now)
    }

    /// Back up (and apply retention) if a backup is due at `now`
    ///
    /// Returns the new backup's path, or `None` when nothing was due.
    pub fn run_if_due(&self, now: DateTime<Utc>) -> SpoolResult<Option<PathBuf>> {
        if !self.is_due(now)? {
            debug!(interval = %self.interval, "no backup due");
            return Ok(None);
        }

        let (path, _deleted) = self.manager.create_backup_with_retention()?;
        Ok(Some(path))
    }

    /// Check for due backups every `poll` until the handle is stopped or dropped
    pub fn spawn(self, poll: Duration) -> SchedulerHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::spawn(move || loop {
            if let Err(e) = self.run_if_due(Utc::now()) {
                warn!(error = %e, "scheduled backup failed");
            }

            match stop_rx.recv_timeout(poll) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        SchedulerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }
}

/// Handle to a running scheduler thread
pub struct SchedulerHandle {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for its thread to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("backup scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn create_scheduler(interval: BackupInterval, max_backups: u32) -> (TempDir, BackupScheduler) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpoolPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();
        let settings = BackupSettings {
            max_backups,
            interval,
            ..Default::default()
        };
        (temp_dir, BackupScheduler::from_settings(paths, &settings))
    }

    #[test]
    fn test_first_run_is_due() {
        let (_temp, scheduler) = create_scheduler(BackupInterval::Daily, 10);
        assert!(scheduler.is_due(Utc::now()).unwrap());
        assert!(scheduler.run_if_due(Utc::now()).unwrap().is_some());
    }

    #[test]
    fn test_not_due_until_interval_elapses() {
        let (_temp, scheduler) = create_scheduler(BackupInterval::EveryHours(6), 10);
        scheduler.run_if_due(Utc::now()).unwrap().unwrap();

        let soon = Utc::now() + ChronoDuration::hours(1);
        assert!(scheduler.run_if_due(soon).unwrap().is_none());

        let later = Utc::now() + ChronoDuration::hours(7);
        assert!(scheduler.is_due(later).unwrap());
        assert!(scheduler.run_if_due(later).unwrap().is_some());
    }

    #[test]
    fn test_run_applies_retention() {
        let (_temp, scheduler) = create_scheduler(BackupInterval::Hourly, 2);
        let mut now = Utc::now();
        for _ in 0..4 {
            scheduler.run_if_due(now).unwrap();
            now += ChronoDuration::hours(2);
        }
        assert_eq!(scheduler.manager.list_backups().unwrap().len(), 2);
    }

    #[test]
    fn test_spawned_scheduler_backs_up_and_stops() {
        let (temp, scheduler) = create_scheduler(BackupInterval::Weekly, 10);
        let handle = scheduler.spawn(Duration::from_millis(20));
        thread::sleep(Duration::from_millis(100));
        handle.stop();

        let backups: Vec<_> = std::fs::read_dir(temp.path().join("backups"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        // weekly interval: one backup, later polls find nothing due
        assert_eq!(backups.len(), 1);
    }
}
