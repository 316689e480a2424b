//! Backup system for Spoolbook
//!
//! - `BackupManager`: creates `.bak` snapshots of the data files and applies
//!   FIFO retention (`max_backups`, 0 = unlimited)
//! - `RestoreManager`: validates a backup and restores it, saving the data it
//!   replaces first
//! - `BackupScheduler`: interval policy for automatic backups
//!
//! # Backup format
//!
//! A backup is a single JSON document:
//! - `schema_version`: rejected on restore if newer than this build supports
//! - `created_at`, `app_version`
//! - `filaments`: content of `data/filaments.json`
//! - `prices`: content of `data/price_history.json`
//!
//! Files are named `backup-YYYYMMDD-HHMMSS-mmm.bak`; the name carries the
//! creation time used for ordering and retention.
//!
//! ```rust,ignore
//! use spoolbook::backup::{BackupManager, RestoreManager};
//!
//! let manager = BackupManager::new(paths.clone(), &settings.backup);
//! let (backup_path, _pruned) = manager.create_backup_with_retention()?;
//!
//! let restore = RestoreManager::new(paths, &settings.backup);
//! println!("{}", restore.restore_from_file(&backup_path)?.summary());
//! storage.load_all()?;
//! ```

mod manager;
mod restore;
mod schedule;

pub use manager::{BackupArchive, BackupInfo, BackupManager, BACKUP_EXTENSION, BACKUP_SCHEMA_VERSION};
pub use restore::{RestoreManager, RestoreResult, ValidationResult};
pub use schedule::{BackupScheduler, SchedulerHandle};
