//! Backup manager for Spoolbook
//!
//! Writes timestamped snapshots of the data files into the backup directory
//! and prunes them first-in, first-out once `max_backups` is exceeded.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{BackupSettings, SpoolPaths};
use crate::error::{SpoolError, SpoolResult};
use crate::storage::file_io::write_bytes_atomic;

/// Current version of the backup file layout
pub const BACKUP_SCHEMA_VERSION: u32 = 1;

/// Extension of backup files
pub const BACKUP_EXTENSION: &str = "bak";

/// Metadata about a backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupInfo {
    pub filename: String,
    pub path: PathBuf,
    /// Taken from the filename, not the file system
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Backup file content
///
/// Data sections are kept as raw JSON so a backup stays readable even when
/// the typed model changes.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupArchive {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub app_version: String,
    /// Content of `filaments.json`
    pub filaments: serde_json::Value,
    /// Content of `price_history.json`
    pub prices: serde_json::Value,
    /// Content of `filament_usage.json`; absent in older backups
    #[serde(default = "empty_section")]
    pub usage: serde_json::Value,
}

fn empty_section() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Manages backup creation and retention
pub struct BackupManager {
    backup_dir: PathBuf,
    paths: SpoolPaths,
    /// 0 keeps every backup
    max_backups: u32,
}

impl BackupManager {
    pub fn new(paths: SpoolPaths, settings: &BackupSettings) -> Self {
        Self {
            backup_dir: paths.backup_dir(),
            paths,
            max_backups: settings.max_backups,
        }
    }

    pub fn max_backups(&self) -> u32 {
        self.max_backups
    }

    /// Whether any data file exists that a backup would capture
    pub fn has_data(&self) -> bool {
        self.paths.filaments_file().exists()
            || self.paths.price_history_file().exists()
            || self.paths.usage_file().exists()
    }

    /// Create a backup in the backup directory
    ///
    /// Returns the path to the created backup file. Retention is not applied;
    /// see [`BackupManager::create_backup_with_retention`].
    pub fn create_backup(&self) -> SpoolResult<PathBuf> {
        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| SpoolError::Io(format!("Failed to create backup directory: {}", e)))?;

        // Two backups in the same millisecond must not overwrite each other
        let mut timestamp = Utc::now();
        let mut backup_path = self.backup_dir.join(backup_filename(timestamp));
        while backup_path.exists() {
            timestamp += Duration::milliseconds(1);
            backup_path = self.backup_dir.join(backup_filename(timestamp));
        }

        self.write_archive(&backup_path, timestamp)?;
        info!(path = %backup_path.display(), "created backup");
        Ok(backup_path)
    }

    /// Write a backup to an explicit destination
    ///
    /// If `destination` is an existing directory the usual timestamped name
    /// is used inside it.
    pub fn create_backup_at(&self, destination: &Path) -> SpoolResult<PathBuf> {
        let timestamp = Utc::now();
        let path = if destination.is_dir() {
            destination.join(backup_filename(timestamp))
        } else {
            destination.to_path_buf()
        };

        self.write_archive(&path, timestamp)?;
        info!(path = %path.display(), "created backup");
        Ok(path)
    }

    fn write_archive(&self, path: &Path, timestamp: DateTime<Utc>) -> SpoolResult<()> {
        let archive = BackupArchive {
            schema_version: BACKUP_SCHEMA_VERSION,
            created_at: timestamp,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            filaments: read_json_value(&self.paths.filaments_file())?,
            prices: read_json_value(&self.paths.price_history_file())?,
            usage: read_json_value(&self.paths.usage_file())?,
        };

        let json = serde_json::to_vec_pretty(&archive)
            .map_err(|e| SpoolError::Json(format!("Failed to serialize backup: {}", e)))?;

        write_bytes_atomic(path, &json)
    }

    /// List all backups in the backup directory, newest first
    pub fn list_backups(&self) -> SpoolResult<Vec<BackupInfo>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)
            .map_err(|e| SpoolError::Io(format!("Failed to read backup directory: {}", e)))?
        {
            let entry = entry
                .map_err(|e| SpoolError::Io(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == BACKUP_EXTENSION) {
                if let Some(info) = parse_backup_info(&path) {
                    backups.push(info);
                }
            }
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });

        Ok(backups)
    }

    /// Delete the oldest backups until at most `max_backups` remain
    ///
    /// Returns the deleted paths. A file that cannot be removed is logged and
    /// skipped.
    pub fn enforce_retention(&self) -> SpoolResult<Vec<PathBuf>> {
        if self.max_backups == 0 {
            return Ok(Vec::new());
        }

        let backups = self.list_backups()?;
        let mut deleted = Vec::new();

        for backup in backups.into_iter().skip(self.max_backups as usize).rev() {
            match fs::remove_file(&backup.path) {
                Ok(()) => {
                    info!(path = %backup.path.display(), "pruned old backup");
                    deleted.push(backup.path);
                }
                Err(e) => {
                    warn!(path = %backup.path.display(), error = %e, "could not prune backup");
                }
            }
        }

        Ok(deleted)
    }

    /// Create a backup and then enforce the retention policy
    pub fn create_backup_with_retention(&self) -> SpoolResult<(PathBuf, Vec<PathBuf>)> {
        let backup_path = self.create_backup()?;
        let deleted = self.enforce_retention()?;
        Ok((backup_path, deleted))
    }

    pub fn backup_dir(&self) -> &PathBuf {
        &self.backup_dir
    }

    /// Get a specific backup by filename
    pub fn get_backup(&self, filename: &str) -> SpoolResult<Option<BackupInfo>> {
        let path = self.backup_dir.join(filename);
        if path.exists() {
            Ok(parse_backup_info(&path))
        } else {
            Ok(None)
        }
    }

    /// Resolve a backup given as a filename in the backup directory or a path
    pub fn resolve(&self, name_or_path: &str) -> SpoolResult<PathBuf> {
        if let Some(info) = self.get_backup(name_or_path)? {
            return Ok(info.path);
        }
        let path = PathBuf::from(name_or_path);
        if path.is_file() {
            Ok(path)
        } else {
            Err(SpoolError::backup_not_found(name_or_path))
        }
    }

    pub fn get_latest_backup(&self) -> SpoolResult<Option<BackupInfo>> {
        Ok(self.list_backups()?.into_iter().next())
    }
}

/// `backup-YYYYMMDD-HHMMSS-mmm.bak`
fn backup_filename(timestamp: DateTime<Utc>) -> String {
    format!(
        "backup-{}-{:03}.{}",
        timestamp.format("%Y%m%d-%H%M%S"),
        timestamp.timestamp_subsec_millis(),
        BACKUP_EXTENSION
    )
}

fn parse_backup_info(path: &Path) -> Option<BackupInfo> {
    let filename = path.file_name()?.to_string_lossy().to_string();

    let date_part = filename
        .strip_prefix("backup-")?
        .strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let created_at = parse_backup_timestamp(date_part)?;

    let size_bytes = fs::metadata(path).ok()?.len();

    Some(BackupInfo {
        filename,
        path: path.to_path_buf(),
        created_at,
        size_bytes,
    })
}

/// Read a JSON file as a generic Value, returning an empty object if it is missing
fn read_json_value(path: &Path) -> SpoolResult<serde_json::Value> {
    if !path.exists() {
        return Ok(empty_section());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| SpoolError::Io(format!("Failed to read file for backup: {}", e)))?;

    serde_json::from_str(&contents).map_err(|e| {
        SpoolError::CorruptData(format!("Failed to parse {} for backup: {}", path.display(), e))
    })
}

/// Parse `YYYYMMDD-HHMMSS` or `YYYYMMDD-HHMMSS-mmm`
fn parse_backup_timestamp(date_str: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = date_str.split('-').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return None;
    }

    let date_part = parts[0];
    let time_part = parts[1];
    let millis: u32 = match parts.get(2) {
        Some(ms) => ms.parse().ok()?,
        None => 0,
    };

    if date_part.len() != 8 || time_part.len() != 6 || !date_str.is_ascii() {
        return None;
    }

    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = chrono::NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;

    Some(DateTime::from_naive_utc_and_offset(
        chrono::NaiveDateTime::new(date, time),
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use tempfile::TempDir;

    fn create_test_manager(max_backups: u32) -> (BackupManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpoolPaths::with_base_dir(temp_dir.path().to_path_buf());
        paths.ensure_directories().unwrap();

        let settings = BackupSettings {
            max_backups,
            ..Default::default()
        };
        (BackupManager::new(paths, &settings), temp_dir)
    }

    /// Plant a backup file with a fixed timestamp in its name
    fn plant_backup(manager: &BackupManager, stamp: &str) -> PathBuf {
        let path = manager
            .backup_dir()
            .join(format!("backup-{}.{}", stamp, BACKUP_EXTENSION));
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_create_backup() {
        let (manager, _temp) = create_test_manager(10);

        let backup_path = manager.create_backup().unwrap();
        assert!(backup_path.exists());
        let name = backup_path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("backup-"));
        assert!(name.ends_with(".bak"));
    }

    #[test]
    fn test_same_millisecond_backups_do_not_collide() {
        let (manager, _temp) = create_test_manager(0);

        let paths: Vec<_> = (0..5).map(|_| manager.create_backup().unwrap()).collect();
        let mut unique = paths.clone();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert_eq!(manager.list_backups().unwrap().len(), 5);
    }

    #[test]
    fn test_list_backups_newest_first() {
        let (manager, _temp) = create_test_manager(10);
        plant_backup(&manager, "20240101-100000-000");
        plant_backup(&manager, "20240301-100000-000");
        plant_backup(&manager, "20240201-100000-000");
        fs::write(manager.backup_dir().join("notes.txt"), "ignored").unwrap();

        let months: Vec<_> = manager
            .list_backups()
            .unwrap()
            .iter()
            .map(|b| b.created_at.month())
            .collect();
        assert_eq!(months, vec![3, 2, 1]);
    }

    #[test]
    fn test_retention_deletes_oldest_first() {
        let (manager, _temp) = create_test_manager(3);
        let oldest = plant_backup(&manager, "20240101-000000-000");
        let second = plant_backup(&manager, "20240102-000000-000");
        plant_backup(&manager, "20240103-000000-000");
        plant_backup(&manager, "20240104-000000-000");
        plant_backup(&manager, "20240105-000000-000");

        let deleted = manager.enforce_retention().unwrap();
        assert_eq!(deleted, vec![oldest.clone(), second.clone()]);
        assert!(!oldest.exists());
        assert!(!second.exists());
        assert_eq!(manager.list_backups().unwrap().len(), 3);
    }

    #[test]
    fn test_zero_max_backups_keeps_everything() {
        let (manager, _temp) = create_test_manager(0);
        for day in 1..=4 {
            plant_backup(&manager, &format!("2024010{}-000000-000", day));
        }

        assert!(manager.enforce_retention().unwrap().is_empty());
        assert_eq!(manager.list_backups().unwrap().len(), 4);
    }

    #[test]
    fn test_create_backup_with_retention() {
        let (manager, _temp) = create_test_manager(2);
        let oldest = plant_backup(&manager, "20200101-000000-000");
        plant_backup(&manager, "20200102-000000-000");

        let (new_backup, deleted) = manager.create_backup_with_retention().unwrap();

        assert!(new_backup.exists());
        assert_eq!(deleted, vec![oldest]);
        assert_eq!(manager.list_backups().unwrap().len(), 2);
    }

    #[test]
    fn test_create_backup_at_explicit_path() {
        let (manager, temp) = create_test_manager(10);
        let dest = temp.path().join("elsewhere").join("snapshot.bak");

        let written = manager.create_backup_at(&dest).unwrap();
        assert_eq!(written, dest);
        assert!(dest.exists());
        assert!(manager.list_backups().unwrap().is_empty());

        let into_dir = manager.create_backup_at(temp.path()).unwrap();
        assert_eq!(into_dir.parent().unwrap(), temp.path());
    }

    #[test]
    fn test_backup_archive_structure() {
        let (manager, _temp) = create_test_manager(10);
        fs::write(
            manager.paths.filaments_file(),
            r#"{"filaments": []}"#,
        )
        .unwrap();

        let backup_path = manager.create_backup().unwrap();
        let contents = fs::read_to_string(&backup_path).unwrap();
        let archive: BackupArchive = serde_json::from_str(&contents).unwrap();

        assert_eq!(archive.schema_version, BACKUP_SCHEMA_VERSION);
        assert!(archive.filaments["filaments"].is_array());
        assert!(archive.prices.is_object());
        assert_eq!(archive.app_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_get_latest_and_resolve() {
        let (manager, _temp) = create_test_manager(10);
        assert!(manager.get_latest_backup().unwrap().is_none());

        let path = manager.create_backup().unwrap();
        let latest = manager.get_latest_backup().unwrap().unwrap();
        assert_eq!(latest.path, path);

        assert_eq!(manager.resolve(&latest.filename).unwrap(), path);
        assert!(manager.resolve("backup-missing.bak").unwrap_err().is_not_found());
    }

    #[test]
    fn test_parse_backup_timestamp() {
        let timestamp = parse_backup_timestamp("20251127-143022").unwrap();
        assert_eq!(timestamp.year(), 2025);
        assert_eq!(timestamp.month(), 11);
        assert_eq!(timestamp.day(), 27);

        let timestamp = parse_backup_timestamp("20251127-143022-456").unwrap();
        assert_eq!(timestamp.timestamp_subsec_millis(), 456);

        assert!(parse_backup_timestamp("2025-11-27").is_none());
        assert!(parse_backup_timestamp("20251127-143022-abc").is_none());
    }
}
