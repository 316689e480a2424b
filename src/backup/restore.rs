//! Backup restoration for Spoolbook
//!
//! A backup is fully validated before anything on disk is touched. The
//! current data is then saved as a backup of its own and replaced.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::{BackupSettings, SpoolPaths};
use crate::error::{SpoolError, SpoolResult};
use crate::models::FilamentId;
use crate::storage::filaments::FilamentData;
use crate::storage::prices::PriceData;
use crate::storage::usage::UsageData;
use crate::storage::write_json_atomic;

use super::manager::{BackupArchive, BackupManager, BACKUP_SCHEMA_VERSION};

/// Handles restoring from backups
pub struct RestoreManager {
    paths: SpoolPaths,
    safety: BackupManager,
}

/// A backup that passed validation, with its typed content
struct CheckedBackup {
    archive: BackupArchive,
    filaments: FilamentData,
    prices: PriceData,
    usage: UsageData,
}

impl RestoreManager {
    pub fn new(paths: SpoolPaths, settings: &BackupSettings) -> Self {
        Self {
            safety: BackupManager::new(paths.clone(), settings),
            paths,
        }
    }

    /// Replace the current data with the content of a backup file
    ///
    /// Fails with `Format` without touching anything if the backup is not a
    /// valid Spoolbook backup. The store must be reloaded afterwards.
    pub fn restore_from_file(&self, backup_path: &Path) -> SpoolResult<RestoreResult> {
        let checked = read_backup(backup_path)?;

        self.paths.ensure_directories()?;

        let pre_restore_backup = if self.safety.has_data() {
            Some(self.safety.create_backup()?)
        } else {
            None
        };

        write_json_atomic(self.paths.filaments_file(), &checked.filaments)?;
        write_json_atomic(self.paths.price_history_file(), &checked.prices)?;
        write_json_atomic(self.paths.usage_file(), &checked.usage)?;

        let result = RestoreResult {
            schema_version: checked.archive.schema_version,
            backup_date: checked.archive.created_at,
            filaments_restored: checked.filaments.filaments.len(),
            observations_restored: checked.prices.observations.len(),
            usage_restored: checked.usage.entries.len(),
            pre_restore_backup,
        };

        info!(
            path = %backup_path.display(),
            filaments = result.filaments_restored,
            observations = result.observations_restored,
            "restored backup"
        );

        Ok(result)
    }

    /// Validate a backup file without restoring it
    pub fn validate_backup(&self, backup_path: &Path) -> SpoolResult<ValidationResult> {
        let checked = read_backup(backup_path)?;

        Ok(ValidationResult {
            schema_version: checked.archive.schema_version,
            backup_date: checked.archive.created_at,
            app_version: checked.archive.app_version,
            filament_count: checked.filaments.filaments.len(),
            observation_count: checked.prices.observations.len(),
            usage_count: checked.usage.entries.len(),
        })
    }
}

fn read_backup(backup_path: &Path) -> SpoolResult<CheckedBackup> {
    if !backup_path.exists() {
        return Err(SpoolError::backup_not_found(backup_path.display().to_string()));
    }

    let contents = fs::read_to_string(backup_path)
        .map_err(|e| SpoolError::Io(format!("Failed to read backup file: {}", e)))?;

    let archive: BackupArchive = serde_json::from_str(&contents)
        .map_err(|e| SpoolError::Format(format!("Not a valid backup file: {}", e)))?;

    if archive.schema_version > BACKUP_SCHEMA_VERSION {
        return Err(SpoolError::Format(format!(
            "Backup schema version {} is newer than supported version {}",
            archive.schema_version, BACKUP_SCHEMA_VERSION
        )));
    }

    let filaments: FilamentData = serde_json::from_value(archive.filaments.clone())
        .map_err(|e| SpoolError::Format(format!("Invalid filament section: {}", e)))?;
    let prices: PriceData = serde_json::from_value(archive.prices.clone())
        .map_err(|e| SpoolError::Format(format!("Invalid price section: {}", e)))?;
    let usage: UsageData = serde_json::from_value(archive.usage.clone())
        .map_err(|e| SpoolError::Format(format!("Invalid usage section: {}", e)))?;

    for filament in &filaments.filaments {
        filament.validate().map_err(|e| {
            SpoolError::Format(format!("Invalid filament {} in backup: {}", filament.id, e))
        })?;
    }

    let profile_ids: HashSet<FilamentId> = filaments.filaments.iter().map(|f| f.id).collect();
    for observation in &prices.observations {
        if observation.vendor.trim().is_empty() || observation.price.is_negative() {
            return Err(SpoolError::Format(format!(
                "Invalid price observation {} in backup",
                observation.id
            )));
        }
        if !profile_ids.contains(&observation.filament_id) {
            return Err(SpoolError::Format(format!(
                "Price observation {} in backup has no matching profile {}",
                observation.id, observation.filament_id
            )));
        }
    }

    for entry in &usage.entries {
        let valid = entry.grams_used.is_finite()
            && entry.grams_used > 0.0
            && !entry.cost.is_negative()
            && !entry.cost_per_kg.is_negative()
            && !entry.project.trim().is_empty();
        if !valid {
            return Err(SpoolError::Format(format!(
                "Invalid usage entry {} in backup",
                entry.id
            )));
        }
    }

    Ok(CheckedBackup {
        archive,
        filaments,
        prices,
        usage,
    })
}

/// Result of a restore operation
#[derive(Debug)]
pub struct RestoreResult {
    pub schema_version: u32,
    pub backup_date: DateTime<Utc>,
    pub filaments_restored: usize,
    pub observations_restored: usize,
    pub usage_restored: usize,
    /// Snapshot of the data that was replaced, if there was any
    pub pre_restore_backup: Option<PathBuf>,
}

impl RestoreResult {
    pub fn summary(&self) -> String {
        format!(
            "Restored {} filament(s), {} price observation(s) and {} usage entry(ies)",
            self.filaments_restored, self.observations_restored, self.usage_restored
        )
    }
}

/// Result of validating a backup
#[derive(Debug)]
pub struct ValidationResult {
    pub schema_version: u32,
    pub backup_date: DateTime<Utc>,
    pub app_version: String,
    pub filament_count: usize,
    pub observation_count: usize,
    pub usage_count: usize,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        format!(
            "{} filament(s), {} price observation(s), {} usage entry(ies)",
            self.filament_count, self.observation_count, self.usage_count
        )
    }
}
