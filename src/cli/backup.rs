//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use clap::Subcommand;
use std::path::PathBuf;

use chrono::Utc;

use crate::backup::{BackupManager, BackupScheduler, RestoreManager};
use crate::config::paths::SpoolPaths;
use crate::config::settings::Settings;
use crate::display::backup::{format_backup_list, format_size};
use crate::error::{SpoolError, SpoolResult};
use tracing::info;

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Write the backup here instead of the backup directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename or path
        backup: String,
    },

    /// Delete the oldest backups beyond the configured maximum
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Create a scheduled backup if one is due
    RunDue,
}

/// Handle a backup command
pub fn handle_backup_command(
    paths: &SpoolPaths,
    settings: &Settings,
    cmd: BackupCommands,
) -> SpoolResult<()> {
    let manager = BackupManager::new(paths.clone(), &settings.backup);

    match cmd {
        BackupCommands::Create { output } => {
            println!("Creating backup...");
            let backup_path = match output {
                Some(output) => manager.create_backup_at(&output)?,
                None => manager.create_backup()?,
            };
            println!("Backup created: {}", display_filename(&backup_path));
            println!("Location: {}", backup_path.display());
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups()?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: spoolbook backup create");
                return Ok(());
            }

            if !verbose {
                println!("{}", format_backup_list(&backups).trim_end());
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = Utc::now().signed_duration_since(backup.created_at);
                println!(
                    "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n",
                    i + 1,
                    backup.filename,
                    backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    format_size(backup.size_bytes),
                    format_duration(age),
                );
            }

            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Restore { backup, force } => {
            let backup_path = resolve_backup_path(&manager, &backup)?;

            // Validate the backup first
            let restore_manager = RestoreManager::new(paths.clone(), &settings.backup);
            let validation = restore_manager.validate_backup(&backup_path)?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            println!(
                "Created: {}",
                validation.backup_date.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Schema version: {}", validation.schema_version);
            println!("Contents: {}", validation.summary());
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  spoolbook backup restore {} --force", backup);
                return Ok(());
            }

            println!("Restoring from backup...");
            let result = restore_manager.restore_from_file(&backup_path)?;

            if let Some(pre_restore) = &result.pre_restore_backup {
                println!("Previous data saved as: {}", display_filename(pre_restore));
            }
            println!("Restore complete!");
            println!("{}", result.summary());
        }

        BackupCommands::Info { backup } => {
            let backup_path = resolve_backup_path(&manager, &backup)?;

            let restore_manager = RestoreManager::new(paths.clone(), &settings.backup);
            let validation = restore_manager.validate_backup(&backup_path)?;

            let metadata = std::fs::metadata(&backup_path)?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(metadata.len()));
            println!(
                "Created: {}",
                validation.backup_date.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("Schema version: {}", validation.schema_version);
            if !validation.app_version.is_empty() {
                println!("Written by: spoolbook {}", validation.app_version);
            }
            println!();
            println!("Contents:");
            println!("  Filaments:          {}", validation.filament_count);
            println!("  Price observations: {}", validation.observation_count);
            println!("  Usage entries:      {}", validation.usage_count);
        }

        BackupCommands::Prune { force } => {
            let backups = manager.list_backups()?;
            let max_backups = manager.max_backups();

            if max_backups == 0 {
                println!("Retention is unlimited (max_backups = 0); nothing to prune.");
                return Ok(());
            }

            let to_delete = backups.len().saturating_sub(max_backups as usize);
            if to_delete == 0 {
                println!("No backups to prune.");
                println!(
                    "Keeping up to {} backup(s); you have {}.",
                    max_backups,
                    backups.len()
                );
                return Ok(());
            }

            println!("Prune Summary");
            println!("=============");
            println!("Retention policy: keep {} newest", max_backups);
            println!("Current backups: {}", backups.len());
            println!("To be deleted: {} (oldest first)", to_delete);
            println!();

            if !force {
                println!("To delete old backups, run again with --force flag:");
                println!("  spoolbook backup prune --force");
                return Ok(());
            }

            let deleted = manager.enforce_retention()?;
            println!("Deleted {} backup(s).", deleted.len());
        }

        BackupCommands::RunDue => {
            if !settings.backup.auto_backup {
                println!("Scheduled backups are disabled (backup.auto_backup = false).");
                return Ok(());
            }

            let scheduler = BackupScheduler::new(manager, settings.backup.interval);
            let now = Utc::now();
            match scheduler.run_if_due(now)? {
                Some(path) => println!("Scheduled backup created: {}", display_filename(&path)),
                None => println!(
                    "No backup due ({}); next at {}",
                    scheduler.interval(),
                    scheduler.next_due(now)?.format("%Y-%m-%d %H:%M:%S UTC")
                ),
            }
        }
    }

    Ok(())
}

/// Take the scheduled backup if one is due, before any command runs
///
/// Skipped when scheduled backups are off or there is no data yet.
pub fn run_startup_backup(paths: &SpoolPaths, settings: &Settings) -> SpoolResult<Option<PathBuf>> {
    if !settings.backup.auto_backup {
        return Ok(None);
    }

    let manager = BackupManager::new(paths.clone(), &settings.backup);
    if !manager.has_data() {
        return Ok(None);
    }

    let created = BackupScheduler::new(manager, settings.backup.interval).run_if_due(Utc::now())?;
    if let Some(path) = &created {
        info!(backup = %display_filename(path), "scheduled backup created");
    }
    Ok(created)
}

/// Resolve a backup identifier to a full path
fn resolve_backup_path(manager: &BackupManager, backup: &str) -> SpoolResult<PathBuf> {
    if backup.eq_ignore_ascii_case("latest") {
        return manager
            .get_latest_backup()?
            .map(|b| b.path)
            .ok_or_else(|| SpoolError::backup_not_found("latest"));
    }

    manager.resolve(backup)
}

fn display_filename(path: &std::path::Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format a duration in human-readable form
fn format_duration(duration: chrono::Duration) -> String {
    let total_seconds = duration.num_seconds();

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}
