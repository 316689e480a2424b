//! Path management for Spoolbook
//!
//! Provides XDG-compliant path resolution for configuration, data, and backups.
//!
//! ## Path Resolution Order
//!
//! 1. `SPOOLBOOK_DATA_DIR` environment variable (if set)
//! 2. Unix (Linux/macOS): `$XDG_CONFIG_HOME/spoolbook` or `~/.config/spoolbook`
//! 3. Windows: `%APPDATA%\spoolbook`

use std::path::PathBuf;

use crate::error::SpoolError;

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "SPOOLBOOK_DATA_DIR";

/// Manages all paths used by Spoolbook
#[derive(Debug, Clone)]
pub struct SpoolPaths {
    /// Base directory for all Spoolbook data
    base_dir: PathBuf,
}

impl SpoolPaths {
    /// Create a new SpoolPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, SpoolError> {
        let base_dir = if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            PathBuf::from(custom)
        } else {
            resolve_default_path()?
        };

        Ok(Self { base_dir })
    }

    /// Create SpoolPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.config/spoolbook/ or equivalent)
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the data directory (~/.config/spoolbook/data/)
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join("data")
    }

    /// Get the backup directory (~/.config/spoolbook/backups/)
    pub fn backup_dir(&self) -> PathBuf {
        self.base_dir.join("backups")
    }

    /// Get the path to the settings file
    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the path to the audit log
    pub fn audit_log(&self) -> PathBuf {
        self.base_dir.join("audit.log")
    }

    /// Get the path to filaments.json
    pub fn filaments_file(&self) -> PathBuf {
        self.data_dir().join("filaments.json")
    }

    /// Get the path to price_history.json
    pub fn price_history_file(&self) -> PathBuf {
        self.data_dir().join("price_history.json")
    }

    /// Get the path to filament_usage.json
    pub fn usage_file(&self) -> PathBuf {
        self.data_dir().join("filament_usage.json")
    }

    /// Ensure all required directories exist
    pub fn ensure_directories(&self) -> Result<(), SpoolError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| SpoolError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.data_dir())
            .map_err(|e| SpoolError::Io(format!("Failed to create data directory: {}", e)))?;

        std::fs::create_dir_all(self.backup_dir())
            .map_err(|e| SpoolError::Io(format!("Failed to create backup directory: {}", e)))?;

        Ok(())
    }

    /// Check if Spoolbook has been initialized (config file exists)
    pub fn is_initialized(&self) -> bool {
        self.settings_file().exists()
    }
}

#[cfg(not(windows))]
fn resolve_default_path() -> Result<PathBuf, SpoolError> {
    let config_base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").map_err(|_| {
                SpoolError::Config("Could not determine HOME directory".into())
            })?;
            PathBuf::from(home).join(".config")
        }
    };
    Ok(config_base.join("spoolbook"))
}

#[cfg(windows)]
fn resolve_default_path() -> Result<PathBuf, SpoolError> {
    let appdata = std::env::var("APPDATA")
        .map_err(|_| SpoolError::Config("Could not determine APPDATA directory".into()))?;
    Ok(PathBuf::from(appdata).join("spoolbook"))
}
