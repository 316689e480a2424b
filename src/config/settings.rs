//! User settings for Spoolbook
//!
//! Manages user preferences including display defaults and the backup
//! schedule and retention policy.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::paths::SpoolPaths;
use crate::error::SpoolError;

/// How often scheduled backups run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "hours")]
pub enum BackupInterval {
    Hourly,
    #[default]
    Daily,
    Weekly,
    /// Every N hours
    EveryHours(u32),
}

impl BackupInterval {
    /// Length of the interval
    pub fn duration(&self) -> chrono::Duration {
        match self {
            Self::Hourly => chrono::Duration::hours(1),
            Self::Daily => chrono::Duration::days(1),
            Self::Weekly => chrono::Duration::weeks(1),
            Self::EveryHours(hours) => chrono::Duration::hours(i64::from((*hours).max(1))),
        }
    }

    /// Parse an interval from a string ("hourly", "daily", "weekly", "6h")
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            other => other
                .strip_suffix('h')
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .map(Self::EveryHours),
        }
    }
}

impl fmt::Display for BackupInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::EveryHours(hours) => write!(f, "every {}h", hours),
        }
    }
}

/// Backup schedule and retention settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Maximum number of backups to keep (0 = unlimited)
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,

    /// Whether scheduled backups are enabled
    #[serde(default = "default_true")]
    pub auto_backup: bool,

    /// Scheduled backup cadence
    #[serde(default)]
    pub interval: BackupInterval,
}

fn default_max_backups() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            max_backups: default_max_backups(),
            auto_backup: true,
            interval: BackupInterval::default(),
        }
    }
}

/// User settings for Spoolbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Backup policy
    #[serde(default)]
    pub backup: BackupSettings,

    /// Default currency symbol
    #[serde(default = "default_currency")]
    pub currency_symbol: String,

    /// Date format preference (strftime format)
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Diameter used for new profiles when none is given
    #[serde(default = "default_diameter")]
    pub default_diameter_mm: f64,

    /// Spools at or below this remaining weight are flagged as low
    #[serde(default = "default_low_stock")]
    pub low_stock_grams: f64,
}

fn default_schema_version() -> u32 {
    1
}

fn default_currency() -> String {
    "$".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_diameter() -> f64 {
    1.75
}

fn default_low_stock() -> f64 {
    100.0
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            backup: BackupSettings::default(),
            currency_symbol: default_currency(),
            date_format: default_date_format(),
            default_diameter_mm: default_diameter(),
            low_stock_grams: default_low_stock(),
        }
    }
}

impl Settings {
    /// Load settings from disk, or create default settings if file doesn't exist
    pub fn load_or_create(paths: &SpoolPaths) -> Result<Self, SpoolError> {
        let settings_path = paths.settings_file();

        if settings_path.exists() {
            let contents = std::fs::read_to_string(&settings_path)
                .map_err(|e| SpoolError::Io(format!("Failed to read settings file: {}", e)))?;

            let settings: Settings = serde_json::from_str(&contents).map_err(|e| {
                SpoolError::Config(format!("Failed to parse settings file: {}", e))
            })?;

            Ok(settings)
        } else {
            // Don't save yet - let caller decide when to persist
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, paths: &SpoolPaths) -> Result<(), SpoolError> {
        paths.ensure_directories()?;

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SpoolError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(paths.settings_file(), contents)
            .map_err(|e| SpoolError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }
}
