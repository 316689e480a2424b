//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod archive;
pub mod backup;
pub mod filament;
pub mod price;
pub mod usage;

pub use archive::{handle_export_command, handle_export_csv_command, handle_import_command};
pub use backup::{handle_backup_command, run_startup_backup, BackupCommands};
pub use filament::{handle_filament_command, FilamentCommands};
pub use price::{handle_price_command, PriceCommands};
pub use usage::{handle_usage_command, UsageCommands};
