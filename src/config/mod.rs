//! Configuration module for Spoolbook
//!
//! This module provides configuration management including:
//! - XDG-compliant path resolution
//! - User settings persistence
//! - Backup schedule and retention preferences

pub mod paths;
pub mod settings;

pub use paths::SpoolPaths;
pub use settings::{BackupInterval, BackupSettings, Settings};
