//! Profile archives and inventory exports
//!
//! An archive is a gzip-compressed tar file:
//!
//! ```text
//! manifest.json            format version, export time, counts
//! profiles/<uuid>.json     one filament profile
//! prices/<uuid>.json       that profile's price observations (if any)
//! ```
//!
//! Importing merges by profile id, so importing the same archive twice
//! leaves the store as it was after the first import.
//!
//! Cost reports are written separately as JSON or CSV files.

mod export;
mod import;
mod inventory;
mod report;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use export::export_profiles;
pub use import::{import_profiles, ImportReport};
pub use inventory::export_inventory_csv;
pub use report::{export_cost_report, ReportFormat};

/// Current archive layout version
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

pub(crate) const MANIFEST_ENTRY: &str = "manifest.json";
pub(crate) const PROFILES_DIR: &str = "profiles";
pub(crate) const PRICES_DIR: &str = "prices";

/// Describes the content of an archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveManifest {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub app_version: String,
    pub profile_count: usize,
    #[serde(default)]
    pub observation_count: usize,
}
