//! Storage layer for Spoolbook
//!
//! Provides JSON file storage with atomic writes and automatic directory
//! creation. `Storage` is the handle every service borrows; there is no
//! global instance.

pub mod file_io;
pub mod filaments;
pub mod prices;
pub mod usage;

pub use file_io::{quarantine_file, read_json, write_json_atomic};
pub use filaments::FilamentRepository;
pub use prices::PriceRepository;
pub use usage::UsageRepository;

use std::collections::HashSet;

use serde::Serialize;
use tracing::warn;

use crate::audit::{generate_diff, AuditEntry, AuditLogger, EntityType};
use crate::config::SpoolPaths;
use crate::error::{SpoolError, SpoolResult};
use crate::models::FilamentId;

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: SpoolPaths,
    pub filaments: FilamentRepository,
    pub prices: PriceRepository,
    pub usage: UsageRepository,
    audit: AuditLogger,
}

impl Storage {
    /// Create a new Storage instance, creating the directory layout if needed
    pub fn new(paths: SpoolPaths) -> SpoolResult<Self> {
        paths.ensure_directories()?;

        Ok(Self {
            filaments: FilamentRepository::new(paths.filaments_file()),
            prices: PriceRepository::new(paths.price_history_file()),
            usage: UsageRepository::new(paths.usage_file()),
            audit: AuditLogger::new(paths.audit_log()),
            paths,
        })
    }

    pub fn paths(&self) -> &SpoolPaths {
        &self.paths
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Load all data from disk
    ///
    /// Fails with `CorruptData` if a data file exists but cannot be parsed.
    pub fn load_all(&self) -> SpoolResult<()> {
        self.filaments.load()?;
        self.prices.load()?;
        self.usage.load()?;
        Ok(())
    }

    /// Load all data, degrading unreadable files to an empty store
    ///
    /// A corrupt file is moved aside so the next save does not overwrite it.
    /// Price history for profiles that are no longer stored is dropped,
    /// unless the profile file itself was unreadable.
    /// Returns one warning per degraded file or dropped history.
    pub fn load_all_or_recover(&self) -> SpoolResult<Vec<String>> {
        let mut warnings = Vec::new();

        let profiles_loaded = match self.filaments.load() {
            Ok(()) => true,
            Err(e) => {
                warnings.push(self.recover(self.filaments.path(), e));
                self.filaments.clear()?;
                false
            }
        };
        if let Err(e) = self.prices.load() {
            warnings.push(self.recover(self.prices.path(), e));
            self.prices.clear()?;
        }
        if let Err(e) = self.usage.load() {
            warnings.push(self.recover(self.usage.path(), e));
            self.usage.clear()?;
        }

        // Profiles were lost, not deleted
        if !profiles_loaded {
            return Ok(warnings);
        }

        let known: HashSet<FilamentId> = self
            .filaments
            .get_all()?
            .into_iter()
            .map(|f| f.id)
            .collect();
        let orphans = self.prices.retain_filaments(&known)?;
        if orphans > 0 {
            let message = format!(
                "dropped {} price observation(s) that belong to no stored profile",
                orphans
            );
            warn!(path = %self.prices.path().display(), "{}", message);
            warnings.push(message);
            if let Err(e) = self.prices.save() {
                warn!(error = %e, "could not save the cleaned price history");
            }
        }

        Ok(warnings)
    }

    fn recover(&self, path: &std::path::Path, error: SpoolError) -> String {
        let message = match quarantine_file(path) {
            Ok(Some(moved)) => format!(
                "{}; starting with an empty store (previous file kept at {})",
                error,
                moved.display()
            ),
            Ok(None) => format!("{}; starting with an empty store", error),
            Err(move_error) => format!(
                "{}; starting with an empty store ({}; the next save will overwrite it)",
                error, move_error
            ),
        };
        warn!(path = %path.display(), "{}", message);
        message
    }

    /// Save every repository with unsaved changes
    pub fn save_all(&self) -> SpoolResult<()> {
        if self.filaments.is_dirty() {
            self.filaments.save()?;
        }
        if self.prices.is_dirty() {
            self.prices.save()?;
        }
        if self.usage.is_dirty() {
            self.usage.save()?;
        }
        Ok(())
    }

    /// Whether any repository has unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.filaments.is_dirty() || self.prices.is_dirty() || self.usage.is_dirty()
    }

    /// Check if storage has been initialized (settings written)
    pub fn is_initialized(&self) -> bool {
        self.paths.settings_file().exists()
    }

    pub fn log_create<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> SpoolResult<()> {
        self.audit
            .log(&AuditEntry::create(entity_type, entity_id, entity_name, entity))
    }

    /// Log an update, summarizing the changed fields
    pub fn log_update<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        before: &T,
        after: &T,
    ) -> SpoolResult<()> {
        let diff = match (serde_json::to_value(before), serde_json::to_value(after)) {
            (Ok(b), Ok(a)) => generate_diff(&b, &a),
            _ => None,
        };
        self.audit.log(&AuditEntry::update(
            entity_type,
            entity_id,
            entity_name,
            before,
            after,
            diff,
        ))
    }

    pub fn log_delete<T: Serialize>(
        &self,
        entity_type: EntityType,
        entity_id: impl Into<String>,
        entity_name: Option<String>,
        entity: &T,
    ) -> SpoolResult<()> {
        self.audit
            .log(&AuditEntry::delete(entity_type, entity_id, entity_name, entity))
    }
}
