//! Usage ledger repository for JSON storage
//!
//! Manages loading and saving usage entries to filament_usage.json, kept
//! ordered by the time the filament was used.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::error::SpoolError;
use crate::models::{FilamentId, TimeWindow, UsageEntry};

use super::file_io::{read_json, write_json_atomic};

/// Serializable usage data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct UsageData {
    pub entries: Vec<UsageEntry>,
}

/// Repository for usage entry persistence
pub struct UsageRepository {
    path: PathBuf,
    data: RwLock<Vec<UsageEntry>>,
    dirty: AtomicBool,
}

impl UsageRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(Vec::new()),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load entries from disk
    pub fn load(&self) -> Result<(), SpoolError> {
        let mut file_data: UsageData = read_json(&self.path)?;
        file_data.entries.sort_by_key(|e| e.used_at);

        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        *data = file_data.entries;
        self.dirty.store(false, Ordering::SeqCst);

        debug!(count = data.len(), path = %self.path.display(), "loaded usage entries");
        Ok(())
    }

    /// Save entries to disk
    pub fn save(&self) -> Result<(), SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        write_json_atomic(
            &self.path,
            &UsageData {
                entries: data.clone(),
            },
        )?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Append an entry, keeping time order
    pub fn record(&self, entry: UsageEntry) -> Result<(), SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let index = data.partition_point(|e| e.used_at <= entry.used_at);
        data.insert(index, entry);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Every entry, oldest first
    pub fn all(&self) -> Result<Vec<UsageEntry>, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.clone())
    }

    /// Entries inside a window, oldest first
    pub fn in_window(&self, window: &TimeWindow) -> Result<Vec<UsageEntry>, SpoolError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| window.contains(e.used_at))
            .collect())
    }

    pub fn for_filament(&self, filament_id: FilamentId) -> Result<Vec<UsageEntry>, SpoolError> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|e| e.filament_id == filament_id)
            .collect())
    }

    pub fn count(&self) -> Result<usize, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.len())
    }

    pub fn clear(&self) -> Result<(), SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.clear();
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }
}
