//! Price history repository for JSON storage
//!
//! Manages loading and saving price observations to price_history.json.
//! Observations are grouped per filament and kept ordered by time.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::error::SpoolError;
use crate::models::{FilamentId, ObservationId, PriceObservation, TimeWindow};

use super::file_io::{read_json, write_json_atomic};

/// Serializable price data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct PriceData {
    pub observations: Vec<PriceObservation>,
}

/// Repository for price observation persistence
pub struct PriceRepository {
    path: PathBuf,
    data: RwLock<HashMap<FilamentId, Vec<PriceObservation>>>,
    dirty: AtomicBool,
}

/// Insert keeping the list ordered by `observed_at`; equal timestamps keep
/// insertion order
fn insert_sorted(list: &mut Vec<PriceObservation>, observation: PriceObservation) {
    let index = list.partition_point(|o| o.observed_at <= observation.observed_at);
    list.insert(index, observation);
}

impl PriceRepository {
    /// Create a new price repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load observations from disk
    pub fn load(&self) -> Result<(), SpoolError> {
        let file_data: PriceData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.clear();
        for observation in file_data.observations {
            insert_sorted(data.entry(observation.filament_id).or_default(), observation);
        }
        self.dirty.store(false, Ordering::SeqCst);

        debug!(filaments = data.len(), path = %self.path.display(), "loaded price history");
        Ok(())
    }

    /// Save observations to disk
    pub fn save(&self) -> Result<(), SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut ids: Vec<_> = data.keys().copied().collect();
        ids.sort();
        let observations = ids
            .iter()
            .flat_map(|id| data[id].iter().cloned())
            .collect();

        write_json_atomic(&self.path, &PriceData { observations })?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Append an observation
    pub fn record(&self, observation: PriceObservation) -> Result<(), SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        insert_sorted(data.entry(observation.filament_id).or_default(), observation);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Add an observation unless one with the same ID is already present
    ///
    /// Returns whether it was added.
    pub fn merge(&self, observation: PriceObservation) -> Result<bool, SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let list = data.entry(observation.filament_id).or_default();
        if list.iter().any(|o| o.id == observation.id) {
            return Ok(false);
        }
        insert_sorted(list, observation);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(true)
    }

    /// All observations for a filament, oldest first
    pub fn history(&self, filament_id: FilamentId) -> Result<Vec<PriceObservation>, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.get(&filament_id).cloned().unwrap_or_default())
    }

    /// Observations for a filament inside a window, oldest first
    pub fn in_window(
        &self,
        filament_id: FilamentId,
        window: &TimeWindow,
    ) -> Result<Vec<PriceObservation>, SpoolError> {
        Ok(self
            .history(filament_id)?
            .into_iter()
            .filter(|o| window.contains(o.observed_at))
            .collect())
    }

    /// Filaments that have at least one observation
    pub fn tracked_filaments(&self) -> Result<Vec<FilamentId>, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut ids: Vec<_> = data
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Remove every observation of a filament, returning how many were dropped
    pub fn remove_for(&self, filament_id: FilamentId) -> Result<usize, SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let removed = data.remove(&filament_id).map_or(0, |list| list.len());
        if removed > 0 {
            self.dirty.store(true, Ordering::SeqCst);
        }
        Ok(removed)
    }

    /// Remove the given observations, returning how many were found
    pub fn remove_ids(&self, ids: &[ObservationId]) -> Result<usize, SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let mut removed = 0;
        for list in data.values_mut() {
            let before = list.len();
            list.retain(|o| !ids.contains(&o.id));
            removed += before - list.len();
        }
        data.retain(|_, list| !list.is_empty());
        if removed > 0 {
            self.dirty.store(true, Ordering::SeqCst);
        }
        Ok(removed)
    }

    /// Drop the history of every filament not in `known`
    pub fn retain_filaments(&self, known: &HashSet<FilamentId>) -> Result<usize, SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let mut removed = 0;
        data.retain(|id, list| {
            let keep = known.contains(id);
            if !keep {
                removed += list.len();
            }
            keep
        });
        if removed > 0 {
            self.dirty.store(true, Ordering::SeqCst);
        }
        Ok(removed)
    }

    /// Total number of observations
    pub fn count(&self) -> Result<usize, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.values().map(Vec::len).sum())
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
