//! Filament repository for JSON storage
//!
//! Manages loading and saving filament profiles to filaments.json

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::error::SpoolError;
use crate::models::{Filament, FilamentId};

use super::file_io::{read_json, write_json_atomic};

/// Serializable filament data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub(crate) struct FilamentData {
    pub filaments: Vec<Filament>,
}

/// Repository for filament persistence
pub struct FilamentRepository {
    path: PathBuf,
    data: RwLock<HashMap<FilamentId, Filament>>,
    dirty: AtomicBool,
}

impl FilamentRepository {
    /// Create a new filament repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load filaments from disk
    pub fn load(&self) -> Result<(), SpoolError> {
        let file_data: FilamentData = read_json(&self.path)?;

        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.clear();
        for filament in file_data.filaments {
            data.insert(filament.id, filament);
        }
        self.dirty.store(false, Ordering::SeqCst);

        debug!(count = data.len(), path = %self.path.display(), "loaded filaments");
        Ok(())
    }

    /// Save filaments to disk
    pub fn save(&self) -> Result<(), SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut filaments: Vec<_> = data.values().cloned().collect();
        filaments.sort_by_key(|f| (f.created_at, f.id));

        write_json_atomic(&self.path, &FilamentData { filaments })?;
        self.dirty.store(false, Ordering::SeqCst);

        debug!(count = data.len(), path = %self.path.display(), "saved filaments");
        Ok(())
    }

    /// Whether there are changes not yet written to disk
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Get a filament by ID
    pub fn get(&self, id: FilamentId) -> Result<Option<Filament>, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.get(&id).cloned())
    }

    /// Get all filaments, ordered by brand, material and color
    pub fn get_all(&self) -> Result<Vec<Filament>, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        let mut filaments: Vec<_> = data.values().cloned().collect();
        filaments.sort_by(|a, b| {
            a.brand
                .to_lowercase()
                .cmp(&b.brand.to_lowercase())
                .then_with(|| a.material.to_lowercase().cmp(&b.material.to_lowercase()))
                .then_with(|| a.color.to_lowercase().cmp(&b.color.to_lowercase()))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(filaments)
    }

    /// Filaments whose ID starts with the given fragment (short or full form)
    pub fn find_by_prefix(&self, fragment: &str) -> Result<Vec<Filament>, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data
            .values()
            .filter(|f| f.id.matches_prefix(fragment))
            .cloned()
            .collect())
    }

    /// Insert or update a filament
    pub fn upsert(&self, filament: Filament) -> Result<(), SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.insert(filament.id, filament);
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Delete a filament
    pub fn delete(&self, id: FilamentId) -> Result<Option<Filament>, SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        let removed = data.remove(&id);
        if removed.is_some() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        Ok(removed)
    }

    /// Check if a filament exists
    pub fn exists(&self, id: FilamentId) -> Result<bool, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.contains_key(&id))
    }

    /// Count filaments
    pub fn count(&self) -> Result<usize, SpoolError> {
        let data = self.data.read().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(data.len())
    }

    /// Drop everything held in memory and mark the repository dirty
    pub fn clear(&self) -> Result<(), SpoolError> {
        let mut data = self.data.write().map_err(|e| {
            SpoolError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;

        data.clear();
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, FilamentRepository) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("filaments.json");
        let repo = FilamentRepository::new(path);
        (temp_dir, repo)
    }

    #[test]
    fn test_empty_load() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();
        assert_eq!(repo.count().unwrap(), 0);
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_upsert_marks_dirty() {
        let (_temp_dir, repo) = create_test_repo();
        repo.load().unwrap();

        let filament = Filament::new("PLA", "red");
        let id = filament.id;
        repo.upsert(filament).unwrap();
        assert!(repo.is_dirty());

        repo.save().unwrap();
        assert!(!repo.is_dirty());
        assert_eq!(repo.get(id).unwrap().unwrap().color, "red");
    }

    #[test]
    fn test_save_and_reload() {
        let (temp_dir, repo) = create_test_repo();

        let filament = Filament::new("PETG", "black")
            .with_weight(750.0)
            .with_price(Money::from_cents(2399));
        let id = filament.id;

        repo.upsert(filament.clone()).unwrap();
        repo.save().unwrap();

        let repo2 = FilamentRepository::new(temp_dir.path().join("filaments.json"));
        repo2.load().unwrap();

        assert_eq!(repo2.get(id).unwrap().unwrap(), filament);
    }

    #[test]
    fn test_get_all_sorted() {
        let (_temp_dir, repo) = create_test_repo();
        repo.upsert(Filament::new("PLA", "red").with_brand("Zeta")).unwrap();
        repo.upsert(Filament::new("PETG", "blue").with_brand("alpha")).unwrap();
        repo.upsert(Filament::new("ABS", "white").with_brand("Alpha")).unwrap();

        let all = repo.get_all().unwrap();
        let materials: Vec<_> = all.iter().map(|f| f.material.as_str()).collect();
        assert_eq!(materials, vec!["ABS", "PETG", "PLA"]);
    }

    #[test]
    fn test_delete() {
        let (_temp_dir, repo) = create_test_repo();
        let filament = Filament::new("PLA", "red");
        let id = filament.id;

        repo.upsert(filament).unwrap();
        repo.save().unwrap();

        assert!(repo.delete(id).unwrap().is_some());
        assert!(repo.is_dirty());
        assert!(!repo.exists(id).unwrap());
        assert!(repo.delete(id).unwrap().is_none());
    }

    #[test]
    fn test_find_by_prefix() {
        let (_temp_dir, repo) = create_test_repo();
        let filament = Filament::new("PLA", "red");
        let short = filament.id.to_string();
        repo.upsert(filament.clone()).unwrap();
        repo.upsert(Filament::new("PLA", "blue")).unwrap();

        let found = repo.find_by_prefix(&short).unwrap();
        assert!(found.iter().any(|f| f.id == filament.id));
    }

    #[test]
    fn test_corrupt_file_fails_load() {
        let (temp_dir, repo) = create_test_repo();
        std::fs::write(temp_dir.path().join("filaments.json"), "{ nope").unwrap();
        assert!(matches!(repo.load(), Err(SpoolError::CorruptData(_))));
    }
}
