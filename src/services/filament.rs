//! Filament profile service
//!
//! Business logic for the profile store: validated create and update,
//! cascading delete, filtered listing and free-text search. Every mutation
//! is written to disk before the call returns.

use std::str::FromStr;

use crate::audit::EntityType;
use crate::error::{SpoolError, SpoolResult};
use crate::models::{Filament, FilamentChanges, FilamentId};
use crate::storage::Storage;

/// Optional constraints for listing profiles; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct FilamentFilter {
    /// Exact material, case-insensitive
    pub material: Option<String>,
    /// Exact brand, case-insensitive
    pub brand: Option<String>,
    /// Substring of the color, case-insensitive
    pub color: Option<String>,
    /// Free-text terms, see [`FilamentService::search`]
    pub query: Option<String>,
    pub min_weight_grams: Option<f64>,
    pub max_weight_grams: Option<f64>,
}

impl FilamentFilter {
    pub fn is_empty(&self) -> bool {
        self.material.is_none()
            && self.brand.is_none()
            && self.color.is_none()
            && self.query.is_none()
            && self.min_weight_grams.is_none()
            && self.max_weight_grams.is_none()
    }

    pub fn matches(&self, filament: &Filament) -> bool {
        if let Some(material) = &self.material {
            if !filament.material.eq_ignore_ascii_case(material.trim()) {
                return false;
            }
        }
        if let Some(brand) = &self.brand {
            if !filament.brand.eq_ignore_ascii_case(brand.trim()) {
                return false;
            }
        }
        if let Some(color) = &self.color {
            if !filament
                .color
                .to_lowercase()
                .contains(&color.trim().to_lowercase())
            {
                return false;
            }
        }
        if let Some(query) = &self.query {
            if !matches_query(filament, query) {
                return false;
            }
        }
        if let Some(min) = self.min_weight_grams {
            if filament.weight_grams < min {
                return false;
            }
        }
        if let Some(max) = self.max_weight_grams {
            if filament.weight_grams > max {
                return false;
            }
        }
        true
    }
}

/// Ordering for profile listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Brand, then material, then color
    #[default]
    Name,
    Material,
    Color,
    /// Remaining weight, heaviest first
    Weight,
    /// Purchase price, cheapest first
    Price,
    /// Purchase date, newest first; undated profiles last
    PurchaseDate,
    /// Most recently modified first
    Updated,
}

impl FromStr for SortKey {
    type Err = SpoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "material" => Ok(Self::Material),
            "color" | "colour" => Ok(Self::Color),
            "weight" => Ok(Self::Weight),
            "price" => Ok(Self::Price),
            "date" | "purchase-date" | "purchase_date" => Ok(Self::PurchaseDate),
            "updated" => Ok(Self::Updated),
            other => Err(SpoolError::validation(
                "sort",
                format!(
                    "unknown sort key '{}' (expected name, material, color, weight, price, date or updated)",
                    other
                ),
            )),
        }
    }
}

fn sort_filaments(filaments: &mut [Filament], key: SortKey) {
    match key {
        // Repository order is already by name
        SortKey::Name => {}
        SortKey::Material => {
            filaments.sort_by_key(|f| (f.material.to_lowercase(), f.color.to_lowercase()))
        }
        SortKey::Color => {
            filaments.sort_by_key(|f| (f.color.to_lowercase(), f.material.to_lowercase()))
        }
        SortKey::Weight => filaments.sort_by(|a, b| b.weight_grams.total_cmp(&a.weight_grams)),
        SortKey::Price => filaments.sort_by_key(|f| f.purchase_price),
        SortKey::PurchaseDate => {
            filaments.sort_by(|a, b| match (a.purchase_date, b.purchase_date) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
        }
        SortKey::Updated => filaments.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
    }
}

/// Lowercase and keep only letters and digits, so "Silk-PLA+" matches "silk pla"
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Every term must appear in at least one searchable field
fn matches_query(filament: &Filament, query: &str) -> bool {
    let fields = [
        normalize(&filament.brand),
        normalize(&filament.material),
        normalize(&filament.color),
        normalize(&filament.notes),
    ];

    query
        .split_whitespace()
        .map(normalize)
        .filter(|term| !term.is_empty())
        .all(|term| fields.iter().any(|field| field.contains(&term)))
}

/// Service for filament profile management
pub struct FilamentService<'a> {
    storage: &'a Storage,
}

impl<'a> FilamentService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Store a new profile and return its id
    ///
    /// Name fields are trimmed before validation.
    pub fn create(&self, mut filament: Filament) -> SpoolResult<FilamentId> {
        filament.brand = filament.brand.trim().to_string();
        filament.material = filament.material.trim().to_string();
        filament.color = filament.color.trim().to_string();
        filament.validate()?;

        if self.storage.filaments.exists(filament.id)? {
            return Err(SpoolError::validation(
                "id",
                format!("a profile with id {} already exists", filament.id),
            ));
        }

        self.storage.filaments.upsert(filament.clone())?;
        self.storage.filaments.save()?;

        self.storage.log_create(
            EntityType::Filament,
            filament.id.to_string(),
            Some(filament.display_name()),
            &filament,
        )?;

        Ok(filament.id)
    }

    /// Get a profile, failing with `NotFound` if it does not exist
    pub fn read(&self, id: FilamentId) -> SpoolResult<Filament> {
        self.storage
            .filaments
            .get(id)?
            .ok_or_else(|| SpoolError::filament_not_found(id.to_string()))
    }

    pub fn get(&self, id: FilamentId) -> SpoolResult<Option<Filament>> {
        self.storage.filaments.get(id)
    }

    /// Resolve a full UUID or a unique short id such as `fil-1a2b3c4d`
    pub fn find(&self, identifier: &str) -> SpoolResult<Filament> {
        let identifier = identifier.trim();

        if let Ok(id) = FilamentId::parse(identifier) {
            return self.read(id);
        }

        let mut matches = self.storage.filaments.find_by_prefix(identifier)?;
        match matches.len() {
            0 => Err(SpoolError::filament_not_found(identifier)),
            1 => Ok(matches.remove(0)),
            n => Err(SpoolError::validation(
                "id",
                format!("'{}' is ambiguous ({} profiles match)", identifier, n),
            )),
        }
    }

    /// Apply changes to a profile
    ///
    /// The changes are validated against a copy first; on error the stored
    /// profile is left untouched.
    pub fn update(&self, id: FilamentId, changes: &FilamentChanges) -> SpoolResult<Filament> {
        let before = self.read(id)?;
        if changes.is_empty() {
            return Ok(before);
        }

        let mut after = before.clone();
        changes.apply_to(&mut after);
        after.validate()?;

        self.storage.filaments.upsert(after.clone())?;
        self.storage.filaments.save()?;

        self.storage.log_update(
            EntityType::Filament,
            after.id.to_string(),
            Some(after.display_name()),
            &before,
            &after,
        )?;

        Ok(after)
    }

    /// Delete a profile together with its price history
    pub fn delete(&self, id: FilamentId) -> SpoolResult<Filament> {
        let filament = self
            .storage
            .filaments
            .delete(id)?
            .ok_or_else(|| SpoolError::filament_not_found(id.to_string()))?;
        self.storage.filaments.save()?;

        if self.storage.prices.remove_for(id)? > 0 {
            self.storage.prices.save()?;
        }

        self.storage.log_delete(
            EntityType::Filament,
            filament.id.to_string(),
            Some(filament.display_name()),
            &filament,
        )?;

        Ok(filament)
    }

    /// List profiles, optionally filtered, in the requested order
    pub fn list(&self, filter: Option<&FilamentFilter>, sort: SortKey) -> SpoolResult<Vec<Filament>> {
        let mut filaments = match filter {
            Some(filter) => self.list_where(|f| filter.matches(f))?,
            None => self.storage.filaments.get_all()?,
        };
        sort_filaments(&mut filaments, sort);
        Ok(filaments)
    }

    /// List profiles matching an arbitrary predicate, in name order
    pub fn list_where<F>(&self, predicate: F) -> SpoolResult<Vec<Filament>>
    where
        F: Fn(&Filament) -> bool,
    {
        Ok(self
            .storage
            .filaments
            .get_all()?
            .into_iter()
            .filter(|f| predicate(f))
            .collect())
    }

    /// Profiles matching every whitespace-separated term of `query`
    ///
    /// Terms are compared case-insensitively against brand, material, color
    /// and notes with punctuation ignored. An empty query matches nothing.
    pub fn search(&self, query: &str) -> SpoolResult<Vec<Filament>> {
        if normalize(query).is_empty() {
            return Ok(Vec::new());
        }
        self.list_where(|f| matches_query(f, query))
    }

    /// Profiles at or below the low-stock threshold
    pub fn low_stock(&self, threshold_grams: f64) -> SpoolResult<Vec<Filament>> {
        self.list_where(|f| f.is_low_stock(threshold_grams))
    }

    pub fn count(&self) -> SpoolResult<usize> {
        self.storage.filaments.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpoolPaths;
    use crate::models::{Money, PriceObservation};
    use chrono::{NaiveDate, Utc};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpoolPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn red_pla() -> Filament {
        Filament::new("PLA", "red")
            .with_brand("Prusament")
            .with_weight(1000.0)
            .with_price(Money::from_cents(2000))
    }

    #[test]
    fn test_create_then_read_roundtrips() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);

        let filament = red_pla();
        let id = service.create(filament.clone()).unwrap();

        assert_eq!(id, filament.id);
        assert_eq!(service.read(id).unwrap(), filament);
        assert!(!storage.is_dirty());
    }

    #[test]
    fn test_create_rejects_invalid_profile() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);

        let err = service.create(Filament::new("  ", "red")).unwrap_err();
        assert_eq!(err.invalid_field(), Some("material"));

        let err = service.create(red_pla().with_weight(-5.0)).unwrap_err();
        assert_eq!(err.invalid_field(), Some("weight_grams"));
        assert_eq!(service.count().unwrap(), 0);
    }

    #[test]
    fn test_create_rejects_duplicate_id() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let filament = red_pla();

        service.create(filament.clone()).unwrap();
        assert!(service.create(filament).unwrap_err().is_validation());
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        assert!(service.read(FilamentId::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_applies_changes() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let id = service.create(red_pla()).unwrap();

        let changes = FilamentChanges {
            weight_grams: Some(640.0),
            notes: Some("dry before use".into()),
            ..Default::default()
        };
        let updated = service.update(id, &changes).unwrap();

        assert_eq!(updated.weight_grams, 640.0);
        assert_eq!(service.read(id).unwrap().notes, "dry before use");

        let audit = storage.audit().read_all().unwrap();
        assert!(audit
            .last()
            .and_then(|e| e.diff_summary.clone())
            .unwrap()
            .contains("weight_grams"));
    }

    #[test]
    fn test_rejected_update_leaves_profile_unchanged() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let id = service.create(red_pla()).unwrap();
        let original = service.read(id).unwrap();

        let changes = FilamentChanges {
            color: Some("blue".into()),
            purchase_price: Some(Money::from_cents(-1)),
            ..Default::default()
        };
        let err = service.update(id, &changes).unwrap_err();

        assert_eq!(err.invalid_field(), Some("purchase_price"));
        assert_eq!(service.read(id).unwrap(), original);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let changes = FilamentChanges {
            color: Some("blue".into()),
            ..Default::default()
        };
        assert!(service
            .update(FilamentId::new(), &changes)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_delete_cascades_to_prices() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let id = service.create(red_pla()).unwrap();
        storage
            .prices
            .record(PriceObservation::new(id, "shop", Money::from_cents(1999), Utc::now()))
            .unwrap();
        storage.prices.save().unwrap();

        service.delete(id).unwrap();

        assert!(service.read(id).unwrap_err().is_not_found());
        assert!(storage.prices.history(id).unwrap().is_empty());
        assert!(service.delete(id).unwrap_err().is_not_found());
        assert!(!storage.is_dirty());
    }

    #[test]
    fn test_list_with_filter_and_sort() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        service.create(red_pla()).unwrap();
        service
            .create(Filament::new("PETG", "dark red").with_weight(250.0))
            .unwrap();
        service
            .create(Filament::new("pla", "white").with_weight(800.0))
            .unwrap();

        let pla = FilamentFilter {
            material: Some("PLA".into()),
            ..Default::default()
        };
        assert_eq!(service.list(Some(&pla), SortKey::Name).unwrap().len(), 2);

        let reds = FilamentFilter {
            color: Some("RED".into()),
            ..Default::default()
        };
        let by_weight = service.list(Some(&reds), SortKey::Weight).unwrap();
        let weights: Vec<_> = by_weight.iter().map(|f| f.weight_grams).collect();
        assert_eq!(weights, vec![1000.0, 250.0]);

        let heavy = FilamentFilter {
            min_weight_grams: Some(500.0),
            ..Default::default()
        };
        assert_eq!(service.list(Some(&heavy), SortKey::Name).unwrap().len(), 2);
        assert_eq!(service.list(None, SortKey::Name).unwrap().len(), 3);
    }

    #[test]
    fn test_sort_by_purchase_date_puts_undated_last() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let old = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let new = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        service.create(Filament::new("PLA", "a")).unwrap();
        service.create(Filament::new("PLA", "b").with_purchase_date(old)).unwrap();
        service.create(Filament::new("PLA", "c").with_purchase_date(new)).unwrap();

        let colors: Vec<_> = service
            .list(None, SortKey::PurchaseDate)
            .unwrap()
            .into_iter()
            .map(|f| f.color)
            .collect();
        assert_eq!(colors, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_search_requires_all_terms() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        service
            .create(Filament::new("Silk-PLA+", "gold").with_brand("Eryone"))
            .unwrap();
        service.create(Filament::new("PLA", "gold")).unwrap();

        assert_eq!(service.search("silk gold").unwrap().len(), 1);
        assert_eq!(service.search("GOLD").unwrap().len(), 2);
        assert_eq!(service.search("pla+ eryone").unwrap().len(), 1);
        assert!(service.search("petg").unwrap().is_empty());
        assert!(service.search("  --  ").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_full_and_short_id() {
        let (_temp_dir, storage) = create_test_storage();
        let service = FilamentService::new(&storage);
        let id = service.create(red_pla()).unwrap();

        assert_eq!(service.find(&id.as_uuid().to_string()).unwrap().id, id);
        assert_eq!(service.find(&id.to_string()).unwrap().id, id);
        assert!(service.find("fil-zzzz").unwrap_err().is_not_found());
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("Weight".parse::<SortKey>().unwrap(), SortKey::Weight);
        assert_eq!("date".parse::<SortKey>().unwrap(), SortKey::PurchaseDate);
        assert!("size".parse::<SortKey>().unwrap_err().is_validation());
    }
}
