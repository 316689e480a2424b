//! Usage and cost service
//!
//! Records how much filament each project consumed and turns the ledger
//! into cost reports and savings hints.

use chrono::{DateTime, Utc};

use crate::audit::EntityType;
use crate::error::{SpoolError, SpoolResult};
use crate::models::{
    CostReport, Filament, FilamentChanges, FilamentId, Money, SavingsRecommendation, TimeWindow,
    UsageEntry,
};
use crate::storage::Storage;

use super::filament::FilamentService;

/// Service for the usage ledger
pub struct CostService<'a> {
    storage: &'a Storage,
}

impl<'a> CostService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Record grams of a spool used by a project
    ///
    /// The entry is priced at `cost_per_kg` when given, otherwise at the
    /// spool's purchase price over its initial weight.
    pub fn record_usage(
        &self,
        filament_id: FilamentId,
        project: &str,
        grams_used: f64,
        used_at: DateTime<Utc>,
        cost_per_kg: Option<Money>,
    ) -> SpoolResult<UsageEntry> {
        let filament = FilamentService::new(self.storage).read(filament_id)?;

        let project = project.trim();
        if project.is_empty() {
            return Err(SpoolError::validation("project", "project cannot be empty"));
        }
        if !grams_used.is_finite() || grams_used <= 0.0 {
            return Err(SpoolError::validation(
                "grams_used",
                "grams used must be a positive number",
            ));
        }

        let cost_per_kg = match cost_per_kg.or_else(|| filament.cost_per_kg()) {
            Some(price) if price.is_negative() => {
                return Err(SpoolError::validation(
                    "cost_per_kg",
                    "cost per kg cannot be negative",
                ))
            }
            Some(price) => price,
            None => {
                return Err(SpoolError::validation(
                    "cost_per_kg",
                    format!(
                        "{} has no initial weight to price it by; give a cost per kg",
                        filament.display_name()
                    ),
                ))
            }
        };

        let entry = UsageEntry::new(&filament, project, grams_used, cost_per_kg, used_at);
        self.storage.usage.record(entry.clone())?;
        self.storage.usage.save()?;

        self.storage.log_create(
            EntityType::Usage,
            entry.id.to_string(),
            Some(format!("{} for {}", filament.display_name(), project)),
            &entry,
        )?;

        Ok(entry)
    }

    /// Take the grams of an entry off its spool's remaining weight
    ///
    /// The weight stops at zero.
    pub fn consume(&self, entry: &UsageEntry) -> SpoolResult<Filament> {
        let filaments = FilamentService::new(self.storage);
        let filament = filaments.read(entry.filament_id)?;

        let changes = FilamentChanges {
            weight_grams: Some((filament.weight_grams - entry.grams_used).max(0.0)),
            ..Default::default()
        };
        filaments.update(filament.id, &changes)
    }

    /// Ledger entries in `window`, oldest first
    pub fn entries(&self, window: &TimeWindow) -> SpoolResult<Vec<UsageEntry>> {
        self.storage.usage.in_window(window)
    }

    /// Totals over the entries in `window`, labelled `period`
    pub fn report(&self, window: &TimeWindow, period: &str) -> SpoolResult<CostReport> {
        let entries = self.entries(window)?;
        Ok(CostReport::from_entries(period, &entries))
    }

    /// Materials that were bought noticeably above their cheapest price
    pub fn savings_recommendations(
        &self,
        window: &TimeWindow,
    ) -> SpoolResult<Vec<SavingsRecommendation>> {
        let entries = self.entries(window)?;
        Ok(SavingsRecommendation::from_entries(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpoolPaths;
    use crate::models::ReportPeriod;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = SpoolPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        (temp_dir, storage)
    }

    fn add_spool(storage: &Storage, material: &str, price_cents: i64) -> FilamentId {
        FilamentService::new(storage)
            .create(
                Filament::new(material, "black")
                    .with_weight(1000.0)
                    .with_price(Money::from_cents(price_cents)),
            )
            .unwrap()
    }

    #[test]
    fn test_record_prices_from_spool() {
        let (_temp_dir, storage) = create_test_storage();
        let id = add_spool(&storage, "PLA", 2500);
        let service = CostService::new(&storage);

        let entry = service
            .record_usage(id, " benchy ", 40.0, Utc::now(), None)
            .unwrap();
        assert_eq!(entry.project, "benchy");
        assert_eq!(entry.cost_per_kg, Money::from_cents(2500));
        assert_eq!(entry.cost, Money::from_cents(100));
        assert!(!storage.is_dirty());

        let audit = storage.audit().read_all().unwrap();
        assert_eq!(audit.last().unwrap().entity_type, EntityType::Usage);
    }

    #[test]
    fn test_record_validates_input() {
        let (_temp_dir, storage) = create_test_storage();
        let id = add_spool(&storage, "PLA", 2500);
        let service = CostService::new(&storage);

        let err = service.record_usage(id, "x", 0.0, Utc::now(), None).unwrap_err();
        assert_eq!(err.invalid_field(), Some("grams_used"));
        let err = service
            .record_usage(id, "x", f64::NAN, Utc::now(), None)
            .unwrap_err();
        assert_eq!(err.invalid_field(), Some("grams_used"));
        let err = service.record_usage(id, "  ", 5.0, Utc::now(), None).unwrap_err();
        assert_eq!(err.invalid_field(), Some("project"));
        let err = service
            .record_usage(FilamentId::new(), "x", 5.0, Utc::now(), None)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(storage.usage.count().unwrap(), 0);
    }

    #[test]
    fn test_unpriced_spool_needs_explicit_cost() {
        let (_temp_dir, storage) = create_test_storage();
        let mut spool = Filament::new("TPU", "clear");
        spool.weight_grams = 300.0;
        let id = FilamentService::new(&storage).create(spool).unwrap();
        let service = CostService::new(&storage);

        let err = service.record_usage(id, "gasket", 10.0, Utc::now(), None).unwrap_err();
        assert_eq!(err.invalid_field(), Some("cost_per_kg"));

        let entry = service
            .record_usage(id, "gasket", 10.0, Utc::now(), Some(Money::from_cents(4000)))
            .unwrap();
        assert_eq!(entry.cost, Money::from_cents(40));
    }

    #[test]
    fn test_consume_stops_at_zero() {
        let (_temp_dir, storage) = create_test_storage();
        let id = add_spool(&storage, "PLA", 2000);
        let service = CostService::new(&storage);

        let entry = service.record_usage(id, "vase", 250.0, Utc::now(), None).unwrap();
        assert_eq!(service.consume(&entry).unwrap().weight_grams, 750.0);

        let big = service.record_usage(id, "vase", 900.0, Utc::now(), None).unwrap();
        assert_eq!(service.consume(&big).unwrap().weight_grams, 0.0);
    }

    #[test]
    fn test_report_and_savings_over_window() {
        let (_temp_dir, storage) = create_test_storage();
        let cheap = add_spool(&storage, "PLA", 2000);
        let pricey = add_spool(&storage, "PLA", 3000);
        let petg = add_spool(&storage, "PETG", 2500);
        let service = CostService::new(&storage);
        let now = Utc.with_ymd_and_hms(2024, 9, 30, 12, 0, 0).unwrap();

        service.record_usage(cheap, "a", 500.0, now - Duration::days(2), None).unwrap();
        service.record_usage(pricey, "b", 500.0, now - Duration::days(1), None).unwrap();
        service.record_usage(petg, "b", 100.0, now - Duration::days(3), None).unwrap();
        // outside a weekly window
        service.record_usage(petg, "old", 100.0, now - Duration::days(40), None).unwrap();

        let window = ReportPeriod::Weekly.window(now);
        let report = service.report(&window, "weekly").unwrap();
        assert_eq!(report.entry_count, 3);
        assert_eq!(report.project_count, 2);
        assert_eq!(report.total_cost, Money::from_cents(2750));
        assert_eq!(report.most_used.as_deref(), Some("PLA"));

        let all = service.report(&TimeWindow::all(), "all_time").unwrap();
        assert_eq!(all.entry_count, 4);

        let savings = service.savings_recommendations(&window).unwrap();
        assert_eq!(savings.len(), 1);
        assert_eq!(savings[0].material, "PLA");
        assert_eq!(savings[0].potential_savings, Money::from_cents(500));

        let empty = service
            .report(&ReportPeriod::Daily.window(now - Duration::days(100)), "daily")
            .unwrap();
        assert!(empty.is_empty());
    }
}
