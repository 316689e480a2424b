//! Price history service
//!
//! Records price observations against existing profiles and derives
//! statistics, alerts and deals from the per-profile ledger.

use chrono::{DateTime, Utc};

use crate::audit::EntityType;
use crate::error::{SpoolError, SpoolResult};
use crate::models::{
    Filament, FilamentId, Money, PriceAlert, PriceObservation, PriceStatistics, TimeWindow,
};
use crate::storage::Storage;

/// Default minimum move, in percent, for [`PriceService::price_alerts`]
pub const DEFAULT_ALERT_THRESHOLD_PCT: f64 = 5.0;

/// Default look-back, in days, for price alerts
pub const DEFAULT_ALERT_DAYS: i64 = 7;

/// A profile together with its most recent observed price
#[derive(Debug, Clone)]
pub struct PriceDeal {
    pub filament: Filament,
    pub latest: PriceObservation,
}

/// Service for price observations
pub struct PriceService<'a> {
    storage: &'a Storage,
}

impl<'a> PriceService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    fn require_filament(&self, id: FilamentId) -> SpoolResult<Filament> {
        self.storage
            .filaments
            .get(id)?
            .ok_or_else(|| SpoolError::filament_not_found(id.to_string()))
    }

    /// Record a price seen for a profile
    pub fn record_price(
        &self,
        filament_id: FilamentId,
        vendor: &str,
        price: Money,
        observed_at: DateTime<Utc>,
    ) -> SpoolResult<PriceObservation> {
        let filament = self.require_filament(filament_id)?;

        let vendor = vendor.trim();
        if vendor.is_empty() {
            return Err(SpoolError::validation("vendor", "vendor cannot be empty"));
        }
        if price.is_negative() {
            return Err(SpoolError::validation("price", "price cannot be negative"));
        }

        let observation = PriceObservation::new(filament_id, vendor, price, observed_at);
        self.storage.prices.record(observation.clone())?;
        self.storage.prices.save()?;

        self.storage.log_create(
            EntityType::PriceObservation,
            observation.id.to_string(),
            Some(format!("{} @ {}", filament.display_name(), vendor)),
            &observation,
        )?;

        Ok(observation)
    }

    /// Every observation for a profile, oldest first
    pub fn history(&self, filament_id: FilamentId) -> SpoolResult<Vec<PriceObservation>> {
        self.require_filament(filament_id)?;
        self.storage.prices.history(filament_id)
    }

    /// Min, max, average and trend over the observations in `window`
    ///
    /// A window without observations yields [`PriceStatistics::no_data`].
    pub fn statistics(
        &self,
        filament_id: FilamentId,
        window: &TimeWindow,
    ) -> SpoolResult<PriceStatistics> {
        self.require_filament(filament_id)?;
        let observations = self.storage.prices.in_window(filament_id, window)?;
        let refs: Vec<&PriceObservation> = observations.iter().collect();
        Ok(PriceStatistics::from_sorted(&refs))
    }

    /// The most recent observation for a profile, if any
    pub fn latest_price(&self, filament_id: FilamentId) -> SpoolResult<Option<PriceObservation>> {
        Ok(self.history(filament_id)?.pop())
    }

    /// Profiles whose price moved by at least `threshold_pct` within `window`
    ///
    /// Compares the first and last observation in the window. Sorted by the
    /// size of the move, largest first.
    pub fn price_alerts(
        &self,
        threshold_pct: f64,
        window: &TimeWindow,
    ) -> SpoolResult<Vec<PriceAlert>> {
        let mut alerts = Vec::new();

        for filament_id in self.storage.prices.tracked_filaments()? {
            if !self.storage.filaments.exists(filament_id)? {
                continue;
            }
            let observations = self.storage.prices.in_window(filament_id, window)?;
            let (first, last) = match (observations.first(), observations.last()) {
                (Some(first), Some(last)) if observations.len() >= 2 => (first, last),
                _ => continue,
            };

            let change_pct = first.price.percent_change_to(last.price);
            if change_pct.abs() < threshold_pct || first.price == last.price {
                continue;
            }

            let num_changes = observations
                .windows(2)
                .filter(|pair| pair[0].price != pair[1].price)
                .count();

            alerts.push(PriceAlert {
                filament_id,
                old_price: first.price,
                new_price: last.price,
                change_pct,
                first_observed: first.observed_at,
                last_observed: last.observed_at,
                num_changes,
            });
        }

        alerts.sort_by(|a, b| b.change_pct.abs().total_cmp(&a.change_pct.abs()));
        Ok(alerts)
    }

    /// Cheapest profiles by their latest observed price
    ///
    /// `material` restricts the result to one material (case-insensitive).
    pub fn best_deals(&self, material: Option<&str>, limit: usize) -> SpoolResult<Vec<PriceDeal>> {
        let mut deals = Vec::new();

        for filament in self.storage.filaments.get_all()? {
            if let Some(material) = material {
                if !filament.material.eq_ignore_ascii_case(material.trim()) {
                    continue;
                }
            }
            if let Some(latest) = self.storage.prices.history(filament.id)?.pop() {
                deals.push(PriceDeal { filament, latest });
            }
        }

        deals.sort_by_key(|d| d.latest.price);
        deals.truncate(limit);
        Ok(deals)
    }
}
