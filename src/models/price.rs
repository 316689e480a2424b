//! Price observation model and window statistics
//!
//! Observations form a per-filament ledger. Statistics are computed over a
//! time window of that ledger, ordered by observation time.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{FilamentId, ObservationId};
use super::money::Money;

/// Relative change (percent) below which a trend counts as stable
pub const STABLE_THRESHOLD_PCT: f64 = 0.5;

/// One recorded price sample for a filament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub id: ObservationId,
    pub filament_id: FilamentId,
    /// Where the price was seen (shop name, "manual", ...)
    pub vendor: String,
    pub price: Money,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    pub fn new(
        filament_id: FilamentId,
        vendor: impl Into<String>,
        price: Money,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ObservationId::new(),
            filament_id,
            vendor: vendor.into(),
            price,
            observed_at,
        }
    }
}

/// Time range used to select observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    /// Inclusive lower bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Every observation ever recorded
    pub fn all() -> Self {
        Self::default()
    }

    /// The `days` days up to and including `now`
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Self {
        Self {
            start: Some(now - Duration::days(days)),
            end: Some(now),
        }
    }

    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

/// Direction of a price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Stable,
    Increasing,
    Decreasing,
}

impl fmt::Display for PriceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "stable"),
            Self::Increasing => write!(f, "increasing"),
            Self::Decreasing => write!(f, "decreasing"),
        }
    }
}

/// Aggregates over the observations in a window
///
/// An empty window yields `count == 0` with no min/max/average: that is the
/// "no data" result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceStatistics {
    pub count: usize,
    pub min: Option<Money>,
    pub max: Option<Money>,
    pub average: Option<Money>,
    pub trend: PriceTrend,
    /// Second-half average relative to first-half average, in percent
    pub change_pct: f64,
    pub first_observed: Option<DateTime<Utc>>,
    pub last_observed: Option<DateTime<Utc>>,
}

impl PriceStatistics {
    pub fn no_data() -> Self {
        Self {
            count: 0,
            min: None,
            max: None,
            average: None,
            trend: PriceTrend::Stable,
            change_pct: 0.0,
            first_observed: None,
            last_observed: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Compute statistics for observations already sorted by time
    pub fn from_sorted(observations: &[&PriceObservation]) -> Self {
        if observations.is_empty() {
            return Self::no_data();
        }

        let prices: Vec<Money> = observations.iter().map(|o| o.price).collect();
        let (trend, change_pct) = half_split_trend(&prices);

        Self {
            count: prices.len(),
            min: prices.iter().min().copied(),
            max: prices.iter().max().copied(),
            average: Money::average(&prices),
            trend,
            change_pct,
            first_observed: observations.first().map(|o| o.observed_at),
            last_observed: observations.last().map(|o| o.observed_at),
        }
    }
}

/// Compare the mean of the first half of a series with the mean of the second
///
/// With an odd count the middle sample belongs to neither half.
fn half_split_trend(prices: &[Money]) -> (PriceTrend, f64) {
    if prices.len() < 2 {
        return (PriceTrend::Stable, 0.0);
    }

    let half = prices.len() / 2;
    let first = Money::average(&prices[..half]);
    let second = Money::average(&prices[prices.len() - half..]);

    let change_pct = match (first, second) {
        (Some(first), Some(second)) => first.percent_change_to(second),
        _ => 0.0,
    };

    let trend = if change_pct.abs() < STABLE_THRESHOLD_PCT {
        PriceTrend::Stable
    } else if change_pct > 0.0 {
        PriceTrend::Increasing
    } else {
        PriceTrend::Decreasing
    };

    (trend, change_pct)
}

/// A significant price move within a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAlert {
    pub filament_id: FilamentId,
    pub old_price: Money,
    pub new_price: Money,
    pub change_pct: f64,
    pub first_observed: DateTime<Utc>,
    pub last_observed: DateTime<Utc>,
    /// Number of price changes between the first and last sample
    pub num_changes: usize,
}

impl PriceAlert {
    pub fn is_increase(&self) -> bool {
        self.change_pct > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()
    }

    fn series(prices: &[i64]) -> Vec<PriceObservation> {
        let id = FilamentId::new();
        prices
            .iter()
            .enumerate()
            .map(|(i, cents)| {
                PriceObservation::new(id, "shop", Money::from_cents(*cents), at(i as u32 + 1))
            })
            .collect()
    }

    fn stats(observations: &[PriceObservation]) -> PriceStatistics {
        let refs: Vec<&PriceObservation> = observations.iter().collect();
        PriceStatistics::from_sorted(&refs)
    }

    #[test]
    fn test_empty_is_no_data() {
        let result = stats(&[]);
        assert!(result.is_empty());
        assert_eq!(result.min, None);
        assert_eq!(result.average, None);
        assert_eq!(result.trend, PriceTrend::Stable);
    }

    #[test]
    fn test_single_observation_is_stable() {
        let result = stats(&series(&[2000]));
        assert_eq!(result.count, 1);
        assert_eq!(result.min, Some(Money::from_cents(2000)));
        assert_eq!(result.max, Some(Money::from_cents(2000)));
        assert_eq!(result.trend, PriceTrend::Stable);
    }

    #[test]
    fn test_min_max_average() {
        let result = stats(&series(&[2000, 1800, 2400, 2200]));
        assert_eq!(result.count, 4);
        assert_eq!(result.min, Some(Money::from_cents(1800)));
        assert_eq!(result.max, Some(Money::from_cents(2400)));
        assert_eq!(result.average, Some(Money::from_cents(2100)));
        assert_eq!(result.first_observed, Some(at(1)));
        assert_eq!(result.last_observed, Some(at(4)));
    }

    #[test]
    fn test_increasing_trend() {
        // first half avg 1900, second half avg 2300
        let result = stats(&series(&[2000, 1800, 2400, 2200]));
        assert_eq!(result.trend, PriceTrend::Increasing);
        assert!(result.change_pct > 20.0);
    }

    #[test]
    fn test_decreasing_trend_ignores_middle_sample() {
        // halves are [3000] and [2000]; 9999 sits in the middle
        let result = stats(&series(&[3000, 9999, 2000]));
        assert_eq!(result.trend, PriceTrend::Decreasing);
        assert!((result.change_pct + 33.333).abs() < 0.01);
    }

    #[test]
    fn test_small_moves_are_stable() {
        let result = stats(&series(&[10000, 10040]));
        assert_eq!(result.trend, PriceTrend::Stable);
    }

    #[test]
    fn test_window_contains() {
        let window = TimeWindow::between(at(2), at(4));
        assert!(!window.contains(at(1)));
        assert!(window.contains(at(2)));
        assert!(window.contains(at(4)));
        assert!(!window.contains(at(5)));
        assert!(TimeWindow::all().contains(at(1)));

        let recent = TimeWindow::last_days(7, at(10));
        assert!(recent.contains(at(3)));
        assert!(!recent.contains(at(2)));
    }
}
