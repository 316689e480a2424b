//! Filament consumption and cost reporting
//!
//! A `UsageEntry` records grams of one spool spent on a project, priced at
//! the spool's cost per kilogram when it was recorded. Reports and savings
//! hints are computed from a slice of entries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filament::Filament;
use super::ids::{FilamentId, UsageId};
use super::money::Money;
use super::price::TimeWindow;

/// A material is flagged once its average cost per kg exceeds the cheapest
/// price paid for it by this factor
pub const SAVINGS_MARGIN: f64 = 1.1;

/// Filament spent on a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEntry {
    pub id: UsageId,
    pub filament_id: FilamentId,
    /// Material of the spool at the time of use
    pub material: String,
    pub project: String,
    pub grams_used: f64,
    pub cost_per_kg: Money,
    /// `grams_used` priced at `cost_per_kg`
    pub cost: Money,
    pub used_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl UsageEntry {
    pub fn new(
        filament: &Filament,
        project: impl Into<String>,
        grams_used: f64,
        cost_per_kg: Money,
        used_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UsageId::new(),
            filament_id: filament.id,
            material: filament.material.clone(),
            project: project.into(),
            grams_used,
            cost_per_kg,
            cost: cost_of(grams_used, cost_per_kg),
            used_at,
            recorded_at: Utc::now(),
        }
    }

    /// Material name used to group entries
    pub fn material_key(&self) -> String {
        self.material.trim().to_uppercase()
    }
}

/// Price of `grams` at `cost_per_kg`, rounded to the cent
pub fn cost_of(grams: f64, cost_per_kg: Money) -> Money {
    Money::from_cents((cost_per_kg.cents() as f64 * grams / 1000.0).round() as i64)
}

fn per_kg(cost: Money, grams: f64) -> Option<Money> {
    if grams > 0.0 {
        Some(Money::from_cents(
            (cost.cents() as f64 * 1000.0 / grams).round() as i64,
        ))
    } else {
        None
    }
}

/// Look-back period for cost reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    #[default]
    AllTime,
}

impl ReportPeriod {
    /// Entries in this period as seen from `now`
    pub fn window(&self, now: DateTime<Utc>) -> TimeWindow {
        let days = match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Yearly => 365,
            Self::AllTime => return TimeWindow::all(),
        };
        TimeWindow::last_days(days, now)
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
            Self::Yearly => write!(f, "yearly"),
            Self::AllTime => write!(f, "all_time"),
        }
    }
}

impl FromStr for ReportPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" => Ok(Self::Yearly),
            "all" | "all-time" | "all_time" => Ok(Self::AllTime),
            other => Err(format!(
                "unknown period '{}' (daily, weekly, monthly, yearly or all)",
                other
            )),
        }
    }
}

/// Totals over the usage entries of a period
///
/// A period without entries gives `entry_count == 0`; the derived fields are
/// then `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostReport {
    /// Period label, e.g. "monthly" or "custom"
    pub period: String,
    /// Earliest entry in the report
    pub start: Option<DateTime<Utc>>,
    /// Latest entry in the report
    pub end: Option<DateTime<Utc>>,
    pub entry_count: usize,
    pub total_grams: f64,
    pub total_cost: Money,
    /// Weighted by grams used
    pub cost_per_kg: Option<Money>,
    pub usage_by_material: BTreeMap<String, f64>,
    pub cost_by_material: BTreeMap<String, Money>,
    pub project_count: usize,
    pub cost_per_project: Option<Money>,
    pub most_used: Option<String>,
    pub least_used: Option<String>,
}

impl CostReport {
    pub fn from_entries(period: impl Into<String>, entries: &[UsageEntry]) -> Self {
        let mut usage_by_material: BTreeMap<String, f64> = BTreeMap::new();
        let mut cost_by_material: BTreeMap<String, Money> = BTreeMap::new();
        let mut projects = BTreeSet::new();

        for entry in entries {
            let key = entry.material_key();
            *usage_by_material.entry(key.clone()).or_default() += entry.grams_used;
            *cost_by_material.entry(key).or_default() += entry.cost;
            projects.insert(entry.project.trim().to_lowercase());
        }

        let total_grams: f64 = entries.iter().map(|e| e.grams_used).sum();
        let total_cost: Money = entries.iter().map(|e| e.cost).sum();
        let project_count = projects.len();

        // ties go to the alphabetically first material
        let most_used = usage_by_material
            .iter()
            .min_by(|a, b| b.1.total_cmp(a.1))
            .map(|(material, _)| material.clone());
        let least_used = usage_by_material
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(material, _)| material.clone());

        Self {
            period: period.into(),
            start: entries.iter().map(|e| e.used_at).min(),
            end: entries.iter().map(|e| e.used_at).max(),
            entry_count: entries.len(),
            total_grams,
            total_cost,
            cost_per_kg: per_kg(total_cost, total_grams),
            usage_by_material,
            cost_by_material,
            project_count,
            cost_per_project: (project_count > 0)
                .then(|| Money::from_cents(total_cost.cents() / project_count as i64)),
            most_used,
            least_used,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// A material bought above the cheapest price seen for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsRecommendation {
    pub material: String,
    pub grams_used: f64,
    pub average_cost_per_kg: Money,
    pub lowest_cost_per_kg: Money,
    /// What the same grams would have cost less at the lowest price
    pub potential_savings: Money,
}

impl SavingsRecommendation {
    /// One recommendation per material whose average cost per kg exceeds the
    /// lowest by more than [`SAVINGS_MARGIN`], largest savings first
    pub fn from_entries(entries: &[UsageEntry]) -> Vec<Self> {
        let mut by_material: BTreeMap<String, Vec<&UsageEntry>> = BTreeMap::new();
        for entry in entries {
            by_material.entry(entry.material_key()).or_default().push(entry);
        }

        let mut recommendations: Vec<Self> = by_material
            .into_iter()
            .filter_map(|(material, entries)| {
                let grams: f64 = entries.iter().map(|e| e.grams_used).sum();
                let cost: Money = entries.iter().map(|e| e.cost).sum();
                let average = per_kg(cost, grams)?;
                let lowest = entries.iter().map(|e| e.cost_per_kg).min()?;

                if average.cents() as f64 <= lowest.cents() as f64 * SAVINGS_MARGIN {
                    return None;
                }

                Some(Self {
                    material,
                    grams_used: grams,
                    average_cost_per_kg: average,
                    lowest_cost_per_kg: lowest,
                    potential_savings: cost_of(grams, average - lowest),
                })
            })
            .collect();

        recommendations.sort_by(|a, b| {
            b.potential_savings
                .cmp(&a.potential_savings)
                .then_with(|| a.material.cmp(&b.material))
        });
        recommendations
    }
}
