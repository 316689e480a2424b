//! Core data models for Spoolbook
//!
//! This module contains the data structures of the inventory domain:
//! filament profiles, price observations and their statistics, and the
//! usage ledger behind cost reports.

pub mod filament;
pub mod ids;
pub mod money;
pub mod price;
pub mod usage;

pub use filament::{
    Filament, FilamentChanges, FilamentValidationError, SlicerSettings, DEFAULT_DIAMETER_MM,
};
pub use ids::{FilamentId, ObservationId, UsageId};
pub use money::{Money, MoneyParseError};
pub use price::{PriceAlert, PriceObservation, PriceStatistics, PriceTrend, TimeWindow};
pub use usage::{CostReport, ReportPeriod, SavingsRecommendation, UsageEntry};
