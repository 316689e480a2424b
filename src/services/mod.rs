//! Service layer for Spoolbook
//!
//! The service layer provides business logic on top of the storage layer,
//! handling validation, persistence after each edit and audit logging.

pub mod cost;
pub mod filament;
pub mod price;

pub use cost::CostService;
pub use filament::{FilamentFilter, FilamentService, SortKey};
pub use price::{PriceDeal, PriceService, DEFAULT_ALERT_DAYS, DEFAULT_ALERT_THRESHOLD_PCT};
