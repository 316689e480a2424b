//! Display formatting for terminal output
//!
//! Plain-text tables and detail views for filaments, prices, usage and
//! backups.

pub mod backup;
pub mod filament;
pub mod price;
pub mod usage;

pub use backup::{format_backup_list, format_size};
pub use filament::{format_filament_details, format_filament_list};
pub use price::{
    format_best_deals, format_price_alerts, format_price_history, format_price_statistics,
};
pub use usage::{format_cost_report, format_savings, format_usage_list};
