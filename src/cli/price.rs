//! Price CLI commands
//!
//! Implements CLI commands for recording and analysing filament prices.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::price::{
    format_best_deals, format_price_alerts, format_price_history, format_price_statistics,
};
use crate::error::{SpoolError, SpoolResult};
use crate::models::TimeWindow;
use crate::services::{
    FilamentService, PriceService, DEFAULT_ALERT_DAYS, DEFAULT_ALERT_THRESHOLD_PCT,
};
use crate::storage::Storage;

use super::filament::{parse_date, parse_price};

const MAX_WINDOW_DAYS: i64 = 365 * 100;

/// Price subcommands
#[derive(Subcommand)]
pub enum PriceCommands {
    /// Record a price seen at a vendor
    Record {
        /// Profile ID or ID prefix
        filament: String,
        /// Price (e.g., "22.49")
        price: String,
        /// Vendor or shop name
        #[arg(short, long)]
        vendor: String,
        /// When the price was seen (date or RFC 3339 timestamp, default now)
        #[arg(short, long)]
        at: Option<String>,
    },
    /// Show every recorded price for a profile
    History {
        /// Profile ID or ID prefix
        filament: String,
    },
    /// Show min, max, average and trend for a profile
    Stats {
        /// Profile ID or ID prefix
        filament: String,
        /// Only the last N days
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// List profiles whose price moved significantly
    Alerts {
        /// Minimum change in percent
        #[arg(short, long, default_value_t = DEFAULT_ALERT_THRESHOLD_PCT)]
        threshold: f64,
        /// Look-back period in days
        #[arg(short, long, default_value_t = DEFAULT_ALERT_DAYS)]
        days: i64,
    },
    /// Cheapest profiles by latest price
    Deals {
        /// Only this material
        #[arg(short, long)]
        material: Option<String>,
        /// Number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

/// Handle a price command
pub fn handle_price_command(
    storage: &Storage,
    settings: &Settings,
    cmd: PriceCommands,
) -> SpoolResult<()> {
    let filaments = FilamentService::new(storage);
    let service = PriceService::new(storage);
    let currency = settings.currency_symbol.as_str();

    match cmd {
        PriceCommands::Record {
            filament,
            price,
            vendor,
            at,
        } => {
            let found = filaments.find(&filament)?;
            let observed_at = match at {
                Some(at) => parse_timestamp(&at, &settings.date_format)?,
                None => Utc::now(),
            };

            let observation =
                service.record_price(found.id, &vendor, parse_price(&price)?, observed_at)?;
            println!(
                "Recorded {} at {} for {}",
                observation.price.format_with_symbol(currency),
                observation.vendor,
                found.display_name()
            );
        }

        PriceCommands::History { filament } => {
            let found = filaments.find(&filament)?;
            let history = service.history(found.id)?;

            println!("Price history: {}", found.display_name());
            println!();
            println!("{}", format_price_history(&history, currency).trim_end());
        }

        PriceCommands::Stats { filament, days } => {
            let found = filaments.find(&filament)?;
            let window = match days {
                Some(days) => recent_window(days)?,
                None => TimeWindow::all(),
            };
            let stats = service.statistics(found.id, &window)?;

            println!("Price statistics: {}", found.display_name());
            println!();
            println!("{}", format_price_statistics(&stats, currency).trim_end());
        }

        PriceCommands::Alerts { threshold, days } => {
            if threshold < 0.0 {
                return Err(SpoolError::validation(
                    "threshold",
                    "threshold cannot be negative",
                ));
            }

            let window = recent_window(days)?;
            let alerts = service.price_alerts(threshold, &window)?;
            let names: HashMap<_, _> = storage
                .filaments
                .get_all()?
                .into_iter()
                .map(|f| (f.id, f.display_name()))
                .collect();

            println!("{}", format_price_alerts(&alerts, &names, currency).trim_end());
        }

        PriceCommands::Deals { material, limit } => {
            let deals = service.best_deals(material.as_deref(), limit)?;
            println!("{}", format_best_deals(&deals, currency).trim_end());
        }
    }

    Ok(())
}

pub(crate) fn recent_window(days: i64) -> SpoolResult<TimeWindow> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(SpoolError::validation(
            "days",
            format!("must be between 1 and {}", MAX_WINDOW_DAYS),
        ));
    }
    Ok(TimeWindow::last_days(days, Utc::now()))
}

/// Parse an RFC 3339 timestamp, or a plain date taken as midnight UTC
pub(crate) fn parse_timestamp(input: &str, date_format: &str) -> SpoolResult<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input.trim()) {
        return Ok(at.with_timezone(&Utc));
    }

    let date = parse_date(input, date_format)?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| SpoolError::validation("date", format!("'{}' has no midnight", input)))?;
    Ok(Utc.from_utc_datetime(&midnight))
}
