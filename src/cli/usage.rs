//! Usage CLI commands
//!
//! Implements CLI commands for the usage ledger and cost reports.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use clap::Subcommand;

use crate::archive::{export_cost_report, ReportFormat};
use crate::config::settings::Settings;
use crate::display::usage::{format_cost_report, format_savings, format_usage_list};
use crate::error::{SpoolError, SpoolResult};
use crate::models::{ReportPeriod, TimeWindow};
use crate::services::{CostService, FilamentService};
use crate::storage::Storage;

use super::filament::parse_price;
use super::price::{parse_timestamp, recent_window};

/// Usage subcommands
#[derive(Subcommand)]
pub enum UsageCommands {
    /// Record filament used by a project
    Record {
        /// Profile ID or ID prefix
        filament: String,
        /// Grams used
        grams: f64,
        /// Project name
        #[arg(short, long)]
        project: String,
        /// When the filament was used (date or RFC 3339 timestamp, default now)
        #[arg(short, long)]
        at: Option<String>,
        /// Price per kg (default: purchase price over initial weight)
        #[arg(long)]
        cost_per_kg: Option<String>,
        /// Also take the grams off the spool's remaining weight
        #[arg(long)]
        consume: bool,
    },
    /// List recorded usage
    List {
        /// Only this profile (ID or ID prefix)
        #[arg(short, long)]
        filament: Option<String>,
        /// Only the last N days
        #[arg(short, long)]
        days: Option<i64>,
    },
    /// Cost report for a period or date range
    Report {
        /// daily, weekly, monthly, yearly or all
        #[arg(short, long, default_value = "all")]
        period: ReportPeriod,
        /// Start of a custom range (overrides --period)
        #[arg(long)]
        from: Option<String>,
        /// End of a custom range, inclusive (default now)
        #[arg(long)]
        to: Option<String>,
        /// Also write the report into this directory
        #[arg(short, long)]
        export: Option<PathBuf>,
        /// Export format: json or csv
        #[arg(short, long, default_value = "json")]
        format: ReportFormat,
    },
    /// Materials bought well above their lowest price
    Savings {
        /// daily, weekly, monthly, yearly or all
        #[arg(short, long, default_value = "all")]
        period: ReportPeriod,
    },
}

/// Handle a usage command
pub fn handle_usage_command(
    storage: &Storage,
    settings: &Settings,
    cmd: UsageCommands,
) -> SpoolResult<()> {
    let filaments = FilamentService::new(storage);
    let service = CostService::new(storage);
    let currency = settings.currency_symbol.as_str();

    match cmd {
        UsageCommands::Record {
            filament,
            grams,
            project,
            at,
            cost_per_kg,
            consume,
        } => {
            let found = filaments.find(&filament)?;
            let used_at = match at {
                Some(at) => parse_timestamp(&at, &settings.date_format)?,
                None => Utc::now(),
            };
            let cost_per_kg = cost_per_kg.as_deref().map(parse_price).transpose()?;

            let entry = service.record_usage(found.id, &project, grams, used_at, cost_per_kg)?;
            println!(
                "Recorded {:.1} g of {} for {} ({})",
                entry.grams_used,
                found.display_name(),
                entry.project,
                entry.cost.format_with_symbol(currency)
            );

            if consume {
                let updated = service.consume(&entry)?;
                println!("  Remaining on spool: {:.1} g", updated.weight_grams);
            }
        }

        UsageCommands::List { filament, days } => {
            let window = match days {
                Some(days) => recent_window(days)?,
                None => TimeWindow::all(),
            };
            let mut entries = service.entries(&window)?;
            if let Some(filament) = filament {
                let found = filaments.find(&filament)?;
                entries.retain(|e| e.filament_id == found.id);
            }

            println!("{}", format_usage_list(&entries, currency).trim_end());
        }

        UsageCommands::Report {
            period,
            from,
            to,
            export,
            format,
        } => {
            let (window, label) = if from.is_some() || to.is_some() {
                (custom_window(from, to, &settings.date_format)?, "custom".to_string())
            } else {
                (period.window(Utc::now()), period.to_string())
            };

            let report = service.report(&window, &label)?;
            println!("{}", format_cost_report(&report, currency).trim_end());

            if let Some(dir) = export {
                let path = export_cost_report(&report, format, &dir)?;
                println!();
                println!("Report written to {}", path.display());
            }
        }

        UsageCommands::Savings { period } => {
            let recommendations = service.savings_recommendations(&period.window(Utc::now()))?;
            println!("{}", format_savings(&recommendations, currency).trim_end());
        }
    }

    Ok(())
}

/// Window for `--from`/`--to`; a plain `--to` date covers that whole day
fn custom_window(
    from: Option<String>,
    to: Option<String>,
    date_format: &str,
) -> SpoolResult<TimeWindow> {
    let start = from
        .map(|from| parse_timestamp(&from, date_format))
        .transpose()?;
    let end = match to {
        Some(to) => parse_range_end(&to, date_format)?,
        None => Utc::now(),
    };

    if start.map_or(false, |start| start > end) {
        return Err(SpoolError::validation("from", "start is after the end of the range"));
    }

    Ok(TimeWindow {
        start,
        end: Some(end),
    })
}

fn parse_range_end(input: &str, date_format: &str) -> SpoolResult<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input.trim()) {
        return Ok(at.with_timezone(&Utc));
    }
    Ok(parse_timestamp(input, date_format)? + Duration::days(1) - Duration::milliseconds(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_custom_window_includes_whole_end_day() {
        let window = custom_window(
            Some("2024-05-01".into()),
            Some("2024-05-31".into()),
            "%Y-%m-%d",
        )
        .unwrap();

        assert!(window.contains(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 5, 31, 23, 59, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_custom_window_rejects_reversed_range() {
        let err = custom_window(
            Some("2024-06-01".into()),
            Some("2024-05-01".into()),
            "%Y-%m-%d",
        )
        .unwrap_err();
        assert_eq!(err.invalid_field(), Some("from"));
    }
}
