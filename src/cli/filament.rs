//! Filament CLI commands
//!
//! Implements CLI commands for managing filament profiles.

use chrono::NaiveDate;
use clap::Subcommand;

use crate::config::settings::Settings;
use crate::display::filament::{format_filament_details, format_filament_list};
use crate::error::{SpoolError, SpoolResult};
use crate::models::{Filament, FilamentChanges, Money, SlicerSettings};
use crate::services::{FilamentFilter, FilamentService, PriceService, SortKey};
use crate::storage::Storage;

/// Filament subcommands
#[derive(Subcommand)]
pub enum FilamentCommands {
    /// Add a new filament profile
    Add {
        /// Material type (PLA, PETG, ABS, ...)
        material: String,
        /// Color name
        color: String,
        /// Manufacturer
        #[arg(short, long, default_value = "")]
        brand: String,
        /// Remaining weight in grams
        #[arg(short, long, default_value_t = 0.0)]
        weight: f64,
        /// Net weight of a full spool in grams (defaults to --weight)
        #[arg(long)]
        initial_weight: Option<f64>,
        /// Diameter in mm (defaults to the configured diameter)
        #[arg(long)]
        diameter: Option<f64>,
        /// Purchase price (e.g., "24.99")
        #[arg(short, long, default_value = "0")]
        price: String,
        /// Purchase date (configured format or YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form notes
        #[arg(short, long, default_value = "")]
        notes: String,
        /// Slicer setting as TARGET:KEY=VALUE (repeatable)
        #[arg(long = "slicer")]
        slicer: Vec<String>,
    },
    /// List filament profiles
    List {
        /// Only this material
        #[arg(short, long)]
        material: Option<String>,
        /// Only this brand
        #[arg(short, long)]
        brand: Option<String>,
        /// Color contains this text
        #[arg(short, long)]
        color: Option<String>,
        /// Minimum remaining grams
        #[arg(long)]
        min_weight: Option<f64>,
        /// Maximum remaining grams
        #[arg(long)]
        max_weight: Option<f64>,
        /// Only spools at or below the low-stock threshold
        #[arg(long)]
        low_stock: bool,
        /// Sort by name, material, color, weight, price, date or updated
        #[arg(short, long, default_value = "name")]
        sort: String,
    },
    /// Show a profile with its latest price
    Show {
        /// Profile ID or ID prefix
        filament: String,
    },
    /// Edit a profile
    Edit {
        /// Profile ID or ID prefix
        filament: String,
        #[arg(long)]
        brand: Option<String>,
        #[arg(long)]
        material: Option<String>,
        #[arg(long)]
        color: Option<String>,
        /// Remaining weight in grams
        #[arg(short, long)]
        weight: Option<f64>,
        #[arg(long)]
        initial_weight: Option<f64>,
        #[arg(long)]
        diameter: Option<f64>,
        /// Purchase price
        #[arg(short, long)]
        price: Option<String>,
        /// Purchase date (configured format or YYYY-MM-DD)
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Slicer setting as TARGET:KEY=VALUE (repeatable)
        #[arg(long = "slicer")]
        slicer: Vec<String>,
        /// Drop all settings for a slicer target (repeatable)
        #[arg(long = "remove-slicer")]
        remove_slicer: Vec<String>,
    },
    /// Delete a profile and its price history
    Delete {
        /// Profile ID or ID prefix
        filament: String,
    },
    /// Search brand, material, color and notes
    Search {
        /// Search terms (all must match)
        query: Vec<String>,
    },
}

/// Handle a filament command
pub fn handle_filament_command(
    storage: &Storage,
    settings: &Settings,
    cmd: FilamentCommands,
) -> SpoolResult<()> {
    let service = FilamentService::new(storage);
    let currency = settings.currency_symbol.as_str();

    match cmd {
        FilamentCommands::Add {
            material,
            color,
            brand,
            weight,
            initial_weight,
            diameter,
            price,
            date,
            notes,
            slicer,
        } => {
            let mut filament = Filament::new(material, color)
                .with_brand(brand)
                .with_diameter(diameter.unwrap_or(settings.default_diameter_mm))
                .with_price(parse_price(&price)?)
                .with_notes(notes);
            filament.initial_weight_grams = initial_weight;
            filament = filament.with_weight(weight);

            if let Some(date) = date {
                let purchased = parse_date(&date, &settings.date_format)?;
                filament = filament.with_purchase_date(purchased);
            }
            for (target, slicer_settings) in parse_slicer_settings(&slicer)? {
                filament = filament.with_slicer_profile(target, slicer_settings);
            }

            let id = service.create(filament)?;
            let created = service.read(id)?;

            println!("Added filament: {}", created.display_name());
            println!("  Weight: {:.0} g", created.weight_grams);
            println!(
                "  Price: {}",
                created.purchase_price.format_with_symbol(currency)
            );
            println!("  ID: {}", created.id.as_uuid());
        }

        FilamentCommands::List {
            material,
            brand,
            color,
            min_weight,
            max_weight,
            low_stock,
            sort,
        } => {
            let filter = FilamentFilter {
                material,
                brand,
                color,
                query: None,
                min_weight_grams: min_weight,
                max_weight_grams: if low_stock {
                    Some(settings.low_stock_grams)
                } else {
                    max_weight
                },
            };
            let sort: SortKey = sort.parse()?;

            let filaments = service.list(Some(&filter), sort)?;
            let table = format_filament_list(&filaments, currency, settings.low_stock_grams);
            println!("{}", table.trim_end());
        }

        FilamentCommands::Show { filament } => {
            let found = service.find(&filament)?;
            let latest = PriceService::new(storage).latest_price(found.id)?;
            print!("{}", format_filament_details(&found, latest.as_ref(), currency));
        }

        FilamentCommands::Edit {
            filament,
            brand,
            material,
            color,
            weight,
            initial_weight,
            diameter,
            price,
            date,
            notes,
            slicer,
            remove_slicer,
        } => {
            let found = service.find(&filament)?;

            let changes = FilamentChanges {
                brand,
                material,
                color,
                diameter_mm: diameter,
                weight_grams: weight,
                initial_weight_grams: initial_weight.map(Some),
                purchase_date: date
                    .as_deref()
                    .map(|d| parse_date(d, &settings.date_format))
                    .transpose()?
                    .map(Some),
                purchase_price: price.as_deref().map(parse_price).transpose()?,
                notes,
                slicer_profiles: parse_slicer_settings(&slicer)?,
                remove_slicer_profiles: remove_slicer,
            };

            if changes.is_empty() {
                println!("No changes specified. See 'spoolbook filament edit --help'.");
                return Ok(());
            }

            let updated = service.update(found.id, &changes)?;
            println!("Updated filament: {}", updated.display_name());
        }

        FilamentCommands::Delete { filament } => {
            let found = service.find(&filament)?;
            let deleted = service.delete(found.id)?;
            println!("Deleted filament: {}", deleted.display_name());
        }

        FilamentCommands::Search { query } => {
            let results = service.search(&query.join(" "))?;
            let table = format_filament_list(&results, currency, settings.low_stock_grams);
            println!("{}", table.trim_end());
        }
    }

    Ok(())
}

pub(crate) fn parse_price(input: &str) -> SpoolResult<Money> {
    Money::parse(input).map_err(|e| {
        SpoolError::validation(
            "price",
            format!("'{}' is not an amount like '24.99': {}", input, e),
        )
    })
}

/// Parse a date in the configured format, falling back to YYYY-MM-DD
pub(crate) fn parse_date(input: &str, date_format: &str) -> SpoolResult<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, date_format)
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y-%m-%d"))
        .map_err(|_| {
            SpoolError::validation(
                "date",
                format!("'{}' does not match {} or YYYY-MM-DD", input, date_format),
            )
        })
}

/// Group TARGET:KEY=VALUE arguments by slicer target
fn parse_slicer_settings(
    args: &[String],
) -> SpoolResult<std::collections::BTreeMap<String, SlicerSettings>> {
    let mut profiles = std::collections::BTreeMap::new();

    for arg in args {
        let parsed = arg.split_once(':').and_then(|(target, setting)| {
            setting
                .split_once('=')
                .map(|(key, value)| (target.trim(), key.trim(), value.trim()))
        });

        match parsed {
            Some((target, key, value)) if !target.is_empty() && !key.is_empty() => {
                profiles
                    .entry(target.to_string())
                    .or_insert_with(SlicerSettings::new)
                    .insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(SpoolError::validation(
                    "slicer",
                    format!("'{}' is not in TARGET:KEY=VALUE form", arg),
                ))
            }
        }
    }

    Ok(profiles)
}
