use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use spoolbook::cli::{
    handle_backup_command, handle_export_command, handle_export_csv_command,
    handle_filament_command, handle_import_command, handle_price_command, handle_usage_command,
    run_startup_backup,
};
use spoolbook::config::{paths::SpoolPaths, settings::Settings, BackupInterval};
use spoolbook::error::SpoolError;
use spoolbook::storage::Storage;

#[derive(Parser)]
#[command(
    name = "spoolbook",
    version,
    about = "Filament inventory tracker for 3D printing",
    long_about = "Spoolbook keeps track of your filament spools: profiles with \
                  slicer settings, the prices you have seen for them, what each \
                  project used and cost, portable profile archives and automatic \
                  backups."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filament profile commands
    #[command(subcommand, alias = "f")]
    Filament(spoolbook::cli::FilamentCommands),

    /// Price history commands
    #[command(subcommand)]
    Price(spoolbook::cli::PriceCommands),

    /// Filament usage and cost reports
    #[command(subcommand)]
    Usage(spoolbook::cli::UsageCommands),

    /// Export profiles (with their price history) to an archive
    Export {
        /// Archive file to write (.tar.gz)
        output: PathBuf,
        /// Profile IDs or ID prefixes (default: all)
        filaments: Vec<String>,
    },

    /// Export the inventory as a CSV spreadsheet
    ExportCsv {
        /// CSV file to write
        output: PathBuf,
    },

    /// Import profiles from an archive
    Import {
        /// Archive file to read
        file: PathBuf,
    },

    /// Backup management commands
    #[command(subcommand)]
    Backup(spoolbook::cli::BackupCommands),

    /// Show recent changes from the audit log
    Audit {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Initialize the data directory
    Init,

    /// Show or change configuration
    Config {
        /// Maximum number of backups to keep (0 = unlimited)
        #[arg(long)]
        max_backups: Option<u32>,
        /// Enable or disable scheduled backups
        #[arg(long)]
        auto_backup: Option<bool>,
        /// Scheduled backup interval (hourly, daily, weekly or e.g. 6h)
        #[arg(long)]
        backup_interval: Option<String>,
        /// Currency symbol for prices
        #[arg(long)]
        currency: Option<String>,
        /// Low-stock threshold in grams
        #[arg(long)]
        low_stock: Option<f64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Initialize paths and settings
    let paths = SpoolPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;

    // Initialize storage; unreadable files are set aside rather than fatal
    let storage = Storage::new(paths.clone())?;
    for warning in storage.load_all_or_recover()? {
        eprintln!("Warning: {}", warning);
    }

    // Scheduled backup failures are logged, never fatal
    if let Err(e) = run_startup_backup(&paths, &settings) {
        warn!(error = %e, "scheduled backup failed");
    }

    match cli.command {
        Some(Commands::Filament(cmd)) => {
            handle_filament_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Price(cmd)) => {
            handle_price_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Usage(cmd)) => {
            handle_usage_command(&storage, &settings, cmd)?;
        }
        Some(Commands::Export { output, filaments }) => {
            handle_export_command(&storage, &output, &filaments)?;
        }
        Some(Commands::ExportCsv { output }) => {
            handle_export_csv_command(&storage, &output)?;
        }
        Some(Commands::Import { file }) => {
            handle_import_command(&storage, &file)?;
        }
        Some(Commands::Backup(cmd)) => {
            handle_backup_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Audit { limit }) => {
            let entries = storage.audit().read_recent(limit)?;
            if entries.is_empty() {
                println!("No changes recorded yet.");
            }
            for entry in entries {
                println!("{}", entry.format_human_readable());
            }
        }
        Some(Commands::Init) => {
            println!("Initializing Spoolbook at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Add your first spool with:");
            println!("  spoolbook filament add PLA red --weight 1000 --price 20.00");
        }
        Some(Commands::Config {
            max_backups,
            auto_backup,
            backup_interval,
            currency,
            low_stock,
        }) => {
            let mut changed = false;
            if let Some(max_backups) = max_backups {
                settings.backup.max_backups = max_backups;
                changed = true;
            }
            if let Some(auto_backup) = auto_backup {
                settings.backup.auto_backup = auto_backup;
                changed = true;
            }
            if let Some(interval) = backup_interval {
                settings.backup.interval = BackupInterval::parse(&interval).ok_or_else(|| {
                    SpoolError::validation(
                        "backup_interval",
                        format!("'{}' is not hourly, daily, weekly or <N>h", interval),
                    )
                })?;
                changed = true;
            }
            if let Some(currency) = currency {
                settings.currency_symbol = currency;
                changed = true;
            }
            if let Some(low_stock) = low_stock {
                if !low_stock.is_finite() || low_stock < 0.0 {
                    return Err(SpoolError::validation(
                        "low_stock",
                        "must be a non-negative number of grams",
                    )
                    .into());
                }
                settings.low_stock_grams = low_stock;
                changed = true;
            }
            if changed {
                settings.save(&paths)?;
                println!("Settings saved.");
                println!();
            }

            println!("Spoolbook Configuration");
            println!("=======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!("Audit log:        {}", paths.audit_log().display());
            println!();
            println!("Settings:");
            println!("  Currency symbol:   {}", settings.currency_symbol);
            println!("  Default diameter:  {} mm", settings.default_diameter_mm);
            println!("  Low-stock below:   {} g", settings.low_stock_grams);
            println!("  Max backups:       {}", settings.backup.max_backups);
            println!(
                "  Scheduled backups: {} ({})",
                if settings.backup.auto_backup { "on" } else { "off" },
                settings.backup.interval
            );
        }
        None => {
            println!("Spoolbook - filament inventory for 3D printing");
            println!();
            println!("Run 'spoolbook --help' for usage information.");
        }
    }

    Ok(())
}
