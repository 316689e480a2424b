//! Spoolbook - filament inventory for 3D printing
//!
//! This library provides the core of the Spoolbook filament tracker:
//! persistent filament profiles, a per-profile price ledger, portable
//! profile archives and snapshot backups.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models (filaments, prices, money, IDs)
//! - `storage`: JSON file storage layer
//! - `services`: Business logic layer
//! - `audit`: Audit logging system
//! - `archive`: Profile archive export/import and CSV inventory export
//! - `backup`: Backup creation, retention, scheduling and restore
//!
//! # Example
//!
//! ```rust,ignore
//! use spoolbook::config::{paths::SpoolPaths, settings::Settings};
//! use spoolbook::storage::Storage;
//!
//! let paths = SpoolPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::new(paths)?;
//! storage.load_all()?;
//! ```

pub mod archive;
pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

pub use error::{SpoolError, SpoolResult};
