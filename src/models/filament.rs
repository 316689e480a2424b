//! Filament profile model
//!
//! A filament profile is one spool (or spool type) in the inventory: what it
//! is, how much is left, what it cost, and optional per-slicer settings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::FilamentId;
use super::money::Money;
use crate::error::SpoolError;

/// Default filament diameter in millimetres
pub const DEFAULT_DIAMETER_MM: f64 = 1.75;

const MAX_NAME_LEN: usize = 100;

/// Key/value settings for one slicer target (e.g. "prusaslicer", "cura")
pub type SlicerSettings = BTreeMap<String, String>;

/// A filament inventory record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filament {
    /// Unique identifier, never changes after creation
    pub id: FilamentId,

    /// Manufacturer (e.g. "Prusament")
    #[serde(default)]
    pub brand: String,

    /// Material type (e.g. "PLA", "PETG")
    pub material: String,

    /// Color name
    pub color: String,

    /// Nominal diameter
    #[serde(default = "default_diameter")]
    pub diameter_mm: f64,

    /// Filament left on the spool
    pub weight_grams: f64,

    /// Net weight when the spool was new
    #[serde(default)]
    pub initial_weight_grams: Option<f64>,

    #[serde(default)]
    pub purchase_date: Option<NaiveDate>,

    pub purchase_price: Money,

    #[serde(default)]
    pub notes: String,

    /// Settings keyed by slicer target
    #[serde(default)]
    pub slicer_profiles: BTreeMap<String, SlicerSettings>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_diameter() -> f64 {
    DEFAULT_DIAMETER_MM
}

impl Filament {
    /// Create a new profile with zero weight and price
    pub fn new(material: impl Into<String>, color: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: FilamentId::new(),
            brand: String::new(),
            material: material.into(),
            color: color.into(),
            diameter_mm: DEFAULT_DIAMETER_MM,
            weight_grams: 0.0,
            initial_weight_grams: None,
            purchase_date: None,
            purchase_price: Money::zero(),
            notes: String::new(),
            slicer_profiles: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    /// Set the remaining weight; a fresh spool also gets it as initial weight
    pub fn with_weight(mut self, grams: f64) -> Self {
        self.weight_grams = grams;
        if self.initial_weight_grams.is_none() {
            self.initial_weight_grams = Some(grams);
        }
        self
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.purchase_price = price;
        self
    }

    pub fn with_purchase_date(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }

    pub fn with_diameter(mut self, diameter_mm: f64) -> Self {
        self.diameter_mm = diameter_mm;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_slicer_profile(mut self, target: impl Into<String>, settings: SlicerSettings) -> Self {
        self.slicer_profiles.insert(target.into(), settings);
        self
    }

    /// Human-readable name: "Brand Material Color"
    pub fn display_name(&self) -> String {
        [self.brand.as_str(), self.material.as_str(), self.color.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Filament consumed since purchase, if the initial weight is known
    pub fn used_grams(&self) -> Option<f64> {
        self.initial_weight_grams
            .map(|initial| (initial - self.weight_grams).max(0.0))
    }

    /// Remaining share of the initial weight in [0, 1]
    pub fn remaining_fraction(&self) -> Option<f64> {
        match self.initial_weight_grams {
            Some(initial) if initial > 0.0 => Some((self.weight_grams / initial).clamp(0.0, 1.0)),
            _ => None,
        }
    }

    /// Purchase price normalised to one kilogram of filament
    pub fn cost_per_kg(&self) -> Option<Money> {
        match self.initial_weight_grams {
            Some(initial) if initial > 0.0 => {
                let cents = self.purchase_price.cents() as f64 * 1000.0 / initial;
                Some(Money::from_cents(cents.round() as i64))
            }
            _ => None,
        }
    }

    pub fn is_low_stock(&self, threshold_grams: f64) -> bool {
        self.weight_grams <= threshold_grams
    }

    /// Validate the profile
    pub fn validate(&self) -> Result<(), FilamentValidationError> {
        check_name("material", &self.material, true)?;
        check_name("color", &self.color, true)?;
        check_name("brand", &self.brand, false)?;

        if !self.diameter_mm.is_finite() || self.diameter_mm <= 0.0 {
            return Err(FilamentValidationError::NotPositive("diameter_mm"));
        }

        check_non_negative("weight_grams", self.weight_grams)?;
        if let Some(initial) = self.initial_weight_grams {
            check_non_negative("initial_weight_grams", initial)?;
        }

        if self.purchase_price.is_negative() {
            return Err(FilamentValidationError::Negative("purchase_price"));
        }

        if self.slicer_profiles.keys().any(|target| target.trim().is_empty()) {
            return Err(FilamentValidationError::Empty("slicer_profiles"));
        }

        Ok(())
    }
}

fn check_name(
    field: &'static str,
    value: &str,
    required: bool,
) -> Result<(), FilamentValidationError> {
    if required && value.trim().is_empty() {
        return Err(FilamentValidationError::Empty(field));
    }
    if value.len() > MAX_NAME_LEN {
        return Err(FilamentValidationError::TooLong(field, value.len()));
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), FilamentValidationError> {
    if !value.is_finite() {
        return Err(FilamentValidationError::NotFinite(field));
    }
    if value < 0.0 {
        return Err(FilamentValidationError::Negative(field));
    }
    Ok(())
}

impl fmt::Display for Filament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.0} g)", self.display_name(), self.weight_grams)
    }
}

/// Validation errors for filament profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilamentValidationError {
    Empty(&'static str),
    TooLong(&'static str, usize),
    Negative(&'static str),
    NotPositive(&'static str),
    NotFinite(&'static str),
}

impl FilamentValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty(field)
            | Self::TooLong(field, _)
            | Self::Negative(field)
            | Self::NotPositive(field)
            | Self::NotFinite(field) => field,
        }
    }
}

impl fmt::Display for FilamentValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(field) => write!(f, "{} cannot be empty", field),
            Self::TooLong(field, len) => {
                write!(f, "{} too long ({} chars, max {})", field, len, MAX_NAME_LEN)
            }
            Self::Negative(field) => write!(f, "{} cannot be negative", field),
            Self::NotPositive(field) => write!(f, "{} must be greater than zero", field),
            Self::NotFinite(field) => write!(f, "{} must be a finite number", field),
        }
    }
}

impl std::error::Error for FilamentValidationError {}

impl From<FilamentValidationError> for SpoolError {
    fn from(err: FilamentValidationError) -> Self {
        let field = err.field();
        SpoolError::validation(field, err.to_string())
    }
}

/// A partial update to a filament profile
///
/// `None` leaves a field untouched. The id is not part of the change set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilamentChanges {
    pub brand: Option<String>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub diameter_mm: Option<f64>,
    pub weight_grams: Option<f64>,
    pub initial_weight_grams: Option<Option<f64>>,
    pub purchase_date: Option<Option<NaiveDate>>,
    pub purchase_price: Option<Money>,
    pub notes: Option<String>,
    /// Replace or insert slicer settings per target
    pub slicer_profiles: BTreeMap<String, SlicerSettings>,
    /// Slicer targets to drop
    pub remove_slicer_profiles: Vec<String>,
}

impl FilamentChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the changes to a profile in place, bumping `updated_at`
    ///
    /// The result is not validated here.
    pub fn apply_to(&self, filament: &mut Filament) {
        if let Some(brand) = &self.brand {
            filament.brand = brand.trim().to_string();
        }
        if let Some(material) = &self.material {
            filament.material = material.trim().to_string();
        }
        if let Some(color) = &self.color {
            filament.color = color.trim().to_string();
        }
        if let Some(diameter) = self.diameter_mm {
            filament.diameter_mm = diameter;
        }
        if let Some(weight) = self.weight_grams {
            filament.weight_grams = weight;
        }
        if let Some(initial) = self.initial_weight_grams {
            filament.initial_weight_grams = initial;
        }
        if let Some(date) = self.purchase_date {
            filament.purchase_date = date;
        }
        if let Some(price) = self.purchase_price {
            filament.purchase_price = price;
        }
        if let Some(notes) = &self.notes {
            filament.notes = notes.clone();
        }
        for target in &self.remove_slicer_profiles {
            filament.slicer_profiles.remove(target);
        }
        for (target, settings) in &self.slicer_profiles {
            filament
                .slicer_profiles
                .insert(target.clone(), settings.clone());
        }
        filament.updated_at = Utc::now();
    }
}
