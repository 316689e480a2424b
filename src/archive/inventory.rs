//! CSV export of the filament inventory (spreadsheet-compatible)

use std::io::Write;

use serde::Serialize;

use crate::error::{SpoolError, SpoolResult};
use crate::storage::Storage;

/// One spreadsheet row per profile
#[derive(Debug, Serialize)]
struct InventoryRow {
    id: String,
    brand: String,
    material: String,
    color: String,
    diameter_mm: f64,
    weight_grams: f64,
    initial_weight_grams: Option<f64>,
    purchase_date: Option<String>,
    purchase_price: String,
    latest_price: Option<String>,
    latest_vendor: Option<String>,
    notes: String,
}

/// Write every profile as CSV, returning the number of rows written
pub fn export_inventory_csv<W: Write>(storage: &Storage, writer: W) -> SpoolResult<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let filaments = storage.filaments.get_all()?;

    for filament in &filaments {
        let latest = storage.prices.history(filament.id)?.pop();

        let row = InventoryRow {
            id: filament.id.as_uuid().to_string(),
            brand: filament.brand.clone(),
            material: filament.material.clone(),
            color: filament.color.clone(),
            diameter_mm: filament.diameter_mm,
            weight_grams: filament.weight_grams,
            initial_weight_grams: filament.initial_weight_grams,
            purchase_date: filament.purchase_date.map(|d| d.to_string()),
            purchase_price: format!("{:.2}", filament.purchase_price.as_f64()),
            latest_price: latest.as_ref().map(|o| format!("{:.2}", o.price.as_f64())),
            latest_vendor: latest.map(|o| o.vendor),
            notes: filament.notes.clone(),
        };

        csv_writer
            .serialize(row)
            .map_err(|e| SpoolError::Export(format!("Failed to write CSV row: {}", e)))?;
    }

    csv_writer
        .flush()
        .map_err(|e| SpoolError::Export(format!("Failed to flush CSV: {}", e)))?;

    Ok(filaments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpoolPaths;
    use crate::models::{Filament, Money, PriceObservation};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_inventory_csv() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(SpoolPaths::with_base_dir(temp_dir.path().to_path_buf())).unwrap();

        let filament = Filament::new("PLA", "red, glossy")
            .with_brand("Prusament")
            .with_weight(1000.0)
            .with_price(Money::from_cents(2000));
        let id = filament.id;
        storage.filaments.upsert(filament).unwrap();
        storage
            .prices
            .record(PriceObservation::new(id, "shop", Money::from_cents(1899), Utc::now()))
            .unwrap();
        storage.filaments.upsert(Filament::new("PETG", "black")).unwrap();

        let mut output = Vec::new();
        let rows = export_inventory_csv(&storage, &mut output).unwrap();
        assert_eq!(rows, 2);

        let csv_text = String::from_utf8(output).unwrap();
        let mut lines = csv_text.lines();
        assert!(lines.next().unwrap().starts_with("id,brand,material,color"));
        assert!(csv_text.contains("\"red, glossy\""));
        assert!(csv_text.contains("20.00"));
        assert!(csv_text.contains("18.99,shop"));
        assert_eq!(csv_text.lines().count(), 3);
    }
}
