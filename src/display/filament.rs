//! Filament display formatting
//!
//! Formats filament profiles for terminal output in table and detail views.

use crate::models::{Filament, PriceObservation};

/// Format a list of profiles as a table
pub fn format_filament_list(filaments: &[Filament], currency: &str, low_stock_grams: f64) -> String {
    if filaments.is_empty() {
        return "No filaments found.".to_string();
    }

    let name_width = filaments
        .iter()
        .map(|f| f.display_name().chars().count())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<12}  {:<name_width$}  {:>6}  {:>9}  {:>10}  {}\n",
        "ID",
        "Name",
        "Dia.",
        "Remaining",
        "Price",
        "Status",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<12}  {:-<name_width$}  {:->6}  {:->9}  {:->10}  {:-<9}\n",
        "",
        "",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for filament in filaments {
        let status = if filament.weight_grams <= 0.0 {
            "Empty"
        } else if filament.is_low_stock(low_stock_grams) {
            "Low"
        } else {
            ""
        };

        output.push_str(&format!(
            "{:<12}  {:<name_width$}  {:>6.2}  {:>7.0} g  {:>10}  {}\n",
            filament.id.to_string(),
            filament.display_name(),
            filament.diameter_mm,
            filament.weight_grams,
            filament.purchase_price.format_with_symbol(currency),
            status,
            name_width = name_width,
        ));
    }

    let total_grams: f64 = filaments.iter().map(|f| f.weight_grams).sum();
    output.push_str(&format!(
        "\n{} spool(s), {:.0} g remaining in total\n",
        filaments.len(),
        total_grams
    ));

    output
}

/// Format a single profile's details
pub fn format_filament_details(
    filament: &Filament,
    latest_price: Option<&PriceObservation>,
    currency: &str,
) -> String {
    let mut output = String::new();

    output.push_str(&format!("Filament: {}\n", filament.display_name()));
    output.push_str(&format!("  ID:             {}\n", filament.id.as_uuid()));
    if !filament.brand.is_empty() {
        output.push_str(&format!("  Brand:          {}\n", filament.brand));
    }
    output.push_str(&format!("  Material:       {}\n", filament.material));
    output.push_str(&format!("  Color:          {}\n", filament.color));
    output.push_str(&format!("  Diameter:       {:.2} mm\n", filament.diameter_mm));
    output.push('\n');

    output.push_str(&format!("  Remaining:      {:.0} g\n", filament.weight_grams));
    if let Some(initial) = filament.initial_weight_grams {
        output.push_str(&format!("  Initial:        {:.0} g\n", initial));
    }
    if let Some(fraction) = filament.remaining_fraction() {
        output.push_str(&format!("  Left:           {:.0}%\n", fraction * 100.0));
    }

    output.push('\n');
    output.push_str(&format!(
        "  Purchase Price: {}\n",
        filament.purchase_price.format_with_symbol(currency)
    ));
    if let Some(per_kg) = filament.cost_per_kg() {
        output.push_str(&format!(
            "  Cost per kg:    {}\n",
            per_kg.format_with_symbol(currency)
        ));
    }
    if let Some(date) = filament.purchase_date {
        output.push_str(&format!("  Purchased:      {}\n", date));
    }
    if let Some(latest) = latest_price {
        output.push_str(&format!(
            "  Latest Price:   {} at {} ({})\n",
            latest.price.format_with_symbol(currency),
            latest.vendor,
            latest.observed_at.format("%Y-%m-%d")
        ));
    }

    if !filament.slicer_profiles.is_empty() {
        output.push_str("\n  Slicer Profiles:\n");
        for (target, settings) in &filament.slicer_profiles {
            output.push_str(&format!("    [{}]\n", target));
            for (key, value) in settings {
                output.push_str(&format!("      {} = {}\n", key, value));
            }
        }
    }

    if !filament.notes.is_empty() {
        output.push_str(&format!("\n  Notes: {}\n", filament.notes));
    }

    output.push_str(&format!(
        "\n  Updated:        {}\n",
        filament.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_list() {
        assert_eq!(format_filament_list(&[], "$", 100.0), "No filaments found.");
    }

    #[test]
    fn test_list_marks_low_stock() {
        let filaments = vec![
            Filament::new("PLA", "red")
                .with_weight(1000.0)
                .with_price(Money::from_cents(2000)),
            Filament::new("PETG", "black").with_weight(50.0),
        ];

        let output = format_filament_list(&filaments, "$", 100.0);
        assert!(output.contains("PLA red"));
        assert!(output.contains("$20.00"));
        assert!(output.contains("Low"));
        assert!(output.contains("2 spool(s), 1050 g remaining"));
    }

    #[test]
    fn test_details() {
        let mut settings = BTreeMap::new();
        settings.insert("temperature".to_string(), "215".to_string());
        let filament = Filament::new("PLA", "red")
            .with_brand("Prusament")
            .with_weight(1000.0)
            .with_price(Money::from_cents(2500))
            .with_slicer_profile("prusaslicer", settings)
            .with_notes("dry first");

        let output = format_filament_details(&filament, None, "€");
        assert!(output.contains("Filament: Prusament PLA red"));
        assert!(output.contains("Cost per kg:    €25.00"));
        assert!(output.contains("[prusaslicer]"));
        assert!(output.contains("temperature = 215"));
        assert!(output.contains("Notes: dry first"));
    }
}
