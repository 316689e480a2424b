//! Price history display formatting

use std::collections::HashMap;

use crate::models::{FilamentId, Money, PriceAlert, PriceObservation, PriceStatistics};
use crate::services::PriceDeal;

/// Format a profile's observations, oldest first
pub fn format_price_history(observations: &[PriceObservation], currency: &str) -> String {
    if observations.is_empty() {
        return "No prices recorded.".to_string();
    }

    let vendor_width = observations
        .iter()
        .map(|o| o.vendor.chars().count())
        .max()
        .unwrap_or(6)
        .max(6);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<16}  {:<vendor_width$}  {:>10}\n",
        "Date",
        "Vendor",
        "Price",
        vendor_width = vendor_width,
    ));
    output.push_str(&format!(
        "{:-<16}  {:-<vendor_width$}  {:->10}\n",
        "",
        "",
        "",
        vendor_width = vendor_width,
    ));

    for observation in observations {
        output.push_str(&format!(
            "{:<16}  {:<vendor_width$}  {:>10}\n",
            observation.observed_at.format("%Y-%m-%d %H:%M").to_string(),
            observation.vendor,
            observation.price.format_with_symbol(currency),
            vendor_width = vendor_width,
        ));
    }

    output
}

/// Format window statistics
pub fn format_price_statistics(stats: &PriceStatistics, currency: &str) -> String {
    if stats.is_empty() {
        return "No price data in this period.".to_string();
    }

    let money = |m: Option<Money>| {
        m.map(|m| m.format_with_symbol(currency))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut output = String::new();
    output.push_str(&format!("  Observations: {}\n", stats.count));
    if let (Some(first), Some(last)) = (stats.first_observed, stats.last_observed) {
        output.push_str(&format!(
            "  Period:       {} to {}\n",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ));
    }
    output.push_str(&format!("  Minimum:      {}\n", money(stats.min)));
    output.push_str(&format!("  Maximum:      {}\n", money(stats.max)));
    output.push_str(&format!("  Average:      {}\n", money(stats.average)));
    output.push_str(&format!(
        "  Trend:        {} ({:+.1}%)\n",
        stats.trend, stats.change_pct
    ));

    output
}

/// Format price alerts, naming profiles where known
pub fn format_price_alerts(
    alerts: &[PriceAlert],
    names: &HashMap<FilamentId, String>,
    currency: &str,
) -> String {
    if alerts.is_empty() {
        return "No significant price changes.".to_string();
    }

    let mut output = String::new();
    for alert in alerts {
        let name = names
            .get(&alert.filament_id)
            .cloned()
            .unwrap_or_else(|| alert.filament_id.to_string());
        let direction = if alert.is_increase() { "UP" } else { "DOWN" };

        output.push_str(&format!(
            "{:<4} {:+6.1}%  {}  {} -> {}  ({} change(s), {} to {})\n",
            direction,
            alert.change_pct,
            name,
            alert.old_price.format_with_symbol(currency),
            alert.new_price.format_with_symbol(currency),
            alert.num_changes,
            alert.first_observed.format("%Y-%m-%d"),
            alert.last_observed.format("%Y-%m-%d"),
        ));
    }

    output
}

/// Format the cheapest profiles by latest price
pub fn format_best_deals(deals: &[PriceDeal], currency: &str) -> String {
    if deals.is_empty() {
        return "No priced filaments found.".to_string();
    }

    let mut output = String::new();
    for (rank, deal) in deals.iter().enumerate() {
        output.push_str(&format!(
            "{:>2}. {:>10}  {}  ({}, {})\n",
            rank + 1,
            deal.latest.price.format_with_symbol(currency),
            deal.filament.display_name(),
            deal.latest.vendor,
            deal.latest.observed_at.format("%Y-%m-%d"),
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceTrend;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_no_data_statistics() {
        let output = format_price_statistics(&PriceStatistics::no_data(), "$");
        assert_eq!(output, "No price data in this period.");
    }

    #[test]
    fn test_statistics() {
        let stats = PriceStatistics {
            count: 3,
            min: Some(Money::from_cents(1800)),
            max: Some(Money::from_cents(2200)),
            average: Some(Money::from_cents(2000)),
            trend: PriceTrend::Increasing,
            change_pct: 12.5,
            first_observed: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            last_observed: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
        };

        let output = format_price_statistics(&stats, "$");
        assert!(output.contains("Minimum:      $18.00"));
        assert!(output.contains("Trend:        increasing (+12.5%)"));
        assert!(output.contains("2024-01-01 to 2024-02-01"));
    }

    #[test]
    fn test_history_table() {
        let observation = PriceObservation::new(
            FilamentId::new(),
            "Prusa Store",
            Money::from_cents(2499),
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        );
        let output = format_price_history(&[observation], "$");
        assert!(output.contains("2024-05-01 09:30"));
        assert!(output.contains("Prusa Store"));
        assert!(output.contains("$24.99"));
    }
}
