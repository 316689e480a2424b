//! Usage ledger and cost report display formatting

use crate::models::{CostReport, Money, SavingsRecommendation, UsageEntry};

/// Format ledger entries, oldest first
pub fn format_usage_list(entries: &[UsageEntry], currency: &str) -> String {
    if entries.is_empty() {
        return "No usage recorded.".to_string();
    }

    let project_width = entries
        .iter()
        .map(|e| e.project.chars().count())
        .max()
        .unwrap_or(7)
        .clamp(7, 30);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<10}  {:<8}  {:<project_width$}  {:>9}  {:>10}\n",
        "Date",
        "Material",
        "Project",
        "Grams",
        "Cost",
        project_width = project_width,
    ));
    output.push_str(&format!(
        "{:-<10}  {:-<8}  {:-<project_width$}  {:->9}  {:->10}\n",
        "",
        "",
        "",
        "",
        "",
        project_width = project_width,
    ));

    for entry in entries {
        let project: String = entry.project.chars().take(project_width).collect();
        output.push_str(&format!(
            "{:<10}  {:<8}  {:<project_width$}  {:>9.1}  {:>10}\n",
            entry.used_at.format("%Y-%m-%d").to_string(),
            entry.material,
            project,
            entry.grams_used,
            entry.cost.format_with_symbol(currency),
            project_width = project_width,
        ));
    }

    let total: Money = entries.iter().map(|e| e.cost).sum();
    output.push_str(&format!(
        "\n{} entr(ies), {}\n",
        entries.len(),
        total.format_with_symbol(currency)
    ));
    output
}

/// Format a cost report
pub fn format_cost_report(report: &CostReport, currency: &str) -> String {
    if report.is_empty() {
        return "No usage recorded in this period.".to_string();
    }

    let money = |m: Option<Money>| {
        m.map(|m| m.format_with_symbol(currency))
            .unwrap_or_else(|| "-".to_string())
    };

    let mut output = String::new();
    output.push_str(&format!("Cost Report ({})\n", report.period));
    output.push_str(&format!("{}\n", "=".repeat(40)));
    if let (Some(start), Some(end)) = (report.start, report.end) {
        output.push_str(&format!(
            "  Period:       {} to {}\n",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ));
    }
    output.push_str(&format!("  Entries:      {}\n", report.entry_count));
    output.push_str(&format!("  Filament:     {:.1} g\n", report.total_grams));
    output.push_str(&format!(
        "  Total cost:   {}\n",
        report.total_cost.format_with_symbol(currency)
    ));
    output.push_str(&format!("  Cost per kg:  {}\n", money(report.cost_per_kg)));
    output.push_str(&format!("  Projects:     {}\n", report.project_count));
    output.push_str(&format!("  Per project:  {}\n", money(report.cost_per_project)));
    if let Some(most) = &report.most_used {
        output.push_str(&format!("  Most used:    {}\n", most));
    }
    if let Some(least) = &report.least_used {
        output.push_str(&format!("  Least used:   {}\n", least));
    }

    output.push_str("\nBy material:\n");
    for (material, grams) in &report.usage_by_material {
        let cost = report
            .cost_by_material
            .get(material)
            .copied()
            .unwrap_or_default();
        output.push_str(&format!(
            "  {:<10} {:>9.1} g  {:>10}\n",
            material,
            grams,
            cost.format_with_symbol(currency)
        ));
    }

    output
}

pub fn format_savings(recommendations: &[SavingsRecommendation], currency: &str) -> String {
    if recommendations.is_empty() {
        return "No savings found: every material was bought near its lowest price.".to_string();
    }

    let mut output = String::new();
    for r in recommendations {
        output.push_str(&format!(
            "{}: paid {}/kg on average, lowest was {}/kg. Up to {} could be saved on {:.0} g.\n",
            r.material,
            r.average_cost_per_kg.format_with_symbol(currency),
            r.lowest_cost_per_kg.format_with_symbol(currency),
            r.potential_savings.format_with_symbol(currency),
            r.grams_used,
        ));
    }
    output
}
