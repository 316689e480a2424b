//! Cost report files
//!
//! Reports are named after their period and the dates they cover, e.g.
//! `cost_report_monthly_2024-05-01_to_2024-05-30.csv`.

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::error::{SpoolError, SpoolResult};
use crate::models::CostReport;
use crate::storage::file_io::write_bytes_atomic;

/// File format for an exported cost report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown report format '{}' (json or csv)", other)),
        }
    }
}

/// One CSV row per material, then a total row
#[derive(Debug, Serialize)]
struct ReportRow {
    period: String,
    start_date: String,
    end_date: String,
    material: String,
    grams_used: String,
    cost: String,
    cost_per_kg: Option<String>,
}

/// Write `report` into `output_dir`, returning the file's path
///
/// An empty report is refused with `Export`.
pub fn export_cost_report(
    report: &CostReport,
    format: ReportFormat,
    output_dir: &Path,
) -> SpoolResult<PathBuf> {
    let (start, end) = match (report.start, report.end) {
        (Some(start), Some(end)) if !report.is_empty() => (
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        ),
        _ => {
            return Err(SpoolError::Export(
                "no usage recorded in this period".into(),
            ))
        }
    };

    fs::create_dir_all(output_dir).map_err(|e| {
        SpoolError::Export(format!(
            "Failed to create {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    let path = output_dir.join(format!(
        "cost_report_{}_{}_to_{}.{}",
        report.period,
        start,
        end,
        format.extension()
    ));

    match format {
        ReportFormat::Json => {
            let json = serde_json::to_vec_pretty(report)
                .map_err(|e| SpoolError::Export(format!("Failed to serialize report: {}", e)))?;
            write_bytes_atomic(&path, &json)?;
        }
        ReportFormat::Csv => write_csv(report, &start, &end, &path)?,
    }

    info!(path = %path.display(), %format, "exported cost report");
    Ok(path)
}

fn write_csv(report: &CostReport, start: &str, end: &str, path: &Path) -> SpoolResult<()> {
    let file = File::create(path)
        .map_err(|e| SpoolError::Export(format!("Failed to create {}: {}", path.display(), e)))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    let money = |cents: i64| format!("{:.2}", cents as f64 / 100.0);
    let row = |material: &str, grams: f64, cost: i64, per_kg: Option<i64>| ReportRow {
        period: report.period.clone(),
        start_date: start.to_string(),
        end_date: end.to_string(),
        material: material.to_string(),
        grams_used: format!("{:.2}", grams),
        cost: money(cost),
        cost_per_kg: per_kg.map(money),
    };

    for (material, grams) in &report.usage_by_material {
        let cost = report
            .cost_by_material
            .get(material)
            .map_or(0, |c| c.cents());
        let per_kg = (*grams > 0.0).then(|| (cost as f64 * 1000.0 / grams).round() as i64);
        writer
            .serialize(row(material.as_str(), *grams, cost, per_kg))
            .map_err(|e| SpoolError::Export(format!("Failed to write CSV row: {}", e)))?;
    }

    writer
        .serialize(row(
            "TOTAL",
            report.total_grams,
            report.total_cost.cents(),
            report.cost_per_kg.map(|m| m.cents()),
        ))
        .map_err(|e| SpoolError::Export(format!("Failed to write CSV row: {}", e)))?;

    writer
        .flush()
        .map_err(|e| SpoolError::Export(format!("Failed to flush CSV: {}", e)))?;
    Ok(())
}
