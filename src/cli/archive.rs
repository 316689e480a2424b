//! CLI commands for profile archives and inventory exports

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::archive::{export_inventory_csv, export_profiles, import_profiles};
use crate::error::{SpoolError, SpoolResult};
use crate::services::FilamentService;
use crate::storage::Storage;

/// Handle the export command
///
/// `filaments` are IDs or ID prefixes; none means every profile.
pub fn handle_export_command(
    storage: &Storage,
    output: &Path,
    filaments: &[String],
) -> SpoolResult<()> {
    let service = FilamentService::new(storage);
    let ids = filaments
        .iter()
        .map(|identifier| service.find(identifier).map(|f| f.id))
        .collect::<SpoolResult<Vec<_>>>()?;

    let manifest = export_profiles(storage, &ids, output)?;

    println!(
        "Exported {} profile(s) and {} price observation(s) to {}",
        manifest.profile_count,
        manifest.observation_count,
        output.display()
    );
    Ok(())
}

/// Handle the export-csv command
pub fn handle_export_csv_command(storage: &Storage, output: &Path) -> SpoolResult<()> {
    let file = File::create(output)
        .map_err(|e| SpoolError::Export(format!("Failed to create {}: {}", output.display(), e)))?;
    let rows = export_inventory_csv(storage, BufWriter::new(file))?;

    println!("Exported {} filament(s) to {}", rows, output.display());
    Ok(())
}

/// Handle the import command
pub fn handle_import_command(storage: &Storage, file: &Path) -> SpoolResult<()> {
    if !file.exists() {
        return Err(SpoolError::Import(format!(
            "File not found: {}",
            file.display()
        )));
    }

    let report = import_profiles(storage, file)?;

    println!("Import Complete");
    println!("{}", "=".repeat(40));
    println!("  Imported: {}", report.imported.len());
    println!("  Updated:  {}", report.updated.len());
    println!("  Skipped:  {}", report.skipped.len());
    println!("  Price observations added: {}", report.observations_added);

    let changed = report.changed_ids();
    if !changed.is_empty() {
        println!();
        println!("Changed profiles:");
        for id in changed {
            println!("  {}", id);
        }
    }
    Ok(())
}
