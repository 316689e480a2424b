//! Writing profile archives

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::info;

use crate::error::{SpoolError, SpoolResult};
use crate::models::{Filament, FilamentId};
use crate::storage::file_io::write_bytes_atomic;
use crate::storage::Storage;

use super::{ArchiveManifest, ARCHIVE_FORMAT_VERSION, MANIFEST_ENTRY, PRICES_DIR, PROFILES_DIR};

/// Export profiles and their price histories to `destination`
///
/// An empty `ids` slice exports every profile. Unknown ids fail with
/// `NotFound` before anything is written.
pub fn export_profiles(
    storage: &Storage,
    ids: &[FilamentId],
    destination: &Path,
) -> SpoolResult<ArchiveManifest> {
    let profiles = select_profiles(storage, ids)?;
    if profiles.is_empty() {
        return Err(SpoolError::Export("no filament profiles to export".into()));
    }

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut observation_count = 0;

    for filament in &profiles {
        append_json(
            &mut builder,
            &format!("{}/{}.json", PROFILES_DIR, filament.id.as_uuid()),
            filament,
        )?;

        let history = storage.prices.history(filament.id)?;
        if !history.is_empty() {
            observation_count += history.len();
            append_json(
                &mut builder,
                &format!("{}/{}.json", PRICES_DIR, filament.id.as_uuid()),
                &history,
            )?;
        }
    }

    let manifest = ArchiveManifest {
        format_version: ARCHIVE_FORMAT_VERSION,
        exported_at: Utc::now(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        profile_count: profiles.len(),
        observation_count,
    };
    append_json(&mut builder, MANIFEST_ENTRY, &manifest)?;

    let bytes = builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .map_err(|e| SpoolError::Export(format!("Failed to finish archive: {}", e)))?;
    write_bytes_atomic(destination, &bytes)?;

    info!(
        path = %destination.display(),
        profiles = manifest.profile_count,
        observations = manifest.observation_count,
        "exported profiles"
    );
    Ok(manifest)
}

fn select_profiles(storage: &Storage, ids: &[FilamentId]) -> SpoolResult<Vec<Filament>> {
    if ids.is_empty() {
        return storage.filaments.get_all();
    }

    let mut seen = HashSet::new();
    let mut profiles = Vec::new();
    for id in ids {
        if !seen.insert(*id) {
            continue;
        }
        let filament = storage
            .filaments
            .get(*id)?
            .ok_or_else(|| SpoolError::filament_not_found(id.to_string()))?;
        profiles.push(filament);
    }
    Ok(profiles)
}

fn append_json<W, T>(builder: &mut tar::Builder<W>, name: &str, value: &T) -> SpoolResult<()>
where
    W: std::io::Write,
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| SpoolError::Export(format!("Failed to serialize {}: {}", name, e)))?;

    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(Utc::now().timestamp().max(0) as u64);

    builder
        .append_data(&mut header, name, data.as_slice())
        .map_err(|e| SpoolError::Export(format!("Failed to add {} to archive: {}", name, e)))
}
