//! Reading profile archives back into the store

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::EntityType;
use crate::error::{SpoolError, SpoolResult};
use crate::models::{Filament, FilamentId, ObservationId, PriceObservation};
use crate::storage::Storage;

use super::{ArchiveManifest, ARCHIVE_FORMAT_VERSION, MANIFEST_ENTRY, PRICES_DIR, PROFILES_DIR};

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Profiles that were not in the store
    pub imported: Vec<FilamentId>,
    /// Existing profiles replaced by a newer copy from the archive
    pub updated: Vec<FilamentId>,
    /// Profiles already present (identical, or the local copy is newer)
    pub skipped: Vec<FilamentId>,
    /// Price observations that were not yet known
    pub observations_added: usize,
}

impl ImportReport {
    /// Ids whose stored profile now comes from the archive
    pub fn changed_ids(&self) -> Vec<FilamentId> {
        self.imported.iter().chain(&self.updated).copied().collect()
    }

    pub fn total(&self) -> usize {
        self.imported.len() + self.updated.len() + self.skipped.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} imported, {} updated, {} skipped, {} price observation(s) added",
            self.imported.len(),
            self.updated.len(),
            self.skipped.len(),
            self.observations_added
        )
    }
}

/// Archive content after parsing and validation
struct ArchiveContents {
    manifest: ArchiveManifest,
    profiles: Vec<Filament>,
    observations: Vec<PriceObservation>,
}

/// Import an archive written by [`super::export_profiles`]
///
/// The whole archive is parsed and validated before the store is touched;
/// any malformed entry fails the import with `Format`.
pub fn import_profiles(storage: &Storage, source: &Path) -> SpoolResult<ImportReport> {
    let contents = read_archive(source)?;
    let mut report = ImportReport::default();
    // (incoming, replaced) for every profile written to the store
    let mut applied: Vec<(Filament, Option<Filament>)> = Vec::new();
    let mut added_observations = Vec::new();

    for incoming in contents.profiles {
        match storage.filaments.get(incoming.id)? {
            None => {
                report.imported.push(incoming.id);
                storage.filaments.upsert(incoming.clone())?;
                applied.push((incoming, None));
            }
            Some(existing) if existing != incoming && incoming.updated_at > existing.updated_at => {
                report.updated.push(incoming.id);
                storage.filaments.upsert(incoming.clone())?;
                applied.push((incoming, Some(existing)));
            }
            Some(_) => report.skipped.push(incoming.id),
        }
    }

    for observation in contents.observations {
        let id = observation.id;
        if storage.prices.merge(observation)? {
            added_observations.push(id);
        }
    }
    report.observations_added = added_observations.len();

    if let Err(e) = storage.save_all() {
        roll_back(storage, &applied, &added_observations);
        return Err(e);
    }

    for (incoming, replaced) in &applied {
        let id = incoming.id.to_string();
        let name = Some(incoming.display_name());
        match replaced {
            None => storage.log_create(EntityType::Filament, id, name, incoming)?,
            Some(existing) => {
                storage.log_update(EntityType::Filament, id, name, existing, incoming)?
            }
        }
    }

    info!(
        path = %source.display(),
        exported_at = %contents.manifest.exported_at,
        "{}",
        report.summary()
    );
    Ok(report)
}

/// Undo an import whose save failed and try to put the files back
fn roll_back(
    storage: &Storage,
    applied: &[(Filament, Option<Filament>)],
    added_observations: &[ObservationId],
) {
    let undo = || -> SpoolResult<()> {
        for (incoming, replaced) in applied {
            match replaced {
                None => {
                    storage.filaments.delete(incoming.id)?;
                }
                Some(existing) => storage.filaments.upsert(existing.clone())?,
            }
        }
        storage.prices.remove_ids(added_observations)?;
        storage.save_all()
    };

    if let Err(e) = undo() {
        warn!(error = %e, "could not restore the store after a failed import");
    }
}

fn read_archive(source: &Path) -> SpoolResult<ArchiveContents> {
    let file = File::open(source)
        .map_err(|e| SpoolError::Io(format!("Failed to open {}: {}", source.display(), e)))?;

    let entries = read_entries(file)?;

    let manifest: ArchiveManifest = match entries.get(MANIFEST_ENTRY) {
        Some(data) => parse_entry(MANIFEST_ENTRY, data)?,
        None => {
            return Err(SpoolError::Format(
                "archive has no manifest.json; not a Spoolbook archive".into(),
            ))
        }
    };
    if manifest.format_version == 0 || manifest.format_version > ARCHIVE_FORMAT_VERSION {
        return Err(SpoolError::Format(format!(
            "unsupported archive format version {} (this build reads up to {})",
            manifest.format_version, ARCHIVE_FORMAT_VERSION
        )));
    }

    let mut profiles = Vec::new();
    let mut observations = Vec::new();

    for (name, data) in &entries {
        if let Some(stem) = entry_stem(name, PROFILES_DIR) {
            let filament: Filament = parse_entry(name, data)?;
            if filament.id.as_uuid() != &stem {
                return Err(SpoolError::Format(format!(
                    "{} holds profile {}",
                    name,
                    filament.id.as_uuid()
                )));
            }
            filament
                .validate()
                .map_err(|e| SpoolError::Format(format!("{}: {}", name, e)))?;
            profiles.push(filament);
        } else if let Some(stem) = entry_stem(name, PRICES_DIR) {
            let history: Vec<PriceObservation> = parse_entry(name, data)?;
            for observation in &history {
                if observation.filament_id.as_uuid() != &stem {
                    return Err(SpoolError::Format(format!(
                        "{} holds an observation for another profile",
                        name
                    )));
                }
                if observation.vendor.trim().is_empty() || observation.price.is_negative() {
                    return Err(SpoolError::Format(format!(
                        "{}: invalid observation {}",
                        name, observation.id
                    )));
                }
            }
            observations.extend(history);
        } else if name != MANIFEST_ENTRY {
            debug!(entry = %name, "ignoring unknown archive entry");
        }
    }

    if profiles.len() != manifest.profile_count {
        return Err(SpoolError::Format(format!(
            "manifest lists {} profile(s) but the archive holds {}",
            manifest.profile_count,
            profiles.len()
        )));
    }

    for observation in &observations {
        if !profiles.iter().any(|p| p.id == observation.filament_id) {
            return Err(SpoolError::Format(format!(
                "price history for {} has no matching profile",
                observation.filament_id
            )));
        }
    }

    Ok(ArchiveContents {
        manifest,
        profiles,
        observations,
    })
}

/// Read every regular file of a tar.gz stream into memory, keyed by path
fn read_entries<R: Read>(reader: R) -> SpoolResult<BTreeMap<String, Vec<u8>>> {
    let not_an_archive =
        |e: std::io::Error| SpoolError::Format(format!("not a gzip-compressed tar archive: {}", e));

    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(reader)));
    let mut entries = BTreeMap::new();

    for entry in archive.entries().map_err(not_an_archive)? {
        let mut entry = entry.map_err(not_an_archive)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .map_err(not_an_archive)?
            .to_string_lossy()
            .replace('\\', "/");

        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(not_an_archive)?;
        entries.insert(name, data);
    }

    Ok(entries)
}

fn parse_entry<T: DeserializeOwned>(name: &str, data: &[u8]) -> SpoolResult<T> {
    serde_json::from_slice(data).map_err(|e| SpoolError::Format(format!("{}: {}", name, e)))
}

/// `dir/<uuid>.json` -> uuid
fn entry_stem(name: &str, dir: &str) -> Option<Uuid> {
    let file = name.strip_prefix(dir)?.strip_prefix('/')?;
    let stem = file.strip_suffix(".json")?;
    Uuid::parse_str(stem).ok()
}
