//! Catalog builder.
//!
//! A build scans every registered root, overlays manifests onto custom and
//! LoRA records, resolves path collisions between overlapping roots,
//! deduplicates by logical identity and sorts. Problems along the way are
//! collected in the [`BuildReport`]; a build always produces a catalog.

use crate::config::InventoryConfig;
use crate::inventory::manifest::load_for_build;
use crate::inventory::naming::format_size;
use crate::inventory::overlay;
use crate::inventory::scanner::{scan, ScanEvent};
use crate::inventory::types::{
    AssetKind, AssetRecord, BuildReport, Catalog, RawAsset, SortKey,
};
use crate::platform::{path_depth, path_key};
use crate::registrations::DirectoryRegistration;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Builds a [`Catalog`] from a list of registrations.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    sort_by: SortKey,
    ttl: Duration,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self {
            sort_by: SortKey::default(),
            ttl: InventoryConfig::CATALOG_TTL,
        }
    }
}

/// A record on its way into the catalog.
struct Candidate {
    record: AssetRecord,
    root_depth: usize,
    registration: usize,
    manifest_name: bool,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort_by = key;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn build(&self, registrations: &[DirectoryRegistration]) -> Catalog {
        info!("Building catalog from {} roots", registrations.len());
        let mut report = BuildReport::default();
        let mut candidates = Vec::new();

        for (index, registration) in registrations.iter().enumerate() {
            let root = &registration.path;
            let events = match scan(root, registration.declared_type) {
                Ok(events) => events,
                Err(failure) => {
                    warn!("Skipping root {}: {}", root.display(), failure.message);
                    report.failures.push(failure);
                    continue;
                }
            };
            report.roots_scanned += 1;

            let mut assets = Vec::new();
            for event in events {
                match event {
                    ScanEvent::Asset(asset) => assets.push(asset),
                    ScanEvent::Failure(failure) => {
                        warn!("{}: {}", failure.path.display(), failure.message);
                        report.failures.push(failure);
                    }
                }
            }

            let root_depth = path_depth(root);
            let mut root_candidates: Vec<Candidate> = assets
                .into_iter()
                .map(|asset| Candidate {
                    record: detected_record(asset),
                    root_depth,
                    registration: index,
                    manifest_name: false,
                })
                .collect();

            if root_candidates.iter().any(|c| c.record.kind.is_local()) {
                let (manifest, failure) = load_for_build(root);
                report.failures.extend(failure);
                if let Some(manifest) = manifest {
                    let entries = manifest.index(root);
                    for candidate in root_candidates
                        .iter_mut()
                        .filter(|c| c.record.kind.is_local())
                    {
                        if let Some(entry) = entries.get(&path_key(&candidate.record.path)) {
                            candidate.manifest_name = overlay::apply(&mut candidate.record, entry);
                        }
                    }
                }
            }

            candidates.extend(root_candidates);
        }

        let candidates = resolve_path_collisions(candidates);
        let (mut records, mut secondary) = deduplicate(candidates);
        report.duplicates_suppressed = secondary.len();
        report.records_found = records.len();

        sort_records(&mut records, self.sort_by);
        secondary.sort_by(|a, b| a.path.cmp(&b.path));

        info!(
            "Catalog built: {} records, {} duplicates, {} failures",
            report.records_found,
            report.duplicates_suppressed,
            report.failures.len()
        );
        Catalog::new(records, secondary, report, self.ttl)
    }
}

fn detected_record(asset: RawAsset) -> AssetRecord {
    AssetRecord {
        id: String::new(),
        size_display: format_size(asset.size_bytes),
        path: asset.path,
        display_name: asset.detected_name,
        publisher: asset.detected_publisher,
        raw_name: asset.raw_name,
        kind: asset.kind,
        size_bytes: asset.size_bytes,
        modified_at: asset.modified_at,
        source_root: asset.source_root,
        notes: None,
        manifest_applied: false,
        duplicates: Vec::new(),
    }
}

/// One record per normalized path: the deepest root wins, then the
/// earliest registration.
fn resolve_path_collisions(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = path_key(&candidate.record.path);
        match slots.get(&key) {
            Some(&slot) => {
                let current = &kept[slot];
                let replaces = candidate.root_depth > current.root_depth
                    || (candidate.root_depth == current.root_depth
                        && candidate.registration < current.registration);
                debug!(
                    "{} reached from {} and {}",
                    candidate.record.path.display(),
                    current.record.source_root.display(),
                    candidate.record.source_root.display()
                );
                if replaces {
                    kept[slot] = candidate;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Logical identity used for deduplication.
fn identity(candidate: &Candidate) -> String {
    let record = &candidate.record;
    match record.kind {
        AssetKind::CacheModel | AssetKind::CacheDataset => {
            let category = if record.kind == AssetKind::CacheDataset {
                "datasets"
            } else {
                "models"
            };
            format!("hf:{}/{}", category, record.raw_name)
        }
        _ if candidate.manifest_name => format!("name:{}", record.display_name),
        _ => format!("path:{}", record.path.display()),
    }
}

/// Newest first, then smaller path.
fn primary_order(a: &AssetRecord, b: &AssetRecord) -> Ordering {
    b.modified_at
        .cmp(&a.modified_at)
        .then_with(|| a.path.cmp(&b.path))
}

fn deduplicate(candidates: Vec<Candidate>) -> (Vec<AssetRecord>, Vec<AssetRecord>) {
    let mut groups: Vec<Vec<AssetRecord>> = Vec::new();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let id = identity(&candidate);
        let mut record = candidate.record;
        record.id = id.clone();
        match by_id.get(&id) {
            Some(&group) => groups[group].push(record),
            None => {
                by_id.insert(id, groups.len());
                groups.push(vec![record]);
            }
        }
    }

    let mut primary = Vec::with_capacity(groups.len());
    let mut secondary = Vec::new();
    for mut group in groups {
        group.sort_by(primary_order);
        let mut iter = group.into_iter();
        let Some(mut winner) = iter.next() else {
            continue;
        };
        for suppressed in iter {
            debug!(
                "Suppressing duplicate {} of {}",
                suppressed.path.display(),
                winner.id
            );
            winner.duplicates.push(suppressed.path.clone());
            secondary.push(suppressed);
        }
        primary.push(winner);
    }

    (primary, secondary)
}

/// Sort records by `key`; ties are broken by ascending path.
pub fn sort_records(records: &mut [AssetRecord], key: SortKey) {
    records.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Size => b.size_bytes.cmp(&a.size_bytes),
            SortKey::Name => a
                .display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase()),
            SortKey::Date => a.modified_at.cmp(&b.modified_at),
            SortKey::Type => a.kind.as_str().cmp(b.kind.as_str()),
        };
        ordering.then_with(|| a.path.cmp(&b.path))
    });
}
