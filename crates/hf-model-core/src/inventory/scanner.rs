//! Directory scanner.
//!
//! [`scan`] checks the root, resolves its layout and returns a lazy
//! [`Scan`] iterator over the root's children in lexicographic order. Each
//! call starts from scratch; nothing is remembered between scans.

use crate::config::LayoutConfig;
use crate::inventory::classifier::{
    asset_subdirs, classify_direct, classify_listed, resolve_layout, Listing,
};
use crate::inventory::naming::{basename, local_names, parse_cache_name, UNKNOWN_PUBLISHER};
use crate::inventory::size::{measure, measure_all, Measurement};
use crate::inventory::types::{
    AssetKind, Classification, DeclaredType, FailureKind, RawAsset, RootLayout, SoftFailure,
};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One item produced by a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Asset(RawAsset),
    Failure(SoftFailure),
}

enum Candidate {
    Child(PathBuf),
    /// A member of a group directory, already classified.
    Member(PathBuf, AssetKind),
}

/// Lazy iterator over the artifacts of one root.
pub struct Scan {
    root: PathBuf,
    layout: RootLayout,
    declared: DeclaredType,
    pending: VecDeque<Candidate>,
    queued: VecDeque<ScanEvent>,
}

/// Start scanning a registered root.
///
/// A root that is missing, not a directory or unreadable is reported as a
/// [`FailureKind::RootUnreachable`] soft failure instead of a scan.
pub fn scan(root: &Path, declared: DeclaredType) -> Result<Scan, SoftFailure> {
    let unreachable =
        |message: String| SoftFailure::new(root, FailureKind::RootUnreachable, message);

    let meta = fs::metadata(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => unreachable("Directory does not exist".to_string()),
        _ => unreachable(format!("Cannot access directory: {}", e)),
    })?;
    if !meta.is_dir() {
        return Err(unreachable("Path is not a directory".to_string()));
    }

    let layout = resolve_layout(root, declared)
        .map_err(|e| unreachable(format!("Cannot read directory: {}", e)))?;
    let listing =
        Listing::read(root).map_err(|e| unreachable(format!("Cannot read directory: {}", e)))?;

    debug!(
        "Scanning {} as {:?} ({} children)",
        root.display(),
        layout,
        listing.dirs.len()
    );

    Ok(Scan {
        root: root.to_path_buf(),
        layout,
        declared,
        pending: listing.dirs.into_iter().map(Candidate::Child).collect(),
        queued: VecDeque::new(),
    })
}

impl Scan {
    /// Layout the root was resolved to.
    pub fn layout(&self) -> RootLayout {
        self.layout
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn visit_child(&mut self, child: PathBuf) {
        let listing = match Listing::read(&child) {
            Ok(listing) => listing,
            Err(e) => {
                self.queued
                    .push_back(ScanEvent::Failure(SoftFailure::from_io(&child, &e)));
                return;
            }
        };

        if self.layout == RootLayout::Local && classify_direct(&child, &listing).is_none() {
            let members = asset_subdirs(&listing);
            if members.len() >= 2 {
                debug!(
                    "{} groups {} artifacts",
                    child.display(),
                    members.len()
                );
                for (path, kind) in members.into_iter().rev() {
                    self.pending.push_front(Candidate::Member(path, kind));
                }
                return;
            }
        }

        match classify_listed(&child, &listing, self.declared) {
            Classification::Asset(kind) => self.emit(child, kind),
            Classification::NotAnAsset => {
                debug!("Skipping {}: not an asset", child.display());
            }
        }
    }

    fn emit(&mut self, dir: PathBuf, kind: AssetKind) {
        let measurement = if kind.is_cache() {
            measure_cache_repo(&dir)
        } else {
            measure(&dir)
        };

        let Measurement {
            size_bytes,
            modified,
            failures,
            ..
        } = measurement;

        // Cache entries without content are interrupted downloads
        if (kind.is_cache() || kind == AssetKind::Unknown) && size_bytes == 0 {
            debug!("Skipping {}: no content", dir.display());
            self.queued
                .extend(failures.into_iter().map(ScanEvent::Failure));
            return;
        }

        let raw_name_source = basename(&dir);
        let cache_name = if kind.is_cache() {
            parse_cache_name(&raw_name_source)
        } else {
            None
        };

        let (raw_name, detected_name, detected_publisher) = match &cache_name {
            Some(parsed) => (parsed.repo_id(), parsed.name.clone(), parsed.publisher.clone()),
            None if kind == AssetKind::Unknown => (
                raw_name_source.clone(),
                raw_name_source.clone(),
                UNKNOWN_PUBLISHER.to_string(),
            ),
            None => {
                let (name, publisher) = local_names(&dir);
                (raw_name_source.clone(), name, publisher)
            }
        };

        let modified_at = modified
            .or_else(|| fs::metadata(&dir).and_then(|m| m.modified()).ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        self.queued.push_back(ScanEvent::Asset(RawAsset {
            path: dir,
            raw_name,
            kind,
            detected_name,
            detected_publisher,
            size_bytes,
            modified_at,
            source_root: self.root.clone(),
            cache_name,
        }));
        self.queued
            .extend(failures.into_iter().map(ScanEvent::Failure));
    }
}

/// Blobs plus snapshots, sharing one identity set so snapshot links into
/// `blobs/` are not counted twice. `refs/` and lock files are excluded.
fn measure_cache_repo(repo: &Path) -> Measurement {
    let parts = [
        repo.join(LayoutConfig::BLOBS_DIR),
        repo.join(LayoutConfig::SNAPSHOTS_DIR),
    ];
    let parts: Vec<&Path> = parts
        .iter()
        .map(PathBuf::as_path)
        .filter(|p| p.is_dir())
        .collect();
    if parts.is_empty() {
        return measure(repo);
    }
    measure_all(&parts)
}

impl Iterator for Scan {
    type Item = ScanEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            match self.pending.pop_front()? {
                Candidate::Child(child) => self.visit_child(child),
                Candidate::Member(path, kind) => self.emit(path, kind),
            }
        }
    }
}

/// Scan a root and collect everything it yields.
pub fn scan_all(root: &Path, declared: DeclaredType) -> (Vec<RawAsset>, Vec<SoftFailure>) {
    let mut assets = Vec::new();
    let mut failures = Vec::new();
    match scan(root, declared) {
        Ok(scan) => {
            for event in scan {
                match event {
                    ScanEvent::Asset(asset) => assets.push(asset),
                    ScanEvent::Failure(failure) => failures.push(failure),
                }
            }
        }
        Err(failure) => failures.push(failure),
    }
    (assets, failures)
}
