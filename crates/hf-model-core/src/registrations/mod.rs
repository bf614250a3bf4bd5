//! Registered directories and the persisted registration set.

mod store;

pub use store::{JsonRegistrationStore, MemoryRegistrationStore, RegistrationStore};

use crate::inventory::DeclaredType;
use crate::platform::{clean_path, default_datasets_cache, default_hub_cache, path_key};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// A directory the user asked to be scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRegistration {
    pub path: PathBuf,
    #[serde(rename = "type", default)]
    pub declared_type: DeclaredType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,
}

impl DirectoryRegistration {
    /// New registration stamped with the current time.
    pub fn new(path: impl Into<PathBuf>, declared_type: DeclaredType) -> Self {
        Self {
            path: path.into(),
            declared_type,
            added_date: Some(Utc::now().to_rfc3339()),
        }
    }

    fn default_cache(path: PathBuf) -> Self {
        Self {
            path,
            declared_type: DeclaredType::Huggingface,
            added_date: None,
        }
    }

    /// Same path as written, after lexical cleanup. Symlink aliases differ.
    pub fn is_literally(&self, path: &Path) -> bool {
        self.path == path || clean_path(&self.path) == clean_path(path)
    }

    /// Literal or normalized path match.
    pub fn matches(&self, path: &Path) -> bool {
        self.is_literally(path) || path_key(&self.path) == path_key(path)
    }
}

/// Stored entries are registration objects or, in older files, bare paths.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Legacy(PathBuf),
    Full(DirectoryRegistration),
}

fn deserialize_entries<'de, D>(deserializer: D) -> Result<Vec<DirectoryRegistration>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<StoredEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            StoredEntry::Legacy(path) => DirectoryRegistration {
                path,
                declared_type: DeclaredType::Auto,
                added_date: None,
            },
            StoredEntry::Full(registration) => registration,
        })
        .collect())
}

fn default_true() -> bool {
    true
}

/// Persisted registration state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSet {
    #[serde(default, deserialize_with = "deserialize_entries")]
    pub custom_directories: Vec<DirectoryRegistration>,
    #[serde(default = "default_true")]
    pub include_default_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl Default for RegistrationSet {
    fn default() -> Self {
        Self {
            custom_directories: Vec::new(),
            include_default_cache: true,
            last_updated: None,
        }
    }
}

impl RegistrationSet {
    /// Registration for `path`, preferring one registered under that exact
    /// path over one that only resolves to the same directory.
    pub fn find(&self, path: &Path) -> Option<&DirectoryRegistration> {
        self.custom_directories
            .iter()
            .find(|r| r.is_literally(path))
            .or_else(|| self.custom_directories.iter().find(|r| r.matches(path)))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.find(path).is_some()
    }

    /// Whether `path` itself is registered, not merely an alias of it.
    pub fn contains_literal(&self, path: &Path) -> bool {
        self.custom_directories.iter().any(|r| r.is_literally(path))
    }

    /// Remove the registrations for `path`. When `path` is registered as
    /// written only those entries go; otherwise every entry resolving to the
    /// same directory does.
    pub fn remove(&mut self, path: &Path) -> bool {
        let before = self.custom_directories.len();
        if self.contains_literal(path) {
            self.custom_directories.retain(|r| !r.is_literally(path));
        } else {
            self.custom_directories.retain(|r| !r.matches(path));
        }
        self.custom_directories.len() != before
    }

    pub(crate) fn touch(&mut self) {
        self.last_updated = Some(Utc::now().to_rfc3339());
    }

    /// Roots to scan, in order: existing default caches (when enabled),
    /// then every custom directory.
    ///
    /// Missing custom directories stay in the list so a build reports them.
    pub fn effective_roots(&self) -> Vec<DirectoryRegistration> {
        let mut roots = Vec::new();
        if self.include_default_cache {
            for cache in [default_hub_cache(), default_datasets_cache()]
                .into_iter()
                .flatten()
            {
                if cache.is_dir() && !self.contains(&cache) {
                    roots.push(DirectoryRegistration::default_cache(cache));
                }
            }
        }
        roots.extend(self.custom_directories.iter().cloned());
        roots
    }
}
