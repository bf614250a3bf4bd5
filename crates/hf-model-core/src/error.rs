//! Error types for the inventory engine.
//!
//! Discovery-time problems (unreadable roots, permission-denied entries,
//! malformed manifests) are reported as [`SoftFailure`](crate::SoftFailure)
//! data rather than errors. The variants here cover the failures that are
//! surfaced to the caller directly: configuration mistakes, persistence
//! errors and lookups of assets that do not exist.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the inventory engine.
#[derive(Debug, Error)]
pub enum InventoryError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("Malformed manifest {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Validation errors
    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Catalog errors
    #[error("Asset not found: {identity}")]
    AssetNotFound { identity: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;

impl From<std::io::Error> for InventoryError {
    fn from(err: std::io::Error) -> Self {
        InventoryError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(err: serde_json::Error) -> Self {
        InventoryError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl InventoryError {
    /// Create an IO error with path context.
    ///
    /// Permission and not-found errors are mapped onto their dedicated
    /// variants so callers can match on them without inspecting the source.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => InventoryError::PermissionDenied(path),
            std::io::ErrorKind::NotFound => InventoryError::FileNotFound(path),
            _ => InventoryError::Io {
                message: err.to_string(),
                path: Some(path),
                source: Some(err),
            },
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        InventoryError::Config {
            message: message.into(),
        }
    }

    /// Whether this error was raised at the configuration boundary.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            InventoryError::Config { .. } | InventoryError::Validation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InventoryError::AssetNotFound {
            identity: "hf:models/org/foo".into(),
        };
        assert_eq!(err.to_string(), "Asset not found: hf:models/org/foo");
    }

    #[test]
    fn test_io_with_path_maps_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let mapped = InventoryError::io_with_path(err, "/data/hub");
        assert!(matches!(mapped, InventoryError::PermissionDenied(p) if p == PathBuf::from("/data/hub")));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(InventoryError::config("duplicate").is_configuration_error());
        assert!(!InventoryError::Other("x".into()).is_configuration_error());
    }
}
