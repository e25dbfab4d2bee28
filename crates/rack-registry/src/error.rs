//! Error types for registry operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering plugins.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to read a file or directory
    #[error("failed to read '{path}': {source}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a manifest
    #[error("failed to parse manifest '{path}': {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Manifest parsed but describes something the registry cannot build
    #[error("invalid manifest '{path}': {reason}")]
    InvalidManifest {
        /// Manifest path.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
}

impl RegistryError {
    /// Create a read error.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Read {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        RegistryError::Parse {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid manifest error.
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
