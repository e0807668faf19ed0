//! Error types for ipowner.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for ipowner operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A primary source file could not be opened
    #[error("failed to open {kind} {path:?}: {source}")]
    SourceOpen {
        kind: SourceKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A primary source file is malformed
    #[error("corrupt {kind}: {reason}")]
    SourceCorruption { kind: SourceKind, reason: String },

    /// A cache file exists but cannot be decoded
    #[error("corrupt cache {path:?}: {reason}")]
    CacheCorruption { path: PathBuf, reason: String },

    /// The geolocation collaborator failed
    #[error("GeoIP error: {0}")]
    Geo(String),

    /// Invalid IP address
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// Invalid CIDR notation
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Carrier pattern failed to compile
    #[error("invalid carrier pattern for {label}: {reason}")]
    InvalidPattern { label: String, reason: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for ipowner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary inputs the ingestion stages read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// SQL dump of administrative areas
    AreaDump,
    /// AS number to name registry
    AsNames,
    /// Routing table dump
    Rib,
}

impl SourceKind {
    /// Get the human readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::AreaDump => "area dump",
            SourceKind::AsNames => "AS name registry",
            SourceKind::Rib => "RIB dump",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub(crate) fn corrupt(kind: SourceKind, reason: impl Into<String>) -> Self {
        Error::SourceCorruption {
            kind,
            reason: reason.into(),
        }
    }

    pub(crate) fn cache(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Error::CacheCorruption {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
