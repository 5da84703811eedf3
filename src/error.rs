//! Error types for catalog access, matching and configuration.

use thiserror::Error;

/// Failures talking to the remote catalog.
///
/// None of these are fatal for a matching run: the catalog gateway logs
/// them and reports "no result" to its caller.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to parse catalog response: {0}")]
    Parse(String),

    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),

    #[error("Catalog access is shutting down")]
    ShuttingDown,
}

impl From<ureq::Error> for CatalogError {
    fn from(err: ureq::Error) -> Self {
        CatalogError::Http(err.to_string())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

/// Outcomes of comparing a group against a candidate album that are not a score.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("Album {0} has no comparable tracks")]
    NoComparableTracks(String),

    #[error("Unable to start matcher threads: {0}")]
    WorkerPool(String),
}

impl From<rayon::ThreadPoolBuildError> for MatchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        MatchError::WorkerPool(err.to_string())
    }
}

/// Failures loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOME environment variable not set")]
    NoHome,

    #[error("Config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
