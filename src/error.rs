//! Error types for geochunk operations.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GeochunkError>;

/// Errors produced by partitioning, indexing, and extraction.
///
/// Per-item failures (a single feature, a single chunk) are handled where
/// they occur and logged; only structural failures surface through this type.
#[derive(Debug, Error)]
pub enum GeochunkError {
    /// The upstream catalog or tile data could not be fetched.
    #[error("data source unavailable: {0}")]
    SourceUnavailable(String),

    /// The requested location does not exist in the catalog.
    ///
    /// `available` carries the sorted list of valid location names so the
    /// caller can present alternatives.
    #[error("no data found for location '{location}'")]
    NoDataForLocation {
        location: String,
        available: Vec<String>,
    },

    /// No metadata file was found; efficient extraction cannot proceed.
    #[error("metadata file not found in '{}'", .0.display())]
    MetadataMissing(PathBuf),

    /// The metadata file exists but does not decode into well-ordered bounds.
    #[error("metadata file is corrupt: {0}")]
    MetadataCorrupt(String),

    /// A chunk referenced by metadata is absent from storage.
    #[error("chunk '{0}' not found in storage")]
    ChunkMissing(String),

    /// A chunk file exists but could not be decoded.
    #[error("chunk '{id}' could not be decoded: {reason}")]
    ChunkCorrupt { id: String, reason: String },

    /// A feature's string-encoded attribute payload did not decode.
    #[error("attribute payload could not be decoded: {0}")]
    AttributeDecode(String),

    /// Partitioning was asked to run over a collection with no features.
    #[error("feature collection is empty")]
    EmptyCollection,

    /// Malformed caller input (corner coordinates, chunk targets, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller-supplied deadline elapsed before extraction finished.
    #[error("extraction deadline exceeded")]
    DeadlineExceeded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeochunkError::ChunkMissing("tile_1.geojson".to_string());
        assert_eq!(err.to_string(), "chunk 'tile_1.geojson' not found in storage");

        let err = GeochunkError::NoDataForLocation {
            location: "Atlantis".to_string(),
            available: vec!["Kenya".to_string(), "Peru".to_string()],
        };
        assert!(err.to_string().contains("Atlantis"));
    }

    #[test]
    fn test_io_error_conversion() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/nonexistent/geochunk")?)
        }
        assert!(matches!(read(), Err(GeochunkError::Io(_))));
    }
}
