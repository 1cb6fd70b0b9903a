//! Persisted chunk metadata: the `chunk_id -> BoundingBox` mapping that is
//! the source of truth for the spatial index.
//!
//! The on-disk form is a single JSON object mapping each chunk file name to
//! its grid-cell rectangle (`{x_min, y_min, x_max, y_max}`), stored in a
//! `<name>_metadata.json` file next to the chunk files. The rectangle is the
//! cell, not the chunk's true feature extent.

use crate::error::{GeochunkError, Result};
use crate::geometry::BoundingBox;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// File name suffix identifying the metadata document inside a chunk folder.
pub const METADATA_SUFFIX: &str = "_metadata.json";

/// Mapping from chunk id to the grid-cell rectangle it covers.
///
/// Backed by a `BTreeMap` so serialization order is deterministic. Every id
/// present here must correspond to a persisted, readable chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkMetadata {
    entries: BTreeMap<String, BoundingBox>,
}

impl ChunkMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: String, bounds: BoundingBox) {
        self.entries.insert(id, bounds);
    }

    pub fn get(&self, id: &str) -> Option<&BoundingBox> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BoundingBox)> {
        self.entries.iter()
    }

    /// Check that every rectangle is min <= max on both axes.
    pub fn validate(&self) -> Result<()> {
        for (id, bounds) in &self.entries {
            if !bounds.is_well_ordered() {
                return Err(GeochunkError::MetadataCorrupt(format!(
                    "chunk '{id}' has inverted bounds"
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(String, BoundingBox)> for ChunkMetadata {
    fn from_iter<I: IntoIterator<Item = (String, BoundingBox)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Reads and writes the metadata document for one chunk folder.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Persist the mapping as `<name>_metadata.json`.
    pub fn save(&self, name: &str, metadata: &ChunkMetadata) -> Result<()> {
        let path = self.dir.join(format!("{name}{METADATA_SUFFIX}"));
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), metadata)?;
        Ok(())
    }

    /// Load and validate the metadata document in the folder.
    ///
    /// Fails with [`GeochunkError::MetadataMissing`] when no `*_metadata.json`
    /// file exists and [`GeochunkError::MetadataCorrupt`] when the document
    /// does not parse or any value is not a well-ordered rectangle.
    pub fn load(&self) -> Result<ChunkMetadata> {
        let path = self
            .find_metadata_file()?
            .ok_or_else(|| GeochunkError::MetadataMissing(self.dir.clone()))?;

        let contents = std::fs::read_to_string(&path)?;
        let metadata: ChunkMetadata = serde_json::from_str(&contents)
            .map_err(|e| GeochunkError::MetadataCorrupt(format!("{}: {e}", path.display())))?;
        metadata.validate()?;
        Ok(metadata)
    }

    fn find_metadata_file(&self) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(GeochunkError::MetadataMissing(self.dir.clone()));
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(METADATA_SUFFIX))
            {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
