//! Chunk storage: the serialization boundary between the partitioner and
//! the extractor.
//!
//! A chunk is a GeoJSON FeatureCollection document holding the non-empty
//! subset of features that intersect one grid cell. On disk every feature
//! carries an attribute envelope with exactly one `"properties"` field whose
//! value is itself a JSON object serialized into a single string. That
//! double encoding is a persisted-format convention inherited from existing
//! chunk files, so both the writer and the reader here preserve it; the
//! [`decode_attributes`] / [`encode_attributes`] pair is the only code aware
//! of it and the rest of the crate sees normalized attribute maps.

use crate::error::{GeochunkError, Result};
use crate::types::{Attributes, Feature};
use geojson::GeoJson;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Name of the single envelope field holding the string-encoded payload.
const ATTRIBUTE_FIELD: &str = "properties";

/// A feature as it sits in a chunk file: geometry plus the still-encoded
/// attribute envelope. Decoding happens per feature during extraction so a
/// malformed payload skips one feature, not the whole chunk.
#[derive(Debug, Clone)]
pub struct StoredFeature {
    pub geometry: geo::Geometry,
    pub properties: Attributes,
}

impl StoredFeature {
    /// Decode the envelope into the feature's true attribute map.
    pub fn decode(&self) -> Result<Feature> {
        Ok(Feature::new(
            self.geometry.clone(),
            decode_attributes(&self.properties)?,
        ))
    }
}

/// Decode a stored attribute envelope into a plain key/value map.
pub fn decode_attributes(envelope: &Attributes) -> Result<Attributes> {
    let payload = envelope
        .get(ATTRIBUTE_FIELD)
        .ok_or_else(|| GeochunkError::AttributeDecode(format!("missing '{ATTRIBUTE_FIELD}' field")))?;
    let payload = payload.as_str().ok_or_else(|| {
        GeochunkError::AttributeDecode(format!("'{ATTRIBUTE_FIELD}' field is not a string"))
    })?;

    serde_json::from_str(payload)
        .map_err(|e| GeochunkError::AttributeDecode(format!("invalid payload: {e}")))
}

/// Encode a plain attribute map into the stored envelope form.
pub fn encode_attributes(attributes: &Attributes) -> Result<Attributes> {
    let payload = serde_json::to_string(attributes)?;
    let mut envelope = Attributes::new();
    envelope.insert(
        ATTRIBUTE_FIELD.to_string(),
        serde_json::Value::String(payload),
    );
    Ok(envelope)
}

/// Backend that persists and loads chunks addressed by chunk id.
///
/// Chunks are created once by the partitioner and read-only afterward;
/// implementations only need whole-chunk save and load.
pub trait ChunkStore: Send + Sync {
    /// Persist the given features under `id`, replacing any previous chunk.
    fn save(&self, id: &str, features: &[&Feature]) -> Result<()>;

    /// Load a chunk. Fails with [`GeochunkError::ChunkMissing`] when no
    /// chunk is stored under `id` and [`GeochunkError::ChunkCorrupt`] when
    /// the stored document does not decode.
    fn load(&self, id: &str) -> Result<Vec<StoredFeature>>;
}

/// File-system chunk store: one GeoJSON file per chunk in a flat directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    /// Open an existing chunk directory without touching the file system.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory (and parents) if needed, then open it.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn chunk_path(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }
}

impl ChunkStore for DirectoryStore {
    fn save(&self, id: &str, features: &[&Feature]) -> Result<()> {
        let mut out = Vec::with_capacity(features.len());
        for feature in features {
            out.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(
                    &feature.geometry,
                ))),
                id: None,
                properties: Some(encode_attributes(&feature.attributes)?),
                foreign_members: None,
            });
        }

        let collection = geojson::FeatureCollection {
            bbox: None,
            features: out,
            foreign_members: None,
        };

        let file = File::create(self.chunk_path(id))?;
        serde_json::to_writer(BufWriter::new(file), &collection)?;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Vec<StoredFeature>> {
        let path = self.chunk_path(id);
        if !path.exists() {
            return Err(GeochunkError::ChunkMissing(id.to_string()));
        }

        let contents = std::fs::read_to_string(&path)?;
        let corrupt = |reason: String| GeochunkError::ChunkCorrupt {
            id: id.to_string(),
            reason,
        };

        let document: GeoJson = contents.parse().map_err(|e| corrupt(format!("{e}")))?;
        let GeoJson::FeatureCollection(collection) = document else {
            return Err(corrupt("not a FeatureCollection".to_string()));
        };

        let mut features = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let Some(geometry) = feature.geometry else {
                log::warn!("chunk '{id}': skipping feature without geometry");
                continue;
            };
            let geometry = match geo::Geometry::try_from(&geometry) {
                Ok(geometry) => geometry,
                Err(e) => {
                    log::warn!("chunk '{id}': skipping unsupported geometry: {e}");
                    continue;
                }
            };
            features.push(StoredFeature {
                geometry,
                properties: feature.properties.unwrap_or_default(),
            });
        }
        Ok(features)
    }
}
