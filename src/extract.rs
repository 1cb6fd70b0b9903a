//! Two-phase bounding-box extraction.
//!
//! Broad phase: the chunk index shortlists candidate chunks by rectangle
//! overlap. Narrow phase: each candidate is loaded and its features are
//! kept only when the geometry exactly intersects the query region, then
//! the string-encoded attribute payload is decoded per kept feature.
//! Per-item failures (one chunk, one feature) are logged and skipped;
//! extraction only fails structurally.

use crate::chunk::ChunkStore;
use crate::error::{GeochunkError, Result};
use crate::geometry::BoundingBox;
use crate::index::ChunkIndex;
use crate::progress::ProgressObserver;
use crate::types::{Feature, FeatureCollection};
use geo::Intersects;
use rayon::prelude::*;
use std::time::Instant;

/// Extraction tuning.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Abort with [`GeochunkError::DeadlineExceeded`] once this instant
    /// passes. Partial results are discarded, never partially merged.
    pub deadline: Option<Instant>,
}

impl ExtractOptions {
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }
}

/// Result of one extraction call.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Merged output collection, EPSG:4326. Boundary-duplicated features
    /// are preserved, not deduplicated.
    pub collection: FeatureCollection,
    /// Number of features in the output. Zero is a successful outcome.
    pub count: usize,
}

/// Extract every feature intersecting `region` from the chunks shortlisted
/// by `index`.
///
/// The region's corners are normalized first, so either corner order is
/// accepted. Candidate chunks are independent and processed on the rayon
/// pool; merge order carries no meaning.
pub fn extract<S: ChunkStore>(
    index: &ChunkIndex,
    store: &S,
    region: BoundingBox,
    options: &ExtractOptions,
    progress: &dyn ProgressObserver,
) -> Result<Extraction> {
    let region = region.normalized();
    let region_polygon = region.to_polygon();

    let candidates = index.query(&region);
    log::info!("found {} potentially intersecting chunks", candidates.len());

    progress.begin("extract", candidates.len());
    let batches = candidates
        .par_iter()
        .map(|entry| -> Result<Vec<Feature>> {
            if let Some(deadline) = options.deadline
                && Instant::now() >= deadline
            {
                return Err(GeochunkError::DeadlineExceeded);
            }

            // The broad phase may return false positives; re-check the
            // stored rectangle before paying for the load.
            if !entry.bounds.intersects(&region) {
                progress.advance();
                return Ok(Vec::new());
            }

            let stored = match store.load(&entry.id) {
                Ok(stored) => stored,
                Err(GeochunkError::ChunkMissing(id)) => {
                    log::warn!("chunk '{id}' not found, skipping");
                    progress.advance();
                    return Ok(Vec::new());
                }
                Err(GeochunkError::ChunkCorrupt { id, reason }) => {
                    log::warn!("chunk '{id}' unreadable ({reason}), skipping");
                    progress.advance();
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };

            let mut kept = Vec::new();
            for feature in stored {
                if !feature.geometry.intersects(&region_polygon) {
                    continue;
                }
                match feature.decode() {
                    Ok(feature) => kept.push(feature),
                    Err(e) => {
                        log::warn!("chunk '{}': skipping feature: {e}", entry.id);
                    }
                }
            }
            progress.advance();
            Ok(kept)
        })
        .collect::<Result<Vec<_>>>()?;
    progress.finish("extract");

    let features: Vec<Feature> = batches.into_iter().flatten().collect();
    let count = features.len();
    if count == 0 {
        log::info!("no features found in the query region");
    } else {
        log::info!("extracted {count} features");
    }

    Ok(Extraction {
        collection: FeatureCollection::new(features),
        count,
    })
}
