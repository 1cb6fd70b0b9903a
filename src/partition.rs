//! Adaptive grid partitioner.
//!
//! Splits a feature collection into spatially coherent chunks sized for
//! practical file I/O. The grid is uniform: `cell_side = sqrt(area /
//! target_chunk_count)`, stepped from the dataset minimum on both axes with
//! the final cell on each axis clipped to the true maximum. Assignment is
//! inclusive intersection, not an exclusive partition: a feature straddling
//! a cell boundary lands in every cell it intersects, and the extractor's
//! candidate filtering preserves that duplication.

use crate::chunk::ChunkStore;
use crate::error::{GeochunkError, Result};
use crate::geometry::BoundingBox;
use crate::metadata::ChunkMetadata;
use crate::progress::ProgressObserver;
use crate::types::{Feature, FeatureCollection};
use geo::Intersects;
use rayon::prelude::*;

/// Default number of non-empty chunks to aim for. A tuning knob, not a hard
/// cap: empty cells are dropped and boundary cells are clipped.
pub const DEFAULT_TARGET_CHUNK_COUNT: usize = 100;

/// Compute the grid-cell rectangles for a dataset bounding box.
///
/// A degenerate (zero-area) box cannot yield a finite step, so it falls
/// back to a single cell covering the whole box instead of dividing by zero
/// or looping forever. For all other inputs the returned cells tile the box
/// exactly: adjacent cells share their common edge and the union covers the
/// input with no gaps.
pub fn grid_cells(bounds: &BoundingBox, target_chunk_count: usize) -> Vec<BoundingBox> {
    let area = bounds.area();
    if bounds.is_degenerate() || target_chunk_count == 0 {
        return vec![*bounds];
    }

    let cell_side = (area / target_chunk_count as f64).sqrt();
    let steps = |min: f64, max: f64| {
        (0..)
            .map(move |i| min + i as f64 * cell_side)
            .take_while(move |v| *v < max)
    };

    let mut cells = Vec::new();
    for x in steps(bounds.x_min, bounds.x_max) {
        for y in steps(bounds.y_min, bounds.y_max) {
            cells.push(BoundingBox::new(
                x,
                y,
                (x + cell_side).min(bounds.x_max),
                (y + cell_side).min(bounds.y_max),
            ));
        }
    }
    cells
}

/// Grid partitioner: chunks a collection and emits the metadata mapping.
#[derive(Debug, Clone)]
pub struct Partitioner {
    target_chunk_count: usize,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self {
            target_chunk_count: DEFAULT_TARGET_CHUNK_COUNT,
        }
    }
}

impl Partitioner {
    pub fn new(target_chunk_count: usize) -> Self {
        Self { target_chunk_count }
    }

    /// Partition `collection` into chunks persisted through `store`.
    ///
    /// Chunk ids are derived from the dataset name and the cell's origin
    /// (`<name>_<x>_<y>.geojson`), so re-running over the same data is
    /// deterministic. Returns the completed metadata mapping; callers
    /// persist it next to the chunks (see
    /// [`MetadataStore::save`](crate::metadata::MetadataStore::save)) so the
    /// two artifacts stay together.
    ///
    /// Cells are independent units of work and are processed on the rayon
    /// pool; the merge into the metadata mapping is the only shared step.
    pub fn partition<S: ChunkStore>(
        &self,
        collection: &FeatureCollection,
        name: &str,
        store: &S,
        progress: &dyn ProgressObserver,
    ) -> Result<ChunkMetadata> {
        if collection.is_empty() {
            return Err(GeochunkError::EmptyCollection);
        }
        // Non-empty and every feature has a geometry, so bounds exist.
        let bounds = collection.bounding_box().ok_or_else(|| {
            GeochunkError::InvalidInput("collection has no computable bounds".to_string())
        })?;

        let cells = grid_cells(&bounds, self.target_chunk_count);
        if bounds.is_degenerate() {
            log::debug!(
                "degenerate bounds {bounds:?} for '{name}', falling back to a single chunk"
            );
        }
        log::info!(
            "partitioning {} features for '{name}' across {} candidate cells",
            collection.len(),
            cells.len()
        );

        progress.begin("partition", cells.len());
        let entries = cells
            .par_iter()
            .map(|cell| -> Result<Option<(String, BoundingBox)>> {
                let cell_polygon = cell.to_polygon();
                let subset: Vec<&Feature> = collection
                    .features
                    .iter()
                    .filter(|feature| feature.geometry.intersects(&cell_polygon))
                    .collect();

                let entry = if subset.is_empty() {
                    None
                } else {
                    let id = chunk_id(name, cell.x_min, cell.y_min);
                    store.save(&id, &subset)?;
                    Some((id, *cell))
                };
                progress.advance();
                Ok(entry)
            })
            .collect::<Result<Vec<_>>>()?;
        progress.finish("partition");

        let metadata: ChunkMetadata = entries.into_iter().flatten().collect();
        log::info!("wrote {} non-empty chunks for '{name}'", metadata.len());
        Ok(metadata)
    }
}

/// Stable chunk id derived from the dataset name and the cell origin.
pub fn chunk_id(name: &str, x: f64, y: f64) -> String {
    format!("{name}_{x:.6}_{y:.6}.geojson")
}
