//! Broad-phase spatial index over chunk extents.
//!
//! Built once per extraction session from [`ChunkMetadata`] by bulk-loading
//! an R-tree; chunks are immutable for the session so no incremental insert
//! or delete is needed. Queries use AABB envelope intersection and may
//! return false positives once floating-point edge effects are considered,
//! so callers narrow-phase verify every candidate against the query region.

use crate::geometry::BoundingBox;
use crate::metadata::ChunkMetadata;
use rstar::{AABB, RTree, RTreeObject};

/// One indexed chunk: the id and its cell rectangle travel together so
/// query results never have to be mapped back through list positions.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkEntry {
    pub id: String,
    pub bounds: BoundingBox,
}

impl RTreeObject for ChunkEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.x_min, self.bounds.y_min],
            [self.bounds.x_max, self.bounds.y_max],
        )
    }
}

/// R-tree over `(chunk_id, BoundingBox)` pairs.
///
/// Candidate retrieval is sub-linear in the number of chunks for typical
/// query regions, which matters once partitioning produces hundreds of
/// cells.
#[derive(Debug)]
pub struct ChunkIndex {
    tree: RTree<ChunkEntry>,
}

impl ChunkIndex {
    /// Bulk-load the index from a metadata mapping.
    pub fn build(metadata: &ChunkMetadata) -> Self {
        let entries = metadata
            .iter()
            .map(|(id, bounds)| ChunkEntry {
                id: id.clone(),
                bounds: *bounds,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Broad-phase candidate query: every chunk whose stored rectangle may
    /// intersect `region`. The region is normalized before the lookup, so
    /// corner order does not matter.
    pub fn query(&self, region: &BoundingBox) -> Vec<&ChunkEntry> {
        let region = region.normalized();
        let envelope =
            AABB::from_corners([region.x_min, region.y_min], [region.x_max, region.y_max]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
