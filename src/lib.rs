//! Grid partitioning and bounding-box extraction for large GeoJSON feature
//! collections.
//!
//! A collection too large to query as a single unit is split into spatially
//! coherent chunks by an adaptive uniform grid, a lightweight R-tree index
//! is built over the chunk extents, and bounding-box queries retrieve only
//! the chunks that can possibly intersect the region before an exact
//! geometry filter reassembles one output collection.
//!
//! ```rust
//! use geochunk::{BoundingBox, ChunkIndex, ChunkMetadata};
//!
//! let mut metadata = ChunkMetadata::new();
//! metadata.insert(
//!     "nairobi_36.700000_-1.400000.geojson".to_string(),
//!     BoundingBox::new(36.7, -1.4, 36.8, -1.3),
//! );
//!
//! let index = ChunkIndex::build(&metadata);
//! let hits = index.query(&BoundingBox::from_corners((36.75, -1.35), (36.78, -1.32)));
//! assert_eq!(hits.len(), 1);
//! ```

pub mod catalog;
pub mod chunk;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod index;
pub mod metadata;
pub mod partition;
pub mod progress;
pub mod types;

pub use error::{GeochunkError, Result};

pub use geometry::BoundingBox;
pub use types::{Attributes, Feature, FeatureCollection};

pub use chunk::{ChunkStore, DirectoryStore, StoredFeature};
pub use metadata::{ChunkMetadata, METADATA_SUFFIX, MetadataStore};

pub use index::{ChunkEntry, ChunkIndex};
pub use partition::{DEFAULT_TARGET_CHUNK_COUNT, Partitioner, grid_cells};

pub use extract::{ExtractOptions, Extraction, extract};

pub use progress::{NoProgress, ProgressObserver};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeochunkError, Result};

    pub use crate::{Attributes, BoundingBox, Feature, FeatureCollection};

    pub use crate::{ChunkIndex, ChunkMetadata, MetadataStore, Partitioner};

    pub use crate::{ChunkStore, DirectoryStore};

    pub use crate::{ExtractOptions, extract};

    pub use crate::{NoProgress, ProgressObserver};
}
