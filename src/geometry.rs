//! Axis-aligned bounding boxes and the small geometry helpers the rest of
//! the crate is built on.
//!
//! Coordinates are longitude/latitude (EPSG:4326) throughout, matching the
//! feature geometries they describe. Degenerate (zero-area) boxes are valid
//! values and must not trip division by zero downstream; callers that step
//! across a box check [`BoundingBox::is_degenerate`] first.

use geo::{BoundingRect, Polygon, Rect, coord};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box in EPSG:4326 coordinates.
///
/// The serialized form uses the `x_min`/`y_min`/`x_max`/`y_max` field names
/// of the persisted metadata format. Invariant: `x_min <= x_max` and
/// `y_min <= y_max`; construct with [`BoundingBox::from_corners`] when the
/// corner order is not known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a bounding box from already-ordered coordinates.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create a bounding box from two opposite corners in either order.
    ///
    /// # Examples
    ///
    /// ```
    /// use geochunk::BoundingBox;
    ///
    /// let a = BoundingBox::from_corners((36.9, -1.2), (36.7, -1.4));
    /// let b = BoundingBox::from_corners((36.7, -1.4), (36.9, -1.2));
    /// assert_eq!(a, b);
    /// assert_eq!(a.x_min, 36.7);
    /// ```
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            x_min: a.0.min(b.0),
            y_min: a.1.min(b.1),
            x_max: a.0.max(b.0),
            y_max: a.1.max(b.1),
        }
    }

    /// Return a copy with the corner coordinates ordered into min/max form.
    pub fn normalized(&self) -> Self {
        Self::from_corners((self.x_min, self.y_min), (self.x_max, self.y_max))
    }

    /// Whether the min/max invariant holds on both axes.
    pub fn is_well_ordered(&self) -> bool {
        self.x_min <= self.x_max && self.y_min <= self.y_max
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// A box collapsed to a line or point on at least one axis.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0.0 || self.height() == 0.0
    }

    /// Closed-interval intersection test against another box.
    ///
    /// Boxes that merely share an edge count as intersecting, which is what
    /// keeps boundary-straddling features present in every adjacent cell.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.x_max < other.x_min
            || self.x_min > other.x_max
            || self.y_max < other.y_min
            || self.y_min > other.y_max)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Smallest box covering both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> Self {
        Self {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(
            coord! { x: self.x_min, y: self.y_min },
            coord! { x: self.x_max, y: self.y_max },
        )
    }

    /// Polygon form for exact `geo::Intersects` tests against geometries.
    pub fn to_polygon(&self) -> Polygon {
        self.to_rect().to_polygon()
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x_min: rect.min().x,
            y_min: rect.min().y,
            x_max: rect.max().x,
            y_max: rect.max().y,
        }
    }

    /// Bounding box of an arbitrary geometry, `None` for empty geometries.
    pub fn of_geometry(geometry: &geo::Geometry) -> Option<Self> {
        geometry.bounding_rect().map(Self::from_rect)
    }
}
