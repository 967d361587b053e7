//! Geometry statistics and the grid cell-size heuristic.
//!
//! Both run once per join, before any index is built, and only read the
//! input collections.

pub mod heuristic;
pub mod stats;

pub use heuristic::{CellSize, decide_cell_size};
pub use stats::{AxisStats, GeometryStats};

use geo::{BoundingRect, Geometry, Rect};

/// Bounding box of a geometry, if it has one with finite coordinates.
pub(crate) fn finite_bbox(geometry: &Geometry) -> Option<Rect> {
    let rect = geometry.bounding_rect()?;
    let (min, max) = (rect.min(), rect.max());
    if min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite() {
        Some(rect)
    } else {
        log::warn!("Ignoring geometry with non-finite bounding box");
        None
    }
}
