//! Per-axis bounding-box size distributions of a geometry collection.

use super::finite_bbox;
use crate::config::StatMeasure;
use geo::{Geometry, Rect, coord};
use serde::Serialize;

/// Distribution of bounding-box extents along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisStats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub median: f64,
}

impl AxisStats {
    /// Build from a non-empty, ascending slice.
    fn from_sorted(values: &[f64]) -> Self {
        let n = values.len();
        let median = if n % 2 == 0 {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        } else {
            values[n / 2]
        };
        Self {
            min: values[0],
            max: values[n - 1],
            average: values.iter().sum::<f64>() / n as f64,
            median,
        }
    }

    pub fn get(&self, measure: StatMeasure) -> f64 {
        match measure {
            StatMeasure::Min => self.min,
            StatMeasure::Max => self.max,
            StatMeasure::Average => self.average,
            StatMeasure::Median => self.median,
        }
    }
}

/// Bounding-box statistics of one collection, computed once per join.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryStats {
    /// Number of geometries with a usable bounding box
    pub count: usize,
    /// Widths
    pub x: AxisStats,
    /// Heights
    pub y: AxisStats,
    /// Union of all bounding boxes
    #[serde(skip)]
    pub extent: Rect,
}

impl GeometryStats {
    /// Returns `None` when no geometry in the collection has a bounding box.
    pub fn from_geometries<'a, I>(geometries: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Geometry>,
    {
        let mut widths = Vec::new();
        let mut heights = Vec::new();
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);

        for rect in geometries.into_iter().filter_map(finite_bbox) {
            widths.push(rect.width());
            heights.push(rect.height());
            min_x = min_x.min(rect.min().x);
            min_y = min_y.min(rect.min().y);
            max_x = max_x.max(rect.max().x);
            max_y = max_y.max(rect.max().y);
        }

        if widths.is_empty() {
            return None;
        }

        widths.sort_by(f64::total_cmp);
        heights.sort_by(f64::total_cmp);

        Some(Self {
            count: widths.len(),
            x: AxisStats::from_sorted(&widths),
            y: AxisStats::from_sorted(&heights),
            extent: Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }),
        })
    }

    /// `stat_x * stat_y * count`, a rough measure of the area the collection
    /// covers on the grid.
    pub fn estimated_area(&self, measure: StatMeasure) -> f64 {
        self.x.get(measure) * self.y.get(measure) * self.count as f64
    }
}
