//! Grid cell-size heuristic.
//!
//! Cell size per axis is `2 / (stat_source + stat_target)`: the reciprocal of
//! the mean extent, so an average geometry spans one or two cells per axis.

use super::stats::GeometryStats;
use crate::config::StatMeasure;
use serde::Serialize;

/// Grid scale factors and the role assignment for one join.
///
/// Coordinates are multiplied by `theta_*` before flooring/ceiling into cell
/// indices. `swap` means the target collection is indexed as the source side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellSize {
    pub theta_x: f64,
    pub theta_y: f64,
    pub swap: bool,
}

/// Decide grid scale and swap from the statistics of both collections.
///
/// The collection with the smaller estimated coverage becomes the indexing
/// source. Axes on which both collections are flat fall back to
/// `sqrt(count) / span` over the combined coordinate span (or `1.0` if that
/// is zero too), so theta is always finite and positive.
pub fn decide_cell_size(
    source: &GeometryStats,
    target: &GeometryStats,
    measure: StatMeasure,
) -> CellSize {
    let swap = source.estimated_area(measure) > target.estimated_area(measure);

    let span_x = source.extent.max().x.max(target.extent.max().x)
        - source.extent.min().x.min(target.extent.min().x);
    let span_y = source.extent.max().y.max(target.extent.max().y)
        - source.extent.min().y.min(target.extent.min().y);

    let count = source.count + target.count;
    let theta_x = axis_theta(source.x.get(measure), target.x.get(measure), span_x, count, "x");
    let theta_y = axis_theta(source.y.get(measure), target.y.get(measure), span_y, count, "y");

    log::debug!(
        "cell size ({}): theta_x={:.6} theta_y={:.6} swap={}",
        measure,
        theta_x,
        theta_y,
        swap
    );

    CellSize {
        theta_x,
        theta_y,
        swap,
    }
}

/// Flat axes get `sqrt(count) / span`: about `sqrt(count)` cells across the
/// combined span, so a spread of points keeps roughly one geometry per cell.
fn axis_theta(source_stat: f64, target_stat: f64, span: f64, count: usize, axis: &str) -> f64 {
    let denominator = source_stat + target_stat;
    let theta = 2.0 / denominator;
    if denominator > 0.0 && theta.is_finite() {
        return theta;
    }

    let spread = (count.max(1) as f64).sqrt() / span;
    let fallback = if span > 0.0 && spread.is_finite() && spread > 0.0 {
        spread
    } else {
        1.0
    };
    log::warn!(
        "Both collections are flat along {}; using fallback cell scale {}",
        axis,
        fallback
    );
    fallback
}
