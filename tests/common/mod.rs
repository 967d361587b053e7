#![allow(dead_code)]

use geo::{Geometry, LineString, Point, Rect, coord};
use topolink::{GeoPredicate, GeometryMap, Mapping, Relation, TopologyPredicate};

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
    Geometry::Rect(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }))
}

/// Small deterministic generator so fixtures are reproducible.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Integer in `[lo, hi)` as f64.
    pub fn range(&mut self, lo: i32, hi: i32) -> f64 {
        (lo + (self.next_u32() % (hi - lo) as u32) as i32) as f64
    }
}

/// Mixed rectangles, points and segments on an integer lattice, so that
/// touching, equal and crossing pairs actually occur.
pub fn random_collection(prefix: &str, n: usize, seed: u64, max_size: i32) -> GeometryMap {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|i| {
            let x = rng.range(0, 40);
            let y = rng.range(0, 40);
            let geometry = match rng.next_u32() % 4 {
                0 | 1 => {
                    let w = rng.range(1, max_size + 1);
                    let h = rng.range(1, max_size + 1);
                    rect(x, y, x + w, y + h)
                }
                2 => Geometry::Point(Point::new(x, y)),
                _ => {
                    let dx = rng.range(-max_size, max_size + 1);
                    let dy = rng.range(1, max_size + 1);
                    Geometry::LineString(LineString::from(vec![(x, y), (x + dx, y + dy)]))
                }
            };
            (format!("{}{}", prefix, i), geometry)
        })
        .collect()
}

/// Pairwise reference: the exact predicate over the full cross product.
pub fn brute_force(source: &GeometryMap, target: &GeometryMap, relation: &Relation) -> Mapping {
    let mut mapping = Mapping::new();
    for (s, sg) in source {
        for (t, tg) in target {
            if GeoPredicate.evaluate(sg, tg, relation).unwrap() {
                mapping.add(s, t, 1.0);
            }
        }
    }
    mapping
}

pub const NAMED_RELATIONS: [&str; 8] = [
    "equals",
    "disjoint",
    "intersects",
    "touches",
    "crosses",
    "within",
    "contains",
    "overlaps",
];
