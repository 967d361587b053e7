//! Grid-indexed, parallel topological joins between two geometry collections.
//!
//! Given a source and a target collection of 2-D geometries and a relation
//! (`equals`, `disjoint`, `intersects`, `touches`, `crosses`, `within`,
//! `contains`, `overlaps` or a DE-9IM pattern), computes every
//! (source, target) pair satisfying it.
//!
//! ```rust
//! use geo::{Geometry, Point, Rect, coord};
//! use topolink::{GeometryMap, get_mapping};
//!
//! let mut parks = GeometryMap::default();
//! parks.insert(
//!     "park".to_string(),
//!     Geometry::Rect(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 })),
//! );
//! let mut trees = GeometryMap::default();
//! trees.insert("oak".to_string(), Geometry::Point(Point::new(3.0, 4.0)));
//! trees.insert("elm".to_string(), Geometry::Point(Point::new(30.0, 4.0)));
//!
//! let links = get_mapping(&parks, &trees, "contains")?;
//! assert!(links.contains("park", "oak"));
//! assert!(!links.contains("park", "elm"));
//! # Ok::<(), topolink::JoinError>(())
//! ```

pub mod compute;
pub mod config;
pub mod decode;
pub mod error;
pub mod index;
pub mod join;
pub mod linker;

pub use config::{CancellationToken, JoinConfig, StatMeasure};
pub use error::{JoinError, Result};
pub use join::{GeoPredicate, GeometryMap, JoinStats, SpatialJoin, TopologyPredicate, get_mapping};
pub use linker::{EntityStore, LinkSpec, MemoryStore, map_entities};

pub use topolink_types::{Mapping, Relation};

pub use geo::Geometry;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {
    pub use crate::{JoinConfig, JoinError, Result, SpatialJoin};

    pub use crate::{GeometryMap, Mapping, Relation};

    pub use crate::decode::{GeometryFormat, decode_collection};

    pub use geo::Geometry;
}
