//! # topolink-types
//!
//! Plain data types shared between the topolink join engine and its callers:
//!
//! - **Relations**: [`Relation`], the named topological predicates plus raw
//!   DE-9IM patterns
//! - **Mappings**: [`Mapping`], the sparse source -> target result of a join
//! - **Heuristic selectors**: [`StatMeasure`], which bounding-box statistic
//!   drives the grid cell size
//!
//! All types are serializable with Serde.
//!
//! ## Examples
//!
//! ```rust
//! use topolink_types::{Mapping, Relation};
//!
//! let relation: Relation = "contains".parse().unwrap();
//! assert_eq!(relation.swapped(), Relation::Within);
//!
//! let mut mapping = Mapping::new();
//! mapping.add("a", "b", 1.0);
//! assert!(mapping.contains("a", "b"));
//! ```

pub mod mapping;
pub mod measure;
pub mod relation;

pub use mapping::Mapping;
pub use measure::StatMeasure;
pub use relation::{ParseRelationError, Relation};
