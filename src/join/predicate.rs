//! Exact topological predicates.

use crate::error::{JoinError, Result};
use geo::{Geometry, Intersects, Relate};
use topolink_types::Relation;

/// Exact predicate evaluated on admitted candidate pairs.
///
/// Implementations are shared by every evaluation worker of a join.
pub trait TopologyPredicate: Sync {
    fn evaluate(&self, a: &Geometry, b: &Geometry, relation: &Relation) -> Result<bool>;
}

/// Predicates backed by the `geo` crate's DE-9IM implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoPredicate;

impl TopologyPredicate for GeoPredicate {
    fn evaluate(&self, a: &Geometry, b: &Geometry, relation: &Relation) -> Result<bool> {
        let holds = match relation {
            Relation::Intersects => a.intersects(b),
            Relation::Disjoint => !a.intersects(b),
            Relation::Equals => a.relate(b).is_equal_topo(),
            Relation::Touches => a.relate(b).is_touches(),
            Relation::Crosses => a.relate(b).is_crosses(),
            Relation::Within => a.relate(b).is_within(),
            Relation::Contains => a.relate(b).is_contains(),
            Relation::Overlaps => a.relate(b).is_overlaps(),
            Relation::Pattern(pattern) => a
                .relate(b)
                .matches(pattern)
                .map_err(|e| JoinError::InvalidRelation(format!("{}: {:?}", pattern, e)))?,
        };
        Ok(holds)
    }
}

impl<P: TopologyPredicate + ?Sized> TopologyPredicate for &P {
    fn evaluate(&self, a: &Geometry, b: &Geometry, relation: &Relation) -> Result<bool> {
        (**self).evaluate(a, b, relation)
    }
}
