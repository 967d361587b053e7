//! Evaluation and merge units.
//!
//! An [`EvaluationUnit`] is a bounded batch of candidate pairs evaluated by
//! one worker into a [`ResultFragment`]. Fragments are handed to a single
//! merge worker over a channel, which folds them into the final [`Mapping`].

use super::predicate::TopologyPredicate;
use crate::error::{JoinError, Result};
use crate::index::IndexEntry;
use crossbeam_channel::Receiver;
use rustc_hash::FxHashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use topolink_types::{Mapping, Relation};

/// Admitted (source, target) pair awaiting the exact predicate.
pub type CandidatePair<'a> = (IndexEntry<'a>, IndexEntry<'a>);

/// Confidence recorded for every satisfied topological relation.
pub const LINK_CONFIDENCE: f64 = 1.0;

/// Targets satisfying the relation, grouped by source id.
#[derive(Debug, Default)]
pub struct ResultFragment<'a> {
    links: FxHashMap<&'a str, Vec<&'a str>>,
}

impl<'a> ResultFragment<'a> {
    fn push(&mut self, source: &'a str, target: &'a str) {
        self.links.entry(source).or_default().push(target);
    }

    pub fn len(&self) -> usize {
        self.links.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Fold into `mapping`, writing `(target, source)` when the join runs
    /// swapped so the mapping keeps the caller's orientation.
    pub fn merge_into(self, mapping: &mut Mapping, swapped: bool) {
        for (source, targets) in self.links {
            for target in targets {
                if swapped {
                    mapping.add(target, source, LINK_CONFIDENCE);
                } else {
                    mapping.add(source, target, LINK_CONFIDENCE);
                }
            }
        }
    }
}

/// A batch of candidate pairs sharing one relation.
///
/// Pairs are stored in index orientation. When the join runs `swapped`, the
/// index source is the caller's target, and the predicate is called with the
/// operands put back in caller order.
#[derive(Debug)]
pub struct EvaluationUnit<'a> {
    relation: Relation,
    swapped: bool,
    pairs: Vec<CandidatePair<'a>>,
    capacity: usize,
}

impl<'a> EvaluationUnit<'a> {
    pub fn new(relation: Relation, swapped: bool, capacity: usize) -> Self {
        Self {
            relation,
            swapped,
            pairs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn schedule(&mut self, source: IndexEntry<'a>, target: IndexEntry<'a>) {
        self.pairs.push((source, target));
    }

    pub fn is_full(&self) -> bool {
        self.pairs.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Hand back the scheduled batch, leaving an empty unit behind.
    pub fn take(&mut self) -> EvaluationUnit<'a> {
        let pairs = std::mem::replace(&mut self.pairs, Vec::with_capacity(self.capacity));
        EvaluationUnit {
            relation: self.relation.clone(),
            swapped: self.swapped,
            pairs,
            capacity: self.capacity,
        }
    }

    /// Run the exact predicate on every pair. Fails on the first pair whose
    /// evaluation errors or panics; no partial fragment escapes.
    pub fn evaluate<P>(self, predicate: &P) -> Result<ResultFragment<'a>>
    where
        P: TopologyPredicate + ?Sized,
    {
        let mut fragment = ResultFragment::default();
        for (source, target) in self.pairs {
            if relate(predicate, &source, &target, &self.relation, self.swapped)? {
                fragment.push(source.id, target.id);
            }
        }
        Ok(fragment)
    }
}

/// Evaluate one index-oriented pair in caller orientation, converting a
/// predicate panic into a join error.
pub(crate) fn relate<P>(
    predicate: &P,
    source: &IndexEntry<'_>,
    target: &IndexEntry<'_>,
    relation: &Relation,
    swapped: bool,
) -> Result<bool>
where
    P: TopologyPredicate + ?Sized,
{
    let (a, b) = if swapped {
        (target, source)
    } else {
        (source, target)
    };
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        predicate.evaluate(a.geometry, b.geometry, relation)
    }));
    match outcome {
        Ok(Ok(holds)) => Ok(holds),
        Ok(Err(e @ JoinError::Predicate { .. })) => Err(e),
        Ok(Err(e)) => Err(JoinError::Predicate {
            source_id: a.id.to_string(),
            target_id: b.id.to_string(),
            message: e.to_string(),
        }),
        Err(panic) => Err(JoinError::Predicate {
            source_id: a.id.to_string(),
            target_id: b.id.to_string(),
            message: panic_message(panic.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "predicate panicked".to_string()
    }
}

/// Single merge worker: drain fragments until every sender is gone.
///
/// Each fragment is folded whole, so the mapping never holds a partial
/// batch. Returns the mapping and the number of fragments merged.
pub fn merge_fragments<'a>(
    fragments: Receiver<ResultFragment<'a>>,
    swapped: bool,
) -> (Mapping, usize) {
    let mut mapping = Mapping::new();
    let mut merged = 0;
    for fragment in fragments.iter() {
        fragment.merge_into(&mut mapping, swapped);
        merged += 1;
    }
    (mapping, merged)
}
