//! Candidate pair enumeration over two grid indexes.

use crate::error::Result;
use crate::index::{EntryId, GridIndex, IndexEntry};
use rustc_hash::{FxHashMap, FxHashSet};
use topolink_types::Relation;

/// Counters collected while enumerating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    /// Distinct (source, target) pairs sharing at least one cell
    pub distinct_pairs: usize,
    /// Pairs that passed the footprint filter
    pub admitted: usize,
}

/// Walks the populated source cells and pairs each source entry with every
/// target entry in the same cell, once per distinct pair.
pub struct CandidateEnumerator<'i, 'a> {
    source: &'i GridIndex<'a>,
    target: &'i GridIndex<'a>,
    relation: &'i Relation,
}

impl<'i, 'a> CandidateEnumerator<'i, 'a> {
    pub fn new(
        source: &'i GridIndex<'a>,
        target: &'i GridIndex<'a>,
        relation: &'i Relation,
    ) -> Self {
        Self {
            source,
            target,
            relation,
        }
    }

    /// Footprint pre-filter. Containment and equality of geometries imply
    /// the same between their footprints; the other relations get no
    /// shortcut.
    pub fn admits(relation: &Relation, source: &IndexEntry<'_>, target: &IndexEntry<'_>) -> bool {
        match relation {
            Relation::Contains => source.contains(target),
            Relation::Within => target.contains(source),
            Relation::Equals => source == target,
            _ => true,
        }
    }

    /// Feed every admitted pair to `visit`. Stops at the first error `visit`
    /// returns.
    pub fn for_each<F>(&self, mut visit: F) -> Result<EnumerationStats>
    where
        F: FnMut(IndexEntry<'a>, IndexEntry<'a>) -> Result<()>,
    {
        let mut seen: FxHashMap<EntryId, FxHashSet<EntryId>> = FxHashMap::default();
        let mut stats = EnumerationStats::default();

        for (key, source_ids) in self.source.cells() {
            let Some(target_ids) = self.target.cell(key) else {
                continue;
            };
            for &s in source_ids {
                let seen_targets = seen.entry(s).or_default();
                let a = self.source.entry(s);
                for &t in target_ids {
                    if !seen_targets.insert(t) {
                        continue;
                    }
                    stats.distinct_pairs += 1;
                    let b = self.target.entry(t);
                    if Self::admits(self.relation, a, b) {
                        stats.admitted += 1;
                        visit(*a, *b)?;
                    }
                }
            }
        }

        Ok(stats)
    }
}
