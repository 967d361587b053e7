//! Grid-indexed parallel topological join.
//!
//! A join runs in fixed stages:
//!
//! 1. Bounding-box statistics of both collections pick the grid cell size
//!    and which collection is indexed as the source side.
//! 2. The source side is indexed, then the target side is indexed only into
//!    cells the source populates.
//! 3. Cell-sharing pairs are enumerated once each, pre-filtered on their
//!    footprints, and batched into evaluation units for a worker pool.
//! 4. A single merge worker folds finished fragments into the mapping.
//! 5. `disjoint` is computed as `intersects` and complemented against the
//!    full cross product at the end.
//!
//! ```rust
//! use geo::{Geometry, Rect, coord};
//! use topolink::{GeometryMap, SpatialJoin, JoinConfig};
//!
//! let square = |x0: f64, y0: f64, x1: f64, y1: f64| {
//!     Geometry::Rect(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }))
//! };
//! let mut source = GeometryMap::default();
//! source.insert("A".to_string(), square(0.0, 0.0, 2.0, 2.0));
//! let mut target = GeometryMap::default();
//! target.insert("B".to_string(), square(1.0, 1.0, 3.0, 3.0));
//! target.insert("C".to_string(), square(5.0, 5.0, 6.0, 6.0));
//!
//! let join = SpatialJoin::new(JoinConfig::default());
//! let m = join.join(&source, &target, "intersects")?;
//! assert!(m.contains("A", "B") && m.size() == 1);
//!
//! let m = join.join(&source, &target, "disjoint")?;
//! assert!(m.contains("A", "C") && m.size() == 1);
//! # Ok::<(), topolink::JoinError>(())
//! ```

pub mod candidates;
pub mod predicate;
pub mod units;

pub use candidates::{CandidateEnumerator, EnumerationStats};
pub use predicate::{GeoPredicate, TopologyPredicate};
pub use units::{EvaluationUnit, ResultFragment};

use crate::compute::{CellSize, GeometryStats, decide_cell_size, finite_bbox};
use crate::config::JoinConfig;
use crate::error::{JoinError, Result};
use crate::index::{GridIndex, IndexEntry};
use geo::Geometry;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use topolink_types::{Mapping, Relation};
use units::{LINK_CONFIDENCE, merge_fragments, relate};

/// Entity id -> geometry.
pub type GeometryMap = FxHashMap<String, Geometry>;

/// Receives every candidate pair a producer emits.
type Visit<'v, 'a> = dyn FnMut(IndexEntry<'a>, IndexEntry<'a>) -> Result<()> + 'v;

/// What a join did, for logging and tuning.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinStats {
    /// Relation the candidate filter applied, after disjoint substitution,
    /// in index orientation
    pub computed_relation: Option<Relation>,
    pub cell_size: Option<CellSize>,
    pub source_entries: usize,
    pub target_entries: usize,
    pub source_cells: usize,
    pub target_cells: usize,
    /// Distinct cell-sharing pairs
    pub candidate_pairs: usize,
    /// Exact predicate evaluations
    pub evaluations: usize,
    /// Evaluation units dispatched to the pool
    pub batches: usize,
    pub fragments_merged: usize,
    /// Pattern relations that need no intersection bypass the grid
    pub full_scan: bool,
    pub complement: bool,
}

struct Evaluated {
    mapping: Mapping,
    enumeration: EnumerationStats,
    batches: usize,
    fragments: usize,
}

/// Grid-indexed topological join engine.
#[derive(Debug, Clone, Default)]
pub struct SpatialJoin<P = GeoPredicate> {
    config: JoinConfig,
    predicate: P,
}

impl SpatialJoin<GeoPredicate> {
    pub fn new(config: JoinConfig) -> Self {
        Self {
            config,
            predicate: GeoPredicate,
        }
    }
}

impl<P: TopologyPredicate> SpatialJoin<P> {
    /// Join with a custom exact predicate.
    pub fn with_predicate(config: JoinConfig, predicate: P) -> Self {
        Self { config, predicate }
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    /// Join two collections on a relation name or DE-9IM pattern.
    pub fn join(
        &self,
        source: &GeometryMap,
        target: &GeometryMap,
        relation: &str,
    ) -> Result<Mapping> {
        let relation: Relation = relation.parse()?;
        self.join_with_stats(source, target, &relation)
            .map(|(mapping, _)| mapping)
    }

    pub fn join_relation(
        &self,
        source: &GeometryMap,
        target: &GeometryMap,
        relation: &Relation,
    ) -> Result<Mapping> {
        self.join_with_stats(source, target, relation)
            .map(|(mapping, _)| mapping)
    }

    /// Join and report what the engine did.
    ///
    /// The mapping is keyed by `source` ids whatever side the heuristic
    /// indexes first.
    pub fn join_with_stats(
        &self,
        source: &GeometryMap,
        target: &GeometryMap,
        relation: &Relation,
    ) -> Result<(Mapping, JoinStats)> {
        self.config.validate().map_err(JoinError::InvalidConfig)?;
        if self.config.is_cancelled() {
            return Err(JoinError::Cancelled);
        }

        let mut stats = JoinStats {
            complement: *relation == Relation::Disjoint,
            ..JoinStats::default()
        };
        let computed = if stats.complement {
            Relation::Intersects
        } else {
            relation.clone()
        };

        let mapping = if source.is_empty() || target.is_empty() {
            Mapping::new()
        } else if !computed.requires_intersection() {
            self.full_scan(source, target, computed, &mut stats)?
        } else {
            let source_stats = GeometryStats::from_geometries(source.values());
            let target_stats = GeometryStats::from_geometries(target.values());
            let mut mapping = match (source_stats, target_stats) {
                (Some(s), Some(t)) => {
                    self.grid_join(source, target, &computed, &s, &t, &mut stats)?
                }
                _ => Mapping::new(),
            };
            self.join_unboxed(source, target, &computed, &mut mapping, &mut stats)?;
            mapping
        };

        let mapping = if stats.complement {
            complement(source, target, &mapping)
        } else {
            mapping
        };

        log::debug!(
            "{} join: {} candidates, {} evaluations in {} batches, {} links",
            relation,
            stats.candidate_pairs,
            stats.evaluations,
            stats.batches,
            mapping.size()
        );
        Ok((mapping, stats))
    }

    fn grid_join(
        &self,
        source: &GeometryMap,
        target: &GeometryMap,
        computed: &Relation,
        source_stats: &GeometryStats,
        target_stats: &GeometryStats,
        stats: &mut JoinStats,
    ) -> Result<Mapping> {
        let cell = decide_cell_size(source_stats, target_stats, self.config.stat_measure);
        // the footprint filter runs in index orientation, the predicate in
        // caller orientation
        let (outer, inner, filter) = if cell.swap {
            (target, source, computed.swapped())
        } else {
            (source, target, computed.clone())
        };

        let source_index = GridIndex::build(entries_of(outer), &cell, None)?;
        let target_index = GridIndex::build(entries_of(inner), &cell, Some(&source_index))?;

        stats.cell_size = Some(cell);
        stats.source_entries = source_index.len();
        stats.target_entries = target_index.len();
        stats.source_cells = source_index.cell_count();
        stats.target_cells = target_index.cell_count();

        let enumerator = CandidateEnumerator::new(&source_index, &target_index, &filter);
        let evaluated = self.evaluate(computed, cell.swap, |visit| enumerator.for_each(visit))?;

        stats.computed_relation = Some(filter);
        Ok(record(evaluated, stats))
    }

    /// Geometries without a finite bounding box never enter the grid, yet
    /// two of them can still satisfy a relation (two empty geometries are
    /// `equals`). Pair them up directly, in caller orientation.
    fn join_unboxed(
        &self,
        source: &GeometryMap,
        target: &GeometryMap,
        relation: &Relation,
        mapping: &mut Mapping,
        stats: &mut JoinStats,
    ) -> Result<()> {
        let source_unboxed = unboxed(source);
        let target_unboxed = unboxed(target);
        if source_unboxed.is_empty() || target_unboxed.is_empty() {
            return Ok(());
        }
        if self.config.is_cancelled() {
            return Err(JoinError::Cancelled);
        }

        log::debug!(
            "evaluating {} x {} geometries without bounding box",
            source_unboxed.len(),
            target_unboxed.len()
        );
        for &(s, sg) in &source_unboxed {
            let a = IndexEntry::detached(s, sg);
            for &(t, tg) in &target_unboxed {
                stats.candidate_pairs += 1;
                stats.evaluations += 1;
                if relate(&self.predicate, &a, &IndexEntry::detached(t, tg), relation, false)? {
                    mapping.add(s, t, LINK_CONFIDENCE);
                }
            }
        }
        Ok(())
    }

    fn full_scan(
        &self,
        source: &GeometryMap,
        target: &GeometryMap,
        relation: Relation,
        stats: &mut JoinStats,
    ) -> Result<Mapping> {
        stats.full_scan = true;
        let evaluated = self.evaluate(&relation, false, |visit| {
            let mut enumeration = EnumerationStats::default();
            for (s, sg) in source {
                for (t, tg) in target {
                    enumeration.distinct_pairs += 1;
                    enumeration.admitted += 1;
                    visit(IndexEntry::detached(s, sg), IndexEntry::detached(t, tg))?;
                }
            }
            Ok(enumeration)
        })?;

        stats.computed_relation = Some(relation);
        Ok(record(evaluated, stats))
    }

    /// Run the exact predicate over every pair `produce` emits, inline for a
    /// single worker, otherwise on an evaluation pool feeding one merge
    /// worker.
    fn evaluate<'a, F>(&self, relation: &Relation, swapped: bool, produce: F) -> Result<Evaluated>
    where
        F: FnOnce(&mut Visit<'_, 'a>) -> Result<EnumerationStats>,
    {
        if self.config.worker_count() <= 1 {
            self.evaluate_inline(relation, swapped, produce)
        } else {
            self.evaluate_parallel(relation, swapped, produce)
        }
    }

    fn evaluate_inline<'a, F>(&self, relation: &Relation, swapped: bool, produce: F) -> Result<Evaluated>
    where
        F: FnOnce(&mut Visit<'_, 'a>) -> Result<EnumerationStats>,
    {
        let batch_size = self.config.batch_size;
        let mut mapping = Mapping::new();
        let mut pending = 0usize;

        let enumeration = produce(&mut |a: IndexEntry<'a>, b: IndexEntry<'a>| -> Result<()> {
            pending += 1;
            if pending == batch_size {
                pending = 0;
                if self.config.is_cancelled() {
                    return Err(JoinError::Cancelled);
                }
            }
            if relate(&self.predicate, &a, &b, relation, swapped)? {
                if swapped {
                    mapping.add(b.id, a.id, LINK_CONFIDENCE);
                } else {
                    mapping.add(a.id, b.id, LINK_CONFIDENCE);
                }
            }
            Ok(())
        })?;

        Ok(Evaluated {
            mapping,
            enumeration,
            batches: 0,
            fragments: 0,
        })
    }

    fn evaluate_parallel<'a, F>(&self, relation: &Relation, swapped: bool, produce: F) -> Result<Evaluated>
    where
        F: FnOnce(&mut Visit<'_, 'a>) -> Result<EnumerationStats>,
    {
        let workers = self.config.worker_count();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("topolink-eval-{}", i))
            .build()?;

        let failure_slot: Mutex<Option<JoinError>> = Mutex::new(None);
        let halted_flag = AtomicBool::new(false);
        let failure = &failure_slot;
        let halted = &halted_flag;
        let predicate = &self.predicate;
        let config = &self.config;

        let (tx, rx) = crossbeam_channel::unbounded::<ResultFragment<'a>>();

        std::thread::scope(|scope| -> Result<Evaluated> {
            let merger = std::thread::Builder::new()
                .name("topolink-merge".to_string())
                .spawn_scoped(scope, move || merge_fragments(rx, swapped))?;

            let mut batches = 0usize;
            let produced = pool.in_place_scope(|s| {
                let dispatch = |unit: EvaluationUnit<'a>| {
                    let tx = tx.clone();
                    s.spawn(move |_| {
                        if halted.load(Ordering::Acquire) || config.is_cancelled() {
                            return;
                        }
                        match unit.evaluate(predicate) {
                            Ok(fragment) => {
                                // the merge worker outlives every sender
                                let _ = tx.send(fragment);
                            }
                            Err(e) => {
                                halted.store(true, Ordering::Release);
                                failure.lock().get_or_insert(e);
                            }
                        }
                    });
                };

                let mut unit = EvaluationUnit::new(relation.clone(), swapped, config.batch_size);
                let enumeration = produce(&mut |a: IndexEntry<'a>, b: IndexEntry<'a>| -> Result<()> {
                    unit.schedule(a, b);
                    if unit.is_full() {
                        if halted.load(Ordering::Acquire) {
                            return Err(JoinError::Cancelled);
                        }
                        if config.is_cancelled() {
                            halted.store(true, Ordering::Release);
                            return Err(JoinError::Cancelled);
                        }
                        dispatch(unit.take());
                        batches += 1;
                    }
                    Ok(())
                });
                if enumeration.is_ok() && !unit.is_empty() {
                    dispatch(unit.take());
                    batches += 1;
                }
                enumeration
            });
            drop(tx);

            let (mapping, fragments) = merger
                .join()
                .map_err(|_| JoinError::ThreadPool("merge worker panicked".to_string()))?;

            // a worker failure outranks the cancellation it caused
            if let Some(e) = failure.lock().take() {
                return Err(e);
            }
            let enumeration = produced?;
            if config.is_cancelled() {
                return Err(JoinError::Cancelled);
            }

            Ok(Evaluated {
                mapping,
                enumeration,
                batches,
                fragments,
            })
        })
    }
}

fn entries_of(collection: &GeometryMap) -> impl Iterator<Item = (&str, &Geometry)> {
    collection.iter().map(|(id, geometry)| (id.as_str(), geometry))
}

fn unboxed(collection: &GeometryMap) -> Vec<(&str, &Geometry)> {
    collection
        .iter()
        .filter(|(_, geometry)| finite_bbox(geometry).is_none())
        .map(|(id, geometry)| (id.as_str(), geometry))
        .collect()
}

fn record(evaluated: Evaluated, stats: &mut JoinStats) -> Mapping {
    stats.candidate_pairs = evaluated.enumeration.distinct_pairs;
    stats.evaluations = evaluated.enumeration.admitted;
    stats.batches = evaluated.batches;
    stats.fragments_merged = evaluated.fragments;
    evaluated.mapping
}

/// Every (source, target) pair of the cross product missing from
/// `intersecting`.
pub fn complement(source: &GeometryMap, target: &GeometryMap, intersecting: &Mapping) -> Mapping {
    let mut disjoint = Mapping::new();
    for s in source.keys() {
        for t in target.keys() {
            if !intersecting.contains(s, t) {
                disjoint.add(s, t, LINK_CONFIDENCE);
            }
        }
    }
    disjoint
}

/// Join with the default configuration.
pub fn get_mapping(source: &GeometryMap, target: &GeometryMap, relation: &str) -> Result<Mapping> {
    SpatialJoin::new(JoinConfig::default()).join(source, target, relation)
}
