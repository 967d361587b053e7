//! Grid index over geometry bounding boxes.
//!
//! Each geometry's bounding box is scaled by the join's cell size and
//! rasterized into the inclusive range of integer cells it touches. The entry
//! is then registered under every one of those cells, so two geometries whose
//! boxes intersect always share at least one cell.

use crate::compute::{CellSize, finite_bbox};
use crate::error::{JoinError, Result};
use geo::Geometry;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Integer grid coordinate: `row` along y, `col` along x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row: i64,
    pub col: i64,
}

impl CellKey {
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }
}

/// A geometry together with the cell footprint of its bounding box.
///
/// Equality compares footprints only: two entries are equal when they occupy
/// exactly the same cells, whatever their identifiers.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<'a> {
    pub id: &'a str,
    pub geometry: &'a Geometry,
    /// First and last row (y)
    pub lat1: i64,
    pub lat2: i64,
    /// First and last column (x)
    pub lon1: i64,
    pub lon2: i64,
}

impl<'a> IndexEntry<'a> {
    /// Rasterize `geometry` at the given cell size. `None` for geometries
    /// without a finite bounding box.
    pub fn new(id: &'a str, geometry: &'a Geometry, cell: &CellSize) -> Option<Self> {
        let rect = finite_bbox(geometry)?;
        // `as` saturates, so extreme coordinates clamp to the i64 range
        Some(Self {
            id,
            geometry,
            lat1: (rect.min().y * cell.theta_y).floor() as i64,
            lat2: (rect.max().y * cell.theta_y).ceil() as i64,
            lon1: (rect.min().x * cell.theta_x).floor() as i64,
            lon2: (rect.max().x * cell.theta_x).ceil() as i64,
        })
    }

    /// Entry outside any grid, for evaluation paths that bypass the index.
    pub fn detached(id: &'a str, geometry: &'a Geometry) -> Self {
        Self {
            id,
            geometry,
            lat1: 0,
            lat2: 0,
            lon1: 0,
            lon2: 0,
        }
    }

    /// Footprint of `other` lies inside this footprint.
    pub fn contains(&self, other: &IndexEntry<'_>) -> bool {
        self.lat1 <= other.lat1
            && self.lon1 <= other.lon1
            && self.lat2 >= other.lat2
            && self.lon2 >= other.lon2
    }

    pub fn covers_cell(&self, key: &CellKey) -> bool {
        (self.lat1..=self.lat2).contains(&key.row) && (self.lon1..=self.lon2).contains(&key.col)
    }

    /// Number of cells in the footprint, saturating.
    pub fn footprint(&self) -> u64 {
        let rows = (self.lat2 as i128 - self.lat1 as i128 + 1) as u128;
        let cols = (self.lon2 as i128 - self.lon1 as i128 + 1) as u128;
        u64::try_from(rows.saturating_mul(cols)).unwrap_or(u64::MAX)
    }
}

impl PartialEq for IndexEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.lat1 == other.lat1
            && self.lat2 == other.lat2
            && self.lon1 == other.lon1
            && self.lon2 == other.lon2
    }
}

impl Eq for IndexEntry<'_> {}

/// Position of an entry inside its [`GridIndex`].
pub type EntryId = u32;

/// Cell -> entries mapping for one collection.
///
/// Entries live once in an arena; cells hold arena positions in insertion
/// order. Read-only after [`GridIndex::build`].
#[derive(Debug, Default)]
pub struct GridIndex<'a> {
    entries: Vec<IndexEntry<'a>>,
    cells: FxHashMap<CellKey, SmallVec<[EntryId; 4]>>,
}

impl<'a> GridIndex<'a> {
    /// Index a collection at the given cell size.
    ///
    /// With a `reference` index, entries are only registered in cells the
    /// reference already populates; other cells can never produce a
    /// candidate pair. Geometries that end up in no cell are dropped.
    ///
    /// Fails with [`JoinError::IndexCapacity`] once the collection has more
    /// entries than an [`EntryId`] can address.
    pub fn build<I>(
        geometries: I,
        cell: &CellSize,
        reference: Option<&GridIndex<'_>>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Geometry)>,
    {
        Self::build_bounded(geometries, cell, reference, EntryId::MAX as usize)
    }

    fn build_bounded<I>(
        geometries: I,
        cell: &CellSize,
        reference: Option<&GridIndex<'_>>,
        capacity: usize,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a Geometry)>,
    {
        let mut index = GridIndex::default();

        for (id, geometry) in geometries {
            let Some(entry) = IndexEntry::new(id, geometry, cell) else {
                continue;
            };
            if index.entries.len() >= capacity {
                return Err(JoinError::IndexCapacity(capacity));
            }
            // below capacity, so within EntryId range
            let entry_id = index.entries.len() as EntryId;

            let registered = match reference {
                None => index.register_footprint(entry_id, &entry),
                Some(reference) => index.register_shared(entry_id, &entry, reference),
            };
            if registered {
                index.entries.push(entry);
            }
        }

        log::debug!(
            "indexed {} entries into {} cells{}",
            index.entries.len(),
            index.cells.len(),
            if reference.is_some() { " (pruned)" } else { "" }
        );
        Ok(index)
    }

    fn register_footprint(&mut self, entry_id: EntryId, entry: &IndexEntry<'_>) -> bool {
        for row in entry.lat1..=entry.lat2 {
            for col in entry.lon1..=entry.lon2 {
                self.cells
                    .entry(CellKey::new(row, col))
                    .or_default()
                    .push(entry_id);
            }
        }
        true
    }

    fn register_shared(
        &mut self,
        entry_id: EntryId,
        entry: &IndexEntry<'_>,
        reference: &GridIndex<'_>,
    ) -> bool {
        let mut registered = false;
        if entry.footprint() > reference.cell_count() as u64 {
            // cheaper to walk the populated reference cells than the footprint
            for key in reference.cells.keys().filter(|k| entry.covers_cell(k)) {
                self.cells.entry(*key).or_default().push(entry_id);
                registered = true;
            }
        } else {
            for row in entry.lat1..=entry.lat2 {
                for col in entry.lon1..=entry.lon2 {
                    let key = CellKey::new(row, col);
                    if reference.cells.contains_key(&key) {
                        self.cells.entry(key).or_default().push(entry_id);
                        registered = true;
                    }
                }
            }
        }
        registered
    }

    pub fn entry(&self, id: EntryId) -> &IndexEntry<'a> {
        &self.entries[id as usize]
    }

    pub fn entries(&self) -> &[IndexEntry<'a>] {
        &self.entries
    }

    /// Entries registered under `key`, if the cell is populated.
    pub fn cell(&self, key: &CellKey) -> Option<&[EntryId]> {
        self.cells.get(key).map(|ids| ids.as_slice())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&CellKey, &[EntryId])> {
        self.cells.iter().map(|(key, ids)| (key, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Point, Rect, coord};

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
        Geometry::Rect(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }))
    }

    fn unit_cells() -> CellSize {
        CellSize {
            theta_x: 1.0,
            theta_y: 1.0,
            swap: false,
        }
    }

    #[test]
    fn test_entry_footprint() {
        let g = rect(0.5, 1.0, 2.5, 1.5);
        let entry = IndexEntry::new("a", &g, &unit_cells()).unwrap();
        assert_eq!((entry.lat1, entry.lat2), (1, 2));
        assert_eq!((entry.lon1, entry.lon2), (0, 3));
        assert_eq!(entry.footprint(), 8);
    }

    #[test]
    fn test_entry_scaling() {
        let g = rect(0.0, 0.0, 10.0, 10.0);
        let cell = CellSize {
            theta_x: 0.1,
            theta_y: 0.5,
            swap: false,
        };
        let entry = IndexEntry::new("a", &g, &cell).unwrap();
        assert_eq!((entry.lon1, entry.lon2), (0, 1));
        assert_eq!((entry.lat1, entry.lat2), (0, 5));
    }

    #[test]
    fn test_entry_equality_ignores_identity() {
        let g1 = rect(0.1, 0.1, 0.9, 0.9);
        let g2 = rect(0.2, 0.3, 0.8, 0.7);
        let a = IndexEntry::new("a", &g1, &unit_cells()).unwrap();
        let b = IndexEntry::new("b", &g2, &unit_cells()).unwrap();
        assert_eq!(a, b);
        assert!(a.contains(&b) && b.contains(&a));
    }

    #[test]
    fn test_entry_relations() {
        let big = rect(0.0, 0.0, 10.0, 10.0);
        let small = rect(2.0, 2.0, 3.0, 3.0);
        let far = rect(20.0, 20.0, 21.0, 21.0);
        let big = IndexEntry::new("big", &big, &unit_cells()).unwrap();
        let small = IndexEntry::new("small", &small, &unit_cells()).unwrap();
        let far = IndexEntry::new("far", &far, &unit_cells()).unwrap();

        assert!(big.contains(&small));
        assert!(!small.contains(&big));
        assert!(!big.contains(&far) && !far.contains(&big));
    }

    #[test]
    fn test_build_replicates_entries() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let input = [("a", &a)];
        let index = GridIndex::build(input, &unit_cells(), None).unwrap();

        assert_eq!(index.len(), 1);
        // [0..1] x [0..1] inclusive
        assert_eq!(index.cell_count(), 4);
        for row in 0..=1 {
            for col in 0..=1 {
                assert_eq!(index.cell(&CellKey::new(row, col)), Some(&[0][..]));
            }
        }
        assert!(index.cell(&CellKey::new(2, 2)).is_none());
    }

    #[test]
    fn test_build_with_reference_prunes_cells() {
        let s = rect(0.0, 0.0, 1.0, 1.0);
        let t_overlap = rect(1.0, 1.0, 3.0, 3.0);
        let t_far = rect(10.0, 10.0, 11.0, 11.0);

        let source = GridIndex::build([("s", &s)], &unit_cells(), None).unwrap();
        let target = GridIndex::build(
            [("t1", &t_overlap), ("t2", &t_far)],
            &unit_cells(),
            Some(&source),
        )
        .unwrap();

        assert_eq!(target.len(), 1);
        assert_eq!(target.entries()[0].id, "t1");
        assert_eq!(target.cell_count(), 1);
        assert_eq!(target.cell(&CellKey::new(1, 1)), Some(&[0][..]));
    }

    #[test]
    fn test_large_footprint_walks_reference_cells() {
        let s1 = Geometry::Point(Point::new(5.0, 5.0));
        let s2 = Geometry::Point(Point::new(500.0, 500.0));
        let huge = rect(0.0, 0.0, 1000.0, 1000.0);

        let source = GridIndex::build([("s1", &s1), ("s2", &s2)], &unit_cells(), None).unwrap();
        let target =
            GridIndex::build([("huge", &huge)], &unit_cells(), Some(&source)).unwrap();

        assert_eq!(target.cell_count(), source.cell_count());
        for (key, _) in source.cells() {
            assert_eq!(target.cell(key), Some(&[0][..]));
        }
    }

    #[test]
    fn test_skips_geometries_without_bbox() {
        let empty = Geometry::GeometryCollection(geo::GeometryCollection(vec![]));
        let nan = Geometry::Point(Point::new(f64::NAN, 1.0));
        let index =
            GridIndex::build([("e", &empty), ("n", &nan)], &unit_cells(), None).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.cell_count(), 0);
    }

    #[test]
    fn test_build_fails_past_capacity() {
        let a = rect(0.0, 0.0, 1.0, 1.0);
        let b = rect(2.0, 2.0, 3.0, 3.0);
        let c = rect(4.0, 4.0, 5.0, 5.0);
        let empty = Geometry::GeometryCollection(geo::GeometryCollection(vec![]));

        let full = GridIndex::build_bounded(
            [("a", &a), ("e", &empty), ("b", &b)],
            &unit_cells(),
            None,
            2,
        )
        .unwrap();
        assert_eq!(full.len(), 2);

        let result = GridIndex::build_bounded(
            [("a", &a), ("b", &b), ("c", &c)],
            &unit_cells(),
            None,
            2,
        );
        assert!(matches!(result, Err(JoinError::IndexCapacity(2))));
    }
}
