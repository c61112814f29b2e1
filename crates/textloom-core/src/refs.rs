use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::operation::Operation;
use crate::model::point::{Affinity, Point, Range, RangeAffinity};

/// Identity of a live ref within its owning registry.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct RefId(u64);

/// Handle to a live point reference.
///
/// The position itself lives in the document's registry so it can be
/// transformed on every applied operation; the handle only carries the id.
/// `current` resolves the live position, `None` once invalidated (an
/// operation removed the leaf or a strict ancestor of it). Invalidation is
/// permanent: the ref is never re-created, only disposed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PointRef {
    id: RefId,
}

impl PointRef {
    pub fn id(&self) -> RefId {
        self.id
    }
}

/// Handle to a live range reference. See [`PointRef`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RangeRef {
    id: RefId,
}

impl RangeRef {
    pub fn id(&self) -> RefId {
        self.id
    }
}

#[derive(Debug, Clone)]
struct PointEntry {
    current: Option<Point>,
    affinity: Affinity,
}

#[derive(Debug, Clone)]
struct RangeEntry {
    current: Option<Range>,
    affinity: RangeAffinity,
}

/// Per-document registry of live refs.
///
/// Owned by exactly one document; every operation the document applies is
/// pushed through `transform_all` before the next one is accepted, so a
/// ref's position is always expressed against the current tree shape.
#[derive(Debug, Clone, Default)]
pub struct RefRegistry {
    next_id: u64,
    points: HashMap<RefId, PointEntry>,
    ranges: HashMap<RefId, RangeEntry>,
}

impl RefRegistry {
    fn next_id(&mut self) -> RefId {
        let id = RefId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn create_point_ref(&mut self, point: Point, affinity: Affinity) -> PointRef {
        let id = self.next_id();
        self.points.insert(
            id,
            PointEntry {
                current: Some(point),
                affinity,
            },
        );
        PointRef { id }
    }

    pub fn create_range_ref(&mut self, range: Range, affinity: RangeAffinity) -> RangeRef {
        let id = self.next_id();
        self.ranges.insert(
            id,
            RangeEntry {
                current: Some(range),
                affinity,
            },
        );
        RangeRef { id }
    }

    pub fn point_ref_current(&self, r: PointRef) -> Option<&Point> {
        self.points.get(&r.id).and_then(|e| e.current.as_ref())
    }

    pub fn range_ref_current(&self, r: RangeRef) -> Option<&Range> {
        self.ranges.get(&r.id).and_then(|e| e.current.as_ref())
    }

    /// Unregister a point ref. The handle is consumed; the position is gone.
    pub fn dispose_point_ref(&mut self, r: PointRef) -> Option<Point> {
        self.points.remove(&r.id).and_then(|e| e.current)
    }

    /// Unregister a range ref. The handle is consumed; the position is gone.
    pub fn dispose_range_ref(&mut self, r: RangeRef) -> Option<Range> {
        self.ranges.remove(&r.id).and_then(|e| e.current)
    }

    pub fn live_count(&self) -> usize {
        self.points.values().filter(|e| e.current.is_some()).count()
            + self.ranges.values().filter(|e| e.current.is_some()).count()
    }

    /// Transform every live ref through one operation. Already-invalidated
    /// refs stay `None`.
    pub fn transform_all(&mut self, op: &Operation) {
        for entry in self.points.values_mut() {
            if let Some(point) = entry.current.take() {
                entry.current = point.transform(op, entry.affinity);
            }
        }
        for entry in self.ranges.values_mut() {
            if let Some(range) = entry.current.take() {
                entry.current = range.transform(op, entry.affinity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::path::Path;

    fn insert_op(offset: usize, text: &str) -> Operation {
        Operation::InsertText {
            path: Path::from([0, 0]),
            offset,
            text: text.to_string(),
        }
    }

    #[test]
    fn forward_ref_advances_on_insert_at_offset() {
        let mut registry = RefRegistry::default();
        let forward = registry.create_point_ref(Point::new([0, 0], 3), Affinity::Forward);
        let backward = registry.create_point_ref(Point::new([0, 0], 3), Affinity::Backward);
        let earlier = registry.create_point_ref(Point::new([0, 0], 1), Affinity::Forward);

        registry.transform_all(&insert_op(3, "ab"));

        assert_eq!(registry.point_ref_current(forward).unwrap().offset, 5);
        assert_eq!(registry.point_ref_current(backward).unwrap().offset, 3);
        assert_eq!(registry.point_ref_current(earlier).unwrap().offset, 1);
    }

    #[test]
    fn removal_collapses_interior_offsets() {
        let mut registry = RefRegistry::default();
        let inside = registry.create_point_ref(Point::new([0, 0], 4), Affinity::Forward);
        let after = registry.create_point_ref(Point::new([0, 0], 8), Affinity::Forward);

        registry.transform_all(&Operation::RemoveText {
            path: Path::from([0, 0]),
            offset: 2,
            text: "abcd".to_string(),
        });

        assert_eq!(registry.point_ref_current(inside).unwrap().offset, 2);
        assert_eq!(registry.point_ref_current(after).unwrap().offset, 4);
    }

    #[test]
    fn ancestor_removal_invalidates_permanently() {
        let mut registry = RefRegistry::default();
        let r = registry.create_point_ref(Point::new([1, 0], 2), Affinity::Forward);

        registry.transform_all(&Operation::RemoveNode {
            path: Path::from([1]),
        });
        assert_eq!(registry.point_ref_current(r), None);

        // Later operations never resurrect it.
        registry.transform_all(&insert_op(0, "x"));
        assert_eq!(registry.point_ref_current(r), None);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn outward_range_ref_expands_over_boundary_insert() {
        let mut registry = RefRegistry::default();
        let r = registry.create_range_ref(
            Range::new(Point::new([0, 0], 2), Point::new([0, 0], 4)),
            RangeAffinity::Outward,
        );

        registry.transform_all(&insert_op(4, "xy"));

        let range = registry.range_ref_current(r).unwrap();
        assert_eq!(range.anchor.offset, 2);
        assert_eq!(range.focus.offset, 6);
    }

    #[test]
    fn dispose_removes_from_registry() {
        let mut registry = RefRegistry::default();
        let r = registry.create_point_ref(Point::new([0, 0], 0), Affinity::Forward);
        assert_eq!(registry.live_count(), 1);

        let last = registry.dispose_point_ref(r);
        assert_eq!(last, Some(Point::new([0, 0], 0)));
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.point_ref_current(r), None);
    }
}
