use serde::{Deserialize, Serialize};

use crate::model::node::char_len;
use crate::model::operation::Operation;
use crate::model::path::Path;

/// How a position behaves when an edit lands exactly on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affinity {
    /// Stay put when text is inserted at the position.
    Backward,
    /// Move with text inserted at the position.
    Forward,
}

/// Affinity for a range: in addition to moving both ends the same way, a
/// range can grow to include edits at its boundary or shrink to exclude
/// them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeAffinity {
    Backward,
    Forward,
    /// Boundary edits are absorbed into the range.
    Outward,
    /// Boundary edits are pushed outside the range.
    Inward,
}

/// A position inside a text leaf: the leaf's path plus a code point offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Point {
            path: path.into(),
            offset,
        }
    }

    /// Document order: by path, then by offset within the same leaf.
    pub fn cmp_order(&self, other: &Point) -> std::cmp::Ordering {
        self.path
            .cmp(&other.path)
            .then(self.offset.cmp(&other.offset))
    }

    /// Transform this point through an operation.
    ///
    /// Ties at an insertion offset are resolved by affinity: forward
    /// advances past the inserted text, backward stays before it. Removal
    /// spanning `[a, b)` collapses interior offsets to `a` and shifts
    /// offsets at or past `b` back by the removed length. Returns `None`
    /// when the operation removed the leaf or a strict ancestor of it.
    pub fn transform(&self, op: &Operation, affinity: Affinity) -> Option<Point> {
        let mut next = self.clone();

        match op {
            Operation::InsertText { path, offset, text } => {
                if *path == next.path
                    && (*offset < next.offset
                        || (*offset == next.offset && affinity == Affinity::Forward))
                {
                    next.offset += char_len(text);
                }
            }
            Operation::RemoveText { path, offset, text } => {
                if *path == next.path && *offset < next.offset {
                    let removed = char_len(text);
                    next.offset -= removed.min(next.offset - offset);
                }
            }
            Operation::SplitNode { path, position } => {
                if *path == next.path {
                    if *position < next.offset
                        || (*position == next.offset && affinity == Affinity::Forward)
                    {
                        next.offset -= position;
                        next.path = next.path.transform_with(op, Affinity::Forward)?;
                    }
                    // Otherwise the point stays in the left half untouched.
                } else {
                    next.path = next.path.transform_with(op, affinity)?;
                }
            }
            Operation::MergeNode { path, position } => {
                if *path == next.path {
                    next.offset += position;
                }
                next.path = next.path.transform_with(op, affinity)?;
            }
            Operation::InsertNode { .. } | Operation::RemoveNode { .. } => {
                next.path = next.path.transform_with(op, affinity)?;
            }
            Operation::SetSelection { .. } => {}
        }

        Some(next)
    }
}

/// A directional span between two points. `anchor` is where the selection
/// started, `focus` where it ends; focus may precede anchor in document
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Range { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Range {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_backward(&self) -> bool {
        self.anchor.cmp_order(&self.focus) == std::cmp::Ordering::Greater
    }

    /// First endpoint in document order.
    pub fn start(&self) -> &Point {
        if self.is_backward() {
            &self.focus
        } else {
            &self.anchor
        }
    }

    /// Last endpoint in document order.
    pub fn end(&self) -> &Point {
        if self.is_backward() {
            &self.anchor
        } else {
            &self.focus
        }
    }

    /// Transform both endpoints through an operation.
    ///
    /// Outward affinity maps to backward on the leading edge and forward on
    /// the trailing edge so boundary edits fall inside the range; inward is
    /// the reverse. Direction is preserved. Returns `None` when either
    /// endpoint was invalidated.
    pub fn transform(&self, op: &Operation, affinity: RangeAffinity) -> Option<Range> {
        let (anchor_affinity, focus_affinity) = match affinity {
            RangeAffinity::Backward => (Affinity::Backward, Affinity::Backward),
            RangeAffinity::Forward => (Affinity::Forward, Affinity::Forward),
            RangeAffinity::Outward => {
                if self.is_backward() {
                    (Affinity::Forward, Affinity::Backward)
                } else {
                    (Affinity::Backward, Affinity::Forward)
                }
            }
            RangeAffinity::Inward => {
                if self.is_backward() {
                    (Affinity::Backward, Affinity::Forward)
                } else {
                    (Affinity::Forward, Affinity::Backward)
                }
            }
        };

        let anchor = self.anchor.transform(op, anchor_affinity)?;
        let focus = self.focus.transform(op, focus_affinity)?;
        Some(Range { anchor, focus })
    }
}
