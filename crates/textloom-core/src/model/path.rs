use serde::{Deserialize, Serialize};

use crate::model::operation::Operation;
use crate::model::point::Affinity;

/// Address of a node as the sequence of child indexes walked from the root.
///
/// Paths compare lexicographically, which matches document order for nodes
/// at the same depth. A path is only valid against the tree shape it was
/// produced from: every applied operation can shift sibling indexes, so
/// holders that need durable positions use refs instead (see `refs`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indexes: Vec<usize>) -> Self {
        Path(indexes)
    }

    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn indexes(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a child index.
    pub fn child(&self, index: usize) -> Path {
        let mut indexes = self.0.clone();
        indexes.push(index);
        Path(indexes)
    }

    /// Strict ancestor test: a path is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True when `self` is a sibling of some ancestor-or-self of `other`
    /// and sits at an earlier index, i.e. removing or inserting at `self`
    /// shifts `other`.
    fn ends_before(&self, other: &Path) -> bool {
        let depth = self.0.len();
        depth >= 1
            && depth <= other.0.len()
            && self.0[..depth - 1] == other.0[..depth - 1]
            && self.0[depth - 1] < other.0[depth - 1]
    }

    /// Like `ends_before` but allowing an equal index at the pivot depth.
    fn ends_at_or_before(&self, other: &Path) -> bool {
        let depth = self.0.len();
        depth >= 1
            && depth <= other.0.len()
            && self.0[..depth - 1] == other.0[..depth - 1]
            && self.0[depth - 1] <= other.0[depth - 1]
    }

    /// Transform this path through an operation, with forward affinity for
    /// split ties. Returns `None` when the operation removed the addressed
    /// node or a strict ancestor of it.
    pub fn transform(&self, op: &Operation) -> Option<Path> {
        self.transform_with(op, Affinity::Forward)
    }

    /// Transform with an explicit affinity. Affinity only matters when a
    /// split lands exactly on this path: forward follows the new sibling,
    /// backward stays with the original node.
    pub fn transform_with(&self, op: &Operation, affinity: Affinity) -> Option<Path> {
        let mut next = self.0.clone();

        match op {
            Operation::InsertNode { path: at, .. } => {
                // Covers equal paths, earlier siblings, and ancestors: all
                // of them displace this path at the insertion depth.
                if at.ends_at_or_before(self) {
                    next[at.len() - 1] += 1;
                }
            }
            Operation::RemoveNode { path: at } => {
                if at == self || at.is_ancestor_of(self) {
                    return None;
                }
                if at.ends_before(self) {
                    next[at.len() - 1] -= 1;
                }
            }
            Operation::SplitNode { path: at, position } => {
                if at == self {
                    if affinity == Affinity::Forward {
                        next[at.len() - 1] += 1;
                    }
                } else if at.ends_before(self) {
                    next[at.len() - 1] += 1;
                } else if at.is_ancestor_of(self) && self.0[at.len()] >= *position {
                    next[at.len() - 1] += 1;
                    next[at.len()] -= position;
                }
            }
            Operation::MergeNode { path: at, position } => {
                if at == self || at.ends_before(self) {
                    next[at.len() - 1] -= 1;
                } else if at.is_ancestor_of(self) {
                    next[at.len() - 1] -= 1;
                    next[at.len()] += position;
                }
            }
            Operation::InsertText { .. }
            | Operation::RemoveText { .. }
            | Operation::SetSelection { .. } => {}
        }

        Some(Path(next))
    }
}

impl From<Vec<usize>> for Path {
    fn from(indexes: Vec<usize>) -> Self {
        Path(indexes)
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indexes: [usize; N]) -> Self {
        Path(indexes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::Node;

    fn p(indexes: &[usize]) -> Path {
        Path::new(indexes.to_vec())
    }

    #[test]
    fn compares_lexicographically() {
        assert!(p(&[0]) < p(&[1]));
        assert!(p(&[0]) < p(&[0, 0]));
        assert!(p(&[1, 2]) < p(&[1, 10]));
        assert!(p(&[2]) > p(&[1, 9]));
    }

    #[test]
    fn ancestor_is_strict() {
        assert!(p(&[0]).is_ancestor_of(&p(&[0, 1])));
        assert!(p(&[]).is_ancestor_of(&p(&[3])));
        assert!(!p(&[0, 1]).is_ancestor_of(&p(&[0, 1])));
        assert!(!p(&[1]).is_ancestor_of(&p(&[0, 1])));
    }

    #[test]
    fn insert_node_shifts_later_siblings() {
        let op = Operation::InsertNode {
            path: p(&[1]),
            node: Node::block(""),
        };
        assert_eq!(p(&[0]).transform(&op), Some(p(&[0])));
        assert_eq!(p(&[1]).transform(&op), Some(p(&[2])));
        assert_eq!(p(&[2, 0]).transform(&op), Some(p(&[3, 0])));
    }

    #[test]
    fn remove_node_invalidates_self_and_descendants() {
        let op = Operation::RemoveNode { path: p(&[1]) };
        assert_eq!(p(&[1]).transform(&op), None);
        assert_eq!(p(&[1, 0]).transform(&op), None);
        assert_eq!(p(&[0]).transform(&op), Some(p(&[0])));
        assert_eq!(p(&[2]).transform(&op), Some(p(&[1])));
    }

    #[test]
    fn split_node_moves_trailing_children() {
        let op = Operation::SplitNode {
            path: p(&[0]),
            position: 2,
        };
        // Children past the split position move under the new sibling.
        assert_eq!(p(&[0, 1]).transform(&op), Some(p(&[0, 1])));
        assert_eq!(p(&[0, 2]).transform(&op), Some(p(&[1, 0])));
        assert_eq!(p(&[0, 3]).transform(&op), Some(p(&[1, 1])));
        assert_eq!(p(&[1]).transform(&op), Some(p(&[2])));
    }

    #[test]
    fn split_tie_resolved_by_affinity() {
        let op = Operation::SplitNode {
            path: p(&[0, 0]),
            position: 3,
        };
        assert_eq!(
            p(&[0, 0]).transform_with(&op, Affinity::Forward),
            Some(p(&[0, 1]))
        );
        assert_eq!(
            p(&[0, 0]).transform_with(&op, Affinity::Backward),
            Some(p(&[0, 0]))
        );
    }

    #[test]
    fn merge_node_reroots_descendants() {
        let op = Operation::MergeNode {
            path: p(&[1]),
            position: 2,
        };
        assert_eq!(p(&[1]).transform(&op), Some(p(&[0])));
        assert_eq!(p(&[1, 0]).transform(&op), Some(p(&[0, 2])));
        assert_eq!(p(&[2]).transform(&op), Some(p(&[1])));
        assert_eq!(p(&[0]).transform(&op), Some(p(&[0])));
    }
}
