use serde::{Deserialize, Serialize};

use crate::model::node::Node;
use crate::model::path::Path;
use crate::model::point::Range;

/// The structural operation set applied to a document.
///
/// Every operation carries enough information to transform paths, points
/// and live refs through it without consulting the tree; `RemoveText`
/// carries the removed text (not just a length) for that reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
    },
    /// Split the node at `path` into two siblings; `position` is a code
    /// point offset for text leaves and a child index for elements. The
    /// trailing half becomes a new node at the next sibling index.
    SplitNode {
        path: Path,
        position: usize,
    },
    /// Merge the node at `path` into its previous sibling; `position` is
    /// the previous sibling's length (code points or child count), i.e.
    /// where the merged content begins afterwards.
    MergeNode {
        path: Path,
        position: usize,
    },
    SetSelection {
        selection: Option<Range>,
    },
}

impl Operation {
    /// Whether the operation changes tree shape or content, as opposed to
    /// only moving the selection.
    pub fn is_edit(&self) -> bool {
        !matches!(self, Operation::SetSelection { .. })
    }
}
