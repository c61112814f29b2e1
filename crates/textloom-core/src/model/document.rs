use anyhow::bail;

use crate::error::{ReconcileError, Result};
use crate::model::node::{Key, Node, byte_index, char_len};
use crate::model::operation::Operation;
use crate::model::patch::Patch;
use crate::model::path::Path;
use crate::model::point::{Affinity, Point, Range, RangeAffinity};
use crate::refs::{PointRef, RangeRef, RefRegistry};

/// The document model: an immutable-by-convention, path-addressed tree of
/// element and text nodes, plus the mutable state that has to track it.
///
/// All edits flow through [`Document::apply`], which runs the full edit
/// pipeline for one operation:
///
/// 1. apply the operation to the tree (authoritative update)
/// 2. transform every live ref through the operation
/// 3. transform the selection through the operation
/// 4. increment the version for change detection
///
/// Because refs and selection are transformed before the next operation is
/// accepted, every stored position is always expressed against the current
/// tree shape.
pub struct Document {
    /// Root element; its direct children are the blocks.
    root: Node,
    /// Current selection, `None` when the surface is not focused.
    selection: Option<Range>,
    /// Version counter incremented on each applied operation.
    version: u64,
    /// Live point/range refs owned by this document.
    refs: RefRegistry,
}

impl Document {
    /// Create a document around an existing root element.
    pub fn new(root: Node) -> anyhow::Result<Self> {
        if root.is_text() {
            bail!("document root must be an element");
        }
        Ok(Self {
            root,
            selection: None,
            version: 0,
            refs: RefRegistry::default(),
        })
    }

    /// Convenience constructor: one block per string.
    pub fn from_blocks<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let children = blocks.into_iter().map(|t| Node::block(t.into())).collect();
        Self {
            root: Node::element(children),
            selection: None,
            version: 0,
            refs: RefRegistry::default(),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Text of every block, in order. Test and diagnostic helper.
    pub fn block_texts(&self) -> Vec<String> {
        self.root
            .children()
            .iter()
            .map(|block| {
                block
                    .children()
                    .iter()
                    .filter_map(|leaf| leaf.leaf_text())
                    .collect::<String>()
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Lookups (the resolution interface consumed by the reconciler)
    // ------------------------------------------------------------------

    pub fn node_at(&self, path: &Path) -> Option<&Node> {
        let mut node = &self.root;
        for &index in path.indexes() {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    fn node_at_mut(&mut self, path: &Path) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for &index in path.indexes() {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    /// Text of the leaf at `path`, `None` if the path does not address a
    /// text leaf in the current tree shape.
    pub fn text_at(&self, path: &Path) -> Option<&str> {
        self.node_at(path).and_then(|n| n.leaf_text())
    }

    /// Resolve a stable key to the path of its node.
    pub fn path_of_key(&self, key: Key) -> Option<Path> {
        fn walk(node: &Node, key: Key, path: &mut Vec<usize>) -> bool {
            if node.key() == key {
                return true;
            }
            for (index, child) in node.children().iter().enumerate() {
                path.push(index);
                if walk(child, key, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut indexes = Vec::new();
        if walk(&self.root, key, &mut indexes) {
            Some(Path::new(indexes))
        } else {
            None
        }
    }

    /// Resolve a stable key to its node.
    pub fn node_by_key(&self, key: Key) -> Option<&Node> {
        let path = self.path_of_key(key)?;
        self.node_at(&path)
    }

    /// Nearest enclosing block of the node at `path`: the deepest
    /// non-root element on the path, the node itself included.
    pub fn closest_block_path(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        loop {
            if current.is_empty() {
                return None;
            }
            match self.node_at(&current) {
                Some(Node::Element { .. }) => return Some(current),
                _ => current = current.parent()?,
            }
        }
    }

    /// Nearest enclosing block of the node carrying `key`.
    pub fn closest_block(&self, key: Key) -> Option<(Path, &Node)> {
        let path = self.path_of_key(key)?;
        let block_path = self.closest_block_path(&path)?;
        let node = self.node_at(&block_path)?;
        Some((block_path, node))
    }

    /// Resolve a range against the current tree shape: both endpoints must
    /// address text leaves; offsets are clamped to the leaf length.
    pub fn resolve_range(&self, range: &Range) -> Option<Range> {
        let anchor = self.resolve_point(&range.anchor)?;
        let focus = self.resolve_point(&range.focus)?;
        Some(Range::new(anchor, focus))
    }

    fn resolve_point(&self, point: &Point) -> Option<Point> {
        let len = self.node_at(&point.path)?.leaf_len()?;
        Some(Point::new(point.path.clone(), point.offset.min(len)))
    }

    /// Range spanning the entire node at `path`, from the start of its
    /// first leaf to the end of its last.
    pub fn range_of_node(&self, path: &Path) -> Option<Range> {
        let node = self.node_at(path)?;

        let mut first = path.clone();
        let mut cursor = node;
        while !cursor.is_text() {
            cursor = cursor.children().first()?;
            first = first.child(0);
        }

        let mut last = path.clone();
        let mut cursor = node;
        while !cursor.is_text() {
            let index = cursor.children().len().checked_sub(1)?;
            cursor = cursor.children().last()?;
            last = last.child(index);
        }

        let end_len = cursor.leaf_len()?;
        Some(Range::new(Point::new(first, 0), Point::new(last, end_len)))
    }

    // ------------------------------------------------------------------
    // Refs
    // ------------------------------------------------------------------

    pub fn create_point_ref(&mut self, point: Point, affinity: Affinity) -> PointRef {
        self.refs.create_point_ref(point, affinity)
    }

    pub fn create_range_ref(&mut self, range: Range, affinity: RangeAffinity) -> RangeRef {
        self.refs.create_range_ref(range, affinity)
    }

    pub fn point_ref(&self, r: PointRef) -> Option<&Point> {
        self.refs.point_ref_current(r)
    }

    pub fn range_ref(&self, r: RangeRef) -> Option<&Range> {
        self.refs.range_ref_current(r)
    }

    pub fn dispose_point_ref(&mut self, r: PointRef) -> Option<Point> {
        self.refs.dispose_point_ref(r)
    }

    pub fn dispose_range_ref(&mut self, r: RangeRef) -> Option<Range> {
        self.refs.dispose_range_ref(r)
    }

    // ------------------------------------------------------------------
    // Edit pipeline
    // ------------------------------------------------------------------

    /// Apply one operation: tree first, then refs, then selection, then
    /// version bump. Fails with `UnresolvableReference` when the operation
    /// addresses a path that no longer exists.
    pub fn apply(&mut self, op: Operation) -> Result<Patch> {
        let changed = self.apply_to_tree(&op)?;

        self.refs.transform_all(&op);

        self.selection = match &op {
            Operation::SetSelection { selection } => selection.clone(),
            _ => self
                .selection
                .as_ref()
                .and_then(|s| s.transform(&op, RangeAffinity::Forward)),
        };

        self.version += 1;

        Ok(Patch {
            changed,
            new_selection: self.selection.clone(),
            version: self.version,
        })
    }

    fn apply_to_tree(&mut self, op: &Operation) -> Result<Vec<Path>> {
        match op {
            Operation::InsertText { path, offset, text } => {
                let node = self
                    .node_at_mut(path)
                    .ok_or_else(|| unresolvable(path))?;
                match node {
                    Node::Text { text: leaf, .. } => {
                        // Offsets past the end are clamped, not failed: the
                        // leaf may have shrunk between diff and apply.
                        let at = byte_index(leaf, *offset);
                        leaf.insert_str(at, text);
                        Ok(vec![path.clone()])
                    }
                    Node::Element { .. } => Err(unresolvable(path)),
                }
            }
            Operation::RemoveText { path, offset, text } => {
                let removed_len = char_len(text);
                let node = self
                    .node_at_mut(path)
                    .ok_or_else(|| unresolvable(path))?;
                match node {
                    Node::Text { text: leaf, .. } => {
                        let start = byte_index(leaf, *offset);
                        let end = byte_index(leaf, offset + removed_len);
                        leaf.replace_range(start..end, "");
                        Ok(vec![path.clone()])
                    }
                    Node::Element { .. } => Err(unresolvable(path)),
                }
            }
            Operation::InsertNode { path, node } => {
                let (parent_path, index) = split_last(path)?;
                let children = self.children_at_mut(&parent_path)?;
                if index > children.len() {
                    return Err(unresolvable(path));
                }
                children.insert(index, node.clone());
                Ok(vec![path.clone()])
            }
            Operation::RemoveNode { path } => {
                let (parent_path, index) = split_last(path)?;
                let children = self.children_at_mut(&parent_path)?;
                if index >= children.len() {
                    return Err(unresolvable(path));
                }
                children.remove(index);
                Ok(vec![parent_path])
            }
            Operation::SplitNode { path, position } => {
                let (parent_path, index) = split_last(path)?;
                let children = self.children_at_mut(&parent_path)?;
                let child = children.get_mut(index).ok_or_else(|| unresolvable(path))?;
                let tail = match child {
                    Node::Text { text, .. } => {
                        let at = byte_index(text, *position);
                        Node::text(text.split_off(at))
                    }
                    Node::Element { children, .. } => {
                        let at = (*position).min(children.len());
                        Node::element(children.split_off(at))
                    }
                };
                children.insert(index + 1, tail);
                Ok(vec![path.clone(), parent_path.child(index + 1)])
            }
            Operation::MergeNode { path, .. } => {
                let (parent_path, index) = split_last(path)?;
                if index == 0 {
                    return Err(unresolvable(path));
                }
                let children = self.children_at_mut(&parent_path)?;
                if index >= children.len() {
                    return Err(unresolvable(path));
                }
                let merged = children.remove(index);
                let target = &mut children[index - 1];
                match (target, merged) {
                    (Node::Text { text: left, .. }, Node::Text { text: right, .. }) => {
                        left.push_str(&right);
                    }
                    (
                        Node::Element { children: left, .. },
                        Node::Element {
                            children: right, ..
                        },
                    ) => {
                        left.extend(right);
                    }
                    // Element/text mismatch cannot be merged.
                    _ => return Err(unresolvable(path)),
                }
                Ok(vec![parent_path.child(index - 1)])
            }
            Operation::SetSelection { .. } => Ok(Vec::new()),
        }
    }

    fn children_at_mut(&mut self, path: &Path) -> Result<&mut Vec<Node>> {
        self.node_at_mut(path)
            .and_then(|n| n.children_mut())
            .ok_or_else(|| unresolvable(path))
    }

    // ------------------------------------------------------------------
    // Structural edit surface consumed by the reconciler
    // ------------------------------------------------------------------

    /// Fast-path text insertion at a known leaf and offset.
    pub fn insert_text_at(&mut self, path: &Path, offset: usize, text: &str) -> Result<Patch> {
        let leaf_len = self
            .node_at(path)
            .and_then(|n| n.leaf_len())
            .ok_or_else(|| unresolvable(path))?;
        self.apply(Operation::InsertText {
            path: path.clone(),
            offset: offset.min(leaf_len),
            text: text.to_string(),
        })
    }

    /// Replace a range with text: delete it if expanded, then insert at
    /// the collapsed position.
    pub fn insert_text_at_range(&mut self, range: &Range, text: &str) -> Result<()> {
        let start = self.delete_at_range(range)?;
        self.insert_text_at(&start.path, start.offset, text)?;
        Ok(())
    }

    /// Delete `n` code points before the range, or the range itself when
    /// it is expanded.
    pub fn delete_backward_at_range(&mut self, range: &Range, n: usize) -> Result<()> {
        if !range.is_collapsed() {
            self.delete_at_range(range)?;
            return Ok(());
        }
        self.select(&range.clone())?;
        self.delete_backward(n)
    }

    /// Delete `n` code points before the cursor. At the start of a block
    /// this merges the block into its predecessor instead.
    pub fn delete_backward(&mut self, n: usize) -> Result<()> {
        let sel = self
            .selection
            .clone()
            .ok_or_else(|| ReconcileError::UnresolvableReference("no selection".into()))?;
        if !sel.is_collapsed() {
            self.delete_at_range(&sel)?;
            return Ok(());
        }

        let point = sel.anchor;
        if point.offset == 0 {
            return self.merge_block_backward(&point.path);
        }

        let take = n.min(point.offset);
        let text = self
            .text_at(&point.path)
            .ok_or_else(|| unresolvable(&point.path))?;
        let removed: String = text
            .chars()
            .skip(point.offset - take)
            .take(take)
            .collect();
        self.apply(Operation::RemoveText {
            path: point.path.clone(),
            offset: point.offset - take,
            text: removed,
        })?;
        Ok(())
    }

    /// Delete the current selection.
    pub fn delete_selection(&mut self) -> Result<Point> {
        let sel = self
            .selection
            .clone()
            .ok_or_else(|| ReconcileError::UnresolvableReference("no selection".into()))?;
        self.delete_at_range(&sel)
    }

    /// Delete everything inside a range and collapse to its start.
    ///
    /// When the range spans blocks, the trailing block is merged into the
    /// leading one afterwards, matching what a backspace over the same
    /// span would produce.
    pub fn delete_at_range(&mut self, range: &Range) -> Result<Point> {
        let range = self
            .resolve_range(range)
            .ok_or_else(|| ReconcileError::UnresolvableReference("range".into()))?;
        let start = range.start().clone();
        let end = range.end().clone();

        if start == end {
            return Ok(start);
        }

        if start.path == end.path {
            let text = self
                .text_at(&start.path)
                .ok_or_else(|| unresolvable(&start.path))?;
            let removed: String = text
                .chars()
                .skip(start.offset)
                .take(end.offset - start.offset)
                .collect();
            self.apply(Operation::RemoveText {
                path: start.path.clone(),
                offset: start.offset,
                text: removed,
            })?;
            return Ok(start);
        }

        // Multi-leaf span. Record stable identities up front, then edit
        // back to front so earlier paths stay valid throughout.
        let start_key = self
            .node_at(&start.path)
            .ok_or_else(|| unresolvable(&start.path))?
            .key();
        let end_key = self
            .node_at(&end.path)
            .ok_or_else(|| unresolvable(&end.path))?
            .key();
        let start_block = self
            .closest_block_path(&start.path)
            .ok_or_else(|| unresolvable(&start.path))?;
        let end_block = self
            .closest_block_path(&end.path)
            .ok_or_else(|| unresolvable(&end.path))?;
        let same_block = start_block == end_block;

        if !same_block && start_block.parent() != end_block.parent() {
            // Spans across nesting levels are not produced by surface
            // reconciliation; bail so the caller abandons and resyncs.
            return Err(ReconcileError::UnresolvableReference(
                "range spans non-sibling blocks".into(),
            ));
        }

        let start_leaf_index = start.path.last().ok_or_else(|| unresolvable(&start.path))?;
        let end_leaf_index = end.path.last().ok_or_else(|| unresolvable(&end.path))?;

        // Trim the head of the end leaf.
        let end_text = self
            .text_at(&end.path)
            .ok_or_else(|| unresolvable(&end.path))?;
        let removed: String = end_text.chars().take(end.offset).collect();
        if !removed.is_empty() {
            self.apply(Operation::RemoveText {
                path: end.path.clone(),
                offset: 0,
                text: removed,
            })?;
        }

        if same_block {
            // Remove leaves strictly between, back to front.
            for index in (start_leaf_index + 1..end_leaf_index).rev() {
                self.apply(Operation::RemoveNode {
                    path: start_block.child(index),
                })?;
            }
        } else {
            // Leaves before the end leaf inside the end block.
            for index in (0..end_leaf_index).rev() {
                self.apply(Operation::RemoveNode {
                    path: end_block.child(index),
                })?;
            }
            // Whole blocks strictly between.
            let start_block_index =
                start_block.last().ok_or_else(|| unresolvable(&start_block))?;
            let end_block_index = end_block.last().ok_or_else(|| unresolvable(&end_block))?;
            let parent = start_block.parent().unwrap_or_else(Path::root);
            for index in (start_block_index + 1..end_block_index).rev() {
                self.apply(Operation::RemoveNode {
                    path: parent.child(index),
                })?;
            }
            // Leaves after the start leaf inside the start block.
            let start_block_len = self
                .node_at(&start_block)
                .map(|n| n.children().len())
                .ok_or_else(|| unresolvable(&start_block))?;
            for index in (start_leaf_index + 1..start_block_len).rev() {
                self.apply(Operation::RemoveNode {
                    path: start_block.child(index),
                })?;
            }
        }

        // Trim the tail of the start leaf.
        let start_text = self
            .text_at(&start.path)
            .ok_or_else(|| unresolvable(&start.path))?;
        let removed: String = start_text.chars().skip(start.offset).collect();
        if !removed.is_empty() {
            self.apply(Operation::RemoveText {
                path: start.path.clone(),
                offset: start.offset,
                text: removed,
            })?;
        }

        if !same_block {
            // Merge the (now adjacent) trailing block into the leading one,
            // then the adjacent text leaves. Paths have shifted, so resolve
            // both blocks by key again.
            let end_block_path = self
                .path_of_key(end_key)
                .and_then(|p| self.closest_block_path(&p))
                .ok_or_else(|| ReconcileError::UnresolvableReference("end block".into()))?;
            let start_block_path = self
                .path_of_key(start_key)
                .and_then(|p| self.closest_block_path(&p))
                .ok_or_else(|| ReconcileError::UnresolvableReference("start block".into()))?;
            let start_block_len = self
                .node_at(&start_block_path)
                .map(|n| n.children().len())
                .ok_or_else(|| unresolvable(&start_block_path))?;

            self.apply(Operation::MergeNode {
                path: end_block_path,
                position: start_block_len,
            })?;

            let end_leaf_path = self
                .path_of_key(end_key)
                .ok_or_else(|| ReconcileError::UnresolvableReference("end leaf".into()))?;
            let end_leaf_index = end_leaf_path
                .last()
                .ok_or_else(|| unresolvable(&end_leaf_path))?;
            if end_leaf_index > 0 {
                let left_path = start_block_path.child(end_leaf_index - 1);
                let left_is_text = self.text_at(&left_path).is_some();
                let right_is_text = self.text_at(&end_leaf_path).is_some();
                if left_is_text && right_is_text {
                    let position = self
                        .node_at(&left_path)
                        .and_then(|n| n.leaf_len())
                        .ok_or_else(|| unresolvable(&left_path))?;
                    self.apply(Operation::MergeNode {
                        path: end_leaf_path,
                        position,
                    })?;
                }
            }
        }

        let final_path = self
            .path_of_key(start_key)
            .ok_or_else(|| ReconcileError::UnresolvableReference("start leaf".into()))?;
        let final_point = Point::new(final_path, start.offset);
        self.apply(Operation::SetSelection {
            selection: Some(Range::collapsed(final_point.clone())),
        })?;
        Ok(final_point)
    }

    /// Split the block containing the cursor at the cursor position. An
    /// expanded selection is deleted first.
    pub fn split_block(&mut self) -> Result<()> {
        let sel = self
            .selection
            .clone()
            .ok_or_else(|| ReconcileError::UnresolvableReference("no selection".into()))?;
        let point = if sel.is_collapsed() {
            sel.anchor
        } else {
            self.delete_at_range(&sel)?
        };

        let block_path = self
            .closest_block_path(&point.path)
            .ok_or_else(|| unresolvable(&point.path))?;
        if point.path.len() != block_path.len() + 1 {
            return Err(ReconcileError::UnresolvableReference(
                "cursor leaf is not a direct child of its block".into(),
            ));
        }
        let leaf_index = point.path.last().ok_or_else(|| unresolvable(&point.path))?;

        self.apply(Operation::SplitNode {
            path: point.path.clone(),
            position: point.offset,
        })?;
        self.apply(Operation::SplitNode {
            path: block_path,
            position: leaf_index + 1,
        })?;
        Ok(())
    }

    fn merge_block_backward(&mut self, leaf_path: &Path) -> Result<()> {
        let block_path = self
            .closest_block_path(leaf_path)
            .ok_or_else(|| unresolvable(leaf_path))?;
        let block_index = block_path.last().ok_or_else(|| unresolvable(&block_path))?;
        if block_index == 0 {
            // Nothing before the first block; backspace at the very start
            // of the document is a no-op.
            return Ok(());
        }

        let parent = block_path.parent().unwrap_or_else(Path::root);
        let prev_path = parent.child(block_index - 1);
        let prev_len = self
            .node_at(&prev_path)
            .map(|n| n.children().len())
            .ok_or_else(|| unresolvable(&prev_path))?;

        self.apply(Operation::MergeNode {
            path: block_path,
            position: prev_len,
        })?;

        // Join the text leaves that became adjacent, if both are text.
        if prev_len > 0 {
            let left = prev_path.child(prev_len - 1);
            let right = prev_path.child(prev_len);
            if self.text_at(&left).is_some() && self.text_at(&right).is_some() {
                let position = self
                    .node_at(&left)
                    .and_then(|n| n.leaf_len())
                    .ok_or_else(|| unresolvable(&left))?;
                self.apply(Operation::MergeNode {
                    path: right,
                    position,
                })?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    pub fn select(&mut self, range: &Range) -> Result<()> {
        let resolved = self
            .resolve_range(range)
            .ok_or_else(|| ReconcileError::UnresolvableReference("selection range".into()))?;
        self.apply(Operation::SetSelection {
            selection: Some(resolved),
        })?;
        Ok(())
    }

    pub fn deselect(&mut self) -> Result<()> {
        self.apply(Operation::SetSelection { selection: None })?;
        Ok(())
    }

    pub fn move_anchor_to(&mut self, path: &Path, offset: usize) -> Result<()> {
        let point = self
            .resolve_point(&Point::new(path.clone(), offset))
            .ok_or_else(|| unresolvable(path))?;
        let next = match self.selection.clone() {
            Some(sel) => Range::new(point, sel.focus),
            None => Range::collapsed(point),
        };
        self.apply(Operation::SetSelection {
            selection: Some(next),
        })?;
        Ok(())
    }

    pub fn move_focus_to(&mut self, path: &Path, offset: usize) -> Result<()> {
        let point = self
            .resolve_point(&Point::new(path.clone(), offset))
            .ok_or_else(|| unresolvable(path))?;
        let next = match self.selection.clone() {
            Some(sel) => Range::new(sel.anchor, point),
            None => Range::collapsed(point),
        };
        self.apply(Operation::SetSelection {
            selection: Some(next),
        })?;
        Ok(())
    }
}

fn unresolvable(path: &Path) -> ReconcileError {
    ReconcileError::UnresolvableReference(format!("{:?}", path.indexes()))
}

fn split_last(path: &Path) -> Result<(Path, usize)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(unresolvable(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(blocks: &[&str]) -> Document {
        Document::from_blocks(blocks.iter().copied())
    }

    fn leaf(block: usize) -> Path {
        Path::from([block, 0])
    }

    #[test]
    fn rejects_text_root() {
        assert!(Document::new(Node::text("nope")).is_err());
    }

    #[test]
    fn insert_text_fast_path() {
        let mut d = doc(&["helo"]);
        d.insert_text_at(&leaf(0), 3, "l").unwrap();
        assert_eq!(d.block_texts(), vec!["hello"]);
        assert_eq!(d.version(), 1);
    }

    #[test]
    fn insert_text_clamps_offset() {
        let mut d = doc(&["hi"]);
        d.insert_text_at(&leaf(0), 99, "!").unwrap();
        assert_eq!(d.block_texts(), vec!["hi!"]);
    }

    #[test]
    fn delete_backward_removes_before_cursor() {
        let mut d = doc(&["hello"]);
        d.select(&Range::collapsed(Point::new([0, 0], 5))).unwrap();
        d.delete_backward(2).unwrap();
        assert_eq!(d.block_texts(), vec!["hel"]);
        assert_eq!(d.selection().unwrap().anchor.offset, 3);
    }

    #[test]
    fn delete_backward_at_block_start_merges() {
        let mut d = doc(&["abc", "def"]);
        d.select(&Range::collapsed(Point::new([1, 0], 0))).unwrap();
        d.delete_backward(1).unwrap();
        assert_eq!(d.block_texts(), vec!["abcdef"]);
        // Cursor lands at the join point.
        assert_eq!(d.selection().unwrap().anchor, Point::new([0, 0], 3));
    }

    #[test]
    fn delete_backward_at_document_start_is_noop() {
        let mut d = doc(&["abc"]);
        d.select(&Range::collapsed(Point::new([0, 0], 0))).unwrap();
        d.delete_backward(1).unwrap();
        assert_eq!(d.block_texts(), vec!["abc"]);
    }

    #[test]
    fn delete_range_within_leaf() {
        let mut d = doc(&["hello world"]);
        let range = Range::new(Point::new([0, 0], 5), Point::new([0, 0], 11));
        let point = d.delete_at_range(&range).unwrap();
        assert_eq!(d.block_texts(), vec!["hello"]);
        assert_eq!(point.offset, 5);
    }

    #[test]
    fn delete_range_across_blocks_merges_remainder() {
        let mut d = doc(&["hello", "middle", "world"]);
        let range = Range::new(Point::new([0, 0], 3), Point::new([2, 0], 2));
        d.delete_at_range(&range).unwrap();
        assert_eq!(d.block_texts(), vec!["helrld"]);
        assert_eq!(
            d.selection().unwrap().anchor,
            Point::new([0, 0], 3)
        );
    }

    #[test]
    fn split_block_at_cursor() {
        let mut d = doc(&["hello"]);
        d.select(&Range::collapsed(Point::new([0, 0], 2))).unwrap();
        d.split_block().unwrap();
        assert_eq!(d.block_texts(), vec!["he", "llo"]);
        // Cursor moves to the start of the new block.
        assert_eq!(d.selection().unwrap().anchor, Point::new([1, 0], 0));
    }

    #[test]
    fn split_block_with_expanded_selection_deletes_first() {
        let mut d = doc(&["hello"]);
        d.select(&Range::new(Point::new([0, 0], 1), Point::new([0, 0], 4)))
            .unwrap();
        d.split_block().unwrap();
        assert_eq!(d.block_texts(), vec!["h", "o"]);
    }

    #[test]
    fn refs_follow_edits_through_document() {
        let mut d = doc(&["helo"]);
        let r = d.create_point_ref(Point::new([0, 0], 4), Affinity::Forward);
        d.insert_text_at(&leaf(0), 3, "l").unwrap();
        assert_eq!(d.point_ref(r).unwrap().offset, 5);

        // Removing the enclosing block invalidates the ref for good.
        d.apply(Operation::RemoveNode {
            path: Path::from([0]),
        })
        .unwrap();
        assert_eq!(d.point_ref(r), None);
    }

    #[test]
    fn selection_follows_split_and_merge() {
        let mut d = doc(&["abcd"]);
        d.select(&Range::collapsed(Point::new([0, 0], 3))).unwrap();
        d.split_block().unwrap();
        assert_eq!(d.selection().unwrap().anchor, Point::new([1, 0], 0));

        d.delete_backward(1).unwrap();
        assert_eq!(d.block_texts(), vec!["abcd"]);
        assert_eq!(d.selection().unwrap().anchor, Point::new([0, 0], 3));
    }

    #[test]
    fn unresolvable_path_is_an_error_not_a_panic() {
        let mut d = doc(&["x"]);
        let missing = Path::from([4, 0]);
        assert!(matches!(
            d.insert_text_at(&missing, 0, "y"),
            Err(ReconcileError::UnresolvableReference(_))
        ));
    }

    #[test]
    fn range_of_node_spans_block() {
        let d = doc(&["hello"]);
        let range = d.range_of_node(&Path::from([0])).unwrap();
        assert_eq!(range.anchor, Point::new([0, 0], 0));
        assert_eq!(range.focus, Point::new([0, 0], 5));
    }
}
