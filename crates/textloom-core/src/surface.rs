use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::document::Document;
use crate::model::node::{Key, Node, char_len};
use crate::mutation::{MutationKind, MutationRecord};

/// Identity of a node on the surface. Surface node ids are only meaningful
/// to the surface that issued them; the model never sees them directly.
pub type SurfaceNodeId = u64;

/// Zero-width placeholder rendered into empty leaves so the native caret
/// has somewhere to sit. Stripped back out before any text comparison.
pub const ZERO_WIDTH: char = '\u{FEFF}';

/// Shape of a node added to or removed from the surface, as reported in a
/// mutation record. Elements carry the model key they mirror (if any);
/// text nodes carry their content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceNodeDesc {
    Element { key: Option<Key> },
    Text { content: String },
}

impl SurfaceNodeDesc {
    pub fn is_element(&self) -> bool {
        matches!(self, SurfaceNodeDesc::Element { .. })
    }
}

/// Native selection offsets as the surface reports them: raw code point
/// offsets into the raw (placeholder-bearing) node text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSelection {
    pub anchor_node: SurfaceNodeId,
    pub anchor_offset: usize,
    pub focus_node: SurfaceNodeId,
    pub focus_offset: usize,
}

impl NativeSelection {
    pub fn collapsed(node: SurfaceNodeId, offset: usize) -> Self {
        NativeSelection {
            anchor_node: node,
            anchor_offset: offset,
            focus_node: node,
            focus_offset: offset,
        }
    }
}

/// The editable surface as the reconciler sees it.
///
/// Everything the reconciler needs from the host's render layer: text
/// readback for diffing, identity resolution back to model keys, the
/// native selection, and the ability to force focus and to rebuild the
/// surface wholesale from the model (the recovery path for every failed
/// edit, and the final step of every structural one).
pub trait Surface {
    /// Raw text content of a node, placeholders included.
    fn node_text(&self, id: SurfaceNodeId) -> Option<String>;

    /// The model key of the node, or of its nearest keyed ancestor.
    fn closest_key(&self, id: SurfaceNodeId) -> Option<Key>;

    fn native_selection(&self) -> Option<NativeSelection>;

    fn focus(&mut self);

    /// Rebuild the surface from the model. The model is authoritative;
    /// whatever the surface held before is discarded.
    fn resync(&mut self, doc: &Document);
}

/// Strip zero-width placeholders out of surface text, adjusting a code
/// point offset to match. When the text came from the last leaf of a
/// block, a single trailing newline (added by renderers to keep trailing
/// line breaks visible) is stripped too. The offset is clamped to the
/// cleaned length.
pub fn fix_text_and_offset(text: &str, offset: usize, is_last_leaf: bool) -> (String, usize) {
    let mut fixed = String::with_capacity(text.len());
    let mut fixed_offset = offset;
    for (i, c) in text.chars().enumerate() {
        if c == ZERO_WIDTH {
            if i < offset {
                fixed_offset -= 1;
            }
        } else {
            fixed.push(c);
        }
    }

    if is_last_leaf && fixed.ends_with('\n') {
        fixed.pop();
    }

    let max = char_len(&fixed);
    (fixed, fixed_offset.min(max))
}

#[derive(Debug, Clone)]
enum SurfaceNodeKind {
    Element { key: Option<Key> },
    Text { key: Option<Key>, content: String },
}

#[derive(Debug, Clone)]
struct SurfaceNode {
    parent: Option<SurfaceNodeId>,
    children: Vec<SurfaceNodeId>,
    kind: SurfaceNodeKind,
}

/// In-memory surface implementation.
///
/// Stands in for a real native surface: hosts embedding the crate against
/// an actual render substrate implement [`Surface`] themselves, but this
/// tree behaves the same way (keyed mirror of the model, placeholder
/// rendering, native selection) and doubles as the test double for the
/// whole reconciliation path. Its editing methods return the mutation
/// records a surface observer would deliver for that edit.
#[derive(Debug, Default)]
pub struct SurfaceTree {
    nodes: HashMap<SurfaceNodeId, SurfaceNode>,
    root: Option<SurfaceNodeId>,
    next_id: SurfaceNodeId,
    selection: Option<NativeSelection>,
    focused: bool,
    resync_count: u64,
}

impl SurfaceTree {
    pub fn new() -> Self {
        SurfaceTree::default()
    }

    pub fn root(&self) -> Option<SurfaceNodeId> {
        self.root
    }

    pub fn resync_count(&self) -> u64 {
        self.resync_count
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    fn alloc(&mut self, node: SurfaceNode) -> SurfaceNodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn build_from(&mut self, model: &Node, parent: Option<SurfaceNodeId>) -> SurfaceNodeId {
        match model {
            Node::Element { key, children } => {
                let id = self.alloc(SurfaceNode {
                    parent,
                    children: Vec::new(),
                    kind: SurfaceNodeKind::Element { key: Some(*key) },
                });
                let child_ids: Vec<_> = children
                    .iter()
                    .map(|child| self.build_from(child, Some(id)))
                    .collect();
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.children = child_ids;
                }
                id
            }
            Node::Text { key, text } => {
                let content = if text.is_empty() {
                    ZERO_WIDTH.to_string()
                } else {
                    text.clone()
                };
                self.alloc(SurfaceNode {
                    parent,
                    children: Vec::new(),
                    kind: SurfaceNodeKind::Text {
                        key: Some(*key),
                        content,
                    },
                })
            }
        }
    }

    /// Find the surface node mirroring a model key.
    pub fn find_by_key(&self, key: Key) -> Option<SurfaceNodeId> {
        self.nodes.iter().find_map(|(id, node)| {
            let node_key = match &node.kind {
                SurfaceNodeKind::Element { key } => *key,
                SurfaceNodeKind::Text { key, .. } => *key,
            };
            (node_key == Some(key)).then_some(*id)
        })
    }

    pub fn set_native_selection(&mut self, selection: NativeSelection) {
        self.selection = Some(selection);
    }

    /// Simulate native text editing of one node. Returns the record an
    /// observer would deliver.
    pub fn edit_text(&mut self, id: SurfaceNodeId, new_content: &str) -> MutationRecord {
        let old = match self.nodes.get_mut(&id) {
            Some(SurfaceNode {
                kind: SurfaceNodeKind::Text { content, .. },
                ..
            }) => std::mem::replace(content, new_content.to_string()),
            _ => String::new(),
        };
        MutationRecord {
            kind: MutationKind::CharacterData,
            target: id,
            added: Vec::new(),
            removed: Vec::new(),
            old_value: Some(old),
        }
    }

    /// Simulate the surface growing a new child node (the shapes native
    /// editing produces when it splits a block or inserts a line break).
    pub fn add_child(
        &mut self,
        parent: SurfaceNodeId,
        desc: SurfaceNodeDesc,
    ) -> (SurfaceNodeId, MutationRecord) {
        let kind = match &desc {
            SurfaceNodeDesc::Element { key } => SurfaceNodeKind::Element { key: *key },
            SurfaceNodeDesc::Text { content } => SurfaceNodeKind::Text {
                key: None,
                content: content.clone(),
            },
        };
        let id = self.alloc(SurfaceNode {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        let record = MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
            added: vec![desc],
            removed: Vec::new(),
            old_value: None,
        };
        (id, record)
    }

    /// Simulate the surface dropping a node.
    pub fn remove_node(&mut self, id: SurfaceNodeId) -> Option<MutationRecord> {
        let node = self.nodes.remove(&id)?;
        let desc = match &node.kind {
            SurfaceNodeKind::Element { key } => SurfaceNodeDesc::Element { key: *key },
            SurfaceNodeKind::Text { content, .. } => SurfaceNodeDesc::Text {
                content: content.clone(),
            },
        };
        let parent = node.parent?;
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|c| *c != id);
        }
        Some(MutationRecord {
            kind: MutationKind::ChildList,
            target: parent,
            added: Vec::new(),
            removed: vec![desc],
            old_value: None,
        })
    }

    /// Indented structural dump, used by snapshot tests. Keys are omitted
    /// so the output is stable across runs.
    pub fn outline(&self) -> String {
        fn walk(tree: &SurfaceTree, id: SurfaceNodeId, depth: usize, out: &mut String) {
            let Some(node) = tree.nodes.get(&id) else {
                return;
            };
            for _ in 0..depth {
                out.push_str("  ");
            }
            match &node.kind {
                SurfaceNodeKind::Element { .. } => out.push_str("element\n"),
                SurfaceNodeKind::Text { content, .. } => {
                    let shown: String = content
                        .chars()
                        .map(|c| if c == ZERO_WIDTH { '_' } else { c })
                        .collect();
                    out.push_str(&format!("text {shown:?}\n"));
                }
            }
            for child in &node.children {
                walk(tree, *child, depth + 1, out);
            }
        }

        let mut out = String::new();
        if let Some(root) = self.root {
            walk(self, root, 0, &mut out);
        }
        out
    }
}

impl Surface for SurfaceTree {
    fn node_text(&self, id: SurfaceNodeId) -> Option<String> {
        match &self.nodes.get(&id)?.kind {
            SurfaceNodeKind::Text { content, .. } => Some(content.clone()),
            SurfaceNodeKind::Element { .. } => None,
        }
    }

    fn closest_key(&self, id: SurfaceNodeId) -> Option<Key> {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.nodes.get(&id)?;
            let key = match &node.kind {
                SurfaceNodeKind::Element { key } => *key,
                SurfaceNodeKind::Text { key, .. } => *key,
            };
            if let Some(key) = key {
                return Some(key);
            }
            current = node.parent;
        }
        None
    }

    fn native_selection(&self) -> Option<NativeSelection> {
        self.selection.clone()
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn resync(&mut self, doc: &Document) {
        self.nodes.clear();
        self.next_id = 0;
        self.root = None;
        self.resync_count += 1;

        let root = self.build_from(doc.root(), None);
        self.root = Some(root);

        // Restore the native selection from the model's.
        self.selection = doc.selection().and_then(|sel| {
            let anchor_key = doc.node_at(&sel.anchor.path)?.key();
            let focus_key = doc.node_at(&sel.focus.path)?.key();
            let anchor_node = self.find_by_key(anchor_key)?;
            let focus_node = self.find_by_key(focus_key)?;
            Some(NativeSelection {
                anchor_node,
                anchor_offset: sel.anchor.offset,
                focus_node,
                focus_offset: sel.focus.offset,
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fix_text_strips_placeholders_and_adjusts_offset() {
        let text = format!("{ZERO_WIDTH}ab{ZERO_WIDTH}c");
        assert_eq!(fix_text_and_offset(&text, 4, false), ("abc".into(), 2));
        assert_eq!(fix_text_and_offset(&text, 0, false), ("abc".into(), 0));
    }

    #[test]
    fn fix_text_strips_trailing_newline_only_on_last_leaf() {
        assert_eq!(fix_text_and_offset("ab\n", 1, true), ("ab".into(), 1));
        assert_eq!(fix_text_and_offset("ab\n", 1, false), ("ab\n".into(), 1));
    }

    #[test]
    fn fix_text_clamps_offset() {
        assert_eq!(fix_text_and_offset("ab", 9, false), ("ab".into(), 2));
    }

    #[test]
    fn resync_mirrors_model_with_keys() {
        let doc = Document::from_blocks(["hello", ""]);
        let mut surface = SurfaceTree::new();
        surface.resync(&doc);

        let leaf_key = doc.root().children()[0].children()[0].key();
        let id = surface.find_by_key(leaf_key).unwrap();
        assert_eq!(surface.node_text(id).unwrap(), "hello");

        // Empty leaves render the placeholder.
        let empty_key = doc.root().children()[1].children()[0].key();
        let empty_id = surface.find_by_key(empty_key).unwrap();
        assert_eq!(surface.node_text(empty_id).unwrap(), ZERO_WIDTH.to_string());
    }

    #[test]
    fn closest_key_walks_up_to_keyed_ancestor() {
        let doc = Document::from_blocks(["x"]);
        let mut surface = SurfaceTree::new();
        surface.resync(&doc);

        let block_key = doc.root().children()[0].key();
        let block_id = surface.find_by_key(block_key).unwrap();
        let (unkeyed, _) = surface.add_child(
            block_id,
            SurfaceNodeDesc::Text {
                content: "loose".into(),
            },
        );
        assert_eq!(surface.closest_key(unkeyed), Some(block_key));
    }
}
