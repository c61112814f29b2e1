use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity shared between a model node and its surface mirror.
///
/// Keys survive re-renders: when the surface is rebuilt from the model the
/// new surface nodes carry the same keys, which is what lets mutation
/// records be resolved back to model nodes after arbitrary native edits.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Key(Uuid);

impl Key {
    pub fn new() -> Self {
        Key(Uuid::new_v4())
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::new()
    }
}

/// A node in the document tree.
///
/// The model deliberately carries no node-type taxonomy beyond the
/// element/text split: elements group children (the direct children of the
/// root are the blocks), text nodes are the leaves all offsets address into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Element { key: Key, children: Vec<Node> },
    Text { key: Key, text: String },
}

impl Node {
    /// Create an element with a fresh key.
    pub fn element(children: Vec<Node>) -> Self {
        Node::Element {
            key: Key::new(),
            children,
        }
    }

    /// Create a text leaf with a fresh key.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text {
            key: Key::new(),
            text: text.into(),
        }
    }

    /// Create a block holding a single text leaf, the common shape.
    pub fn block(text: impl Into<String>) -> Self {
        Node::element(vec![Node::text(text)])
    }

    pub fn key(&self) -> Key {
        match self {
            Node::Element { key, .. } => *key,
            Node::Text { key, .. } => *key,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element { children, .. } => children,
            Node::Text { .. } => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element { children, .. } => Some(children),
            Node::Text { .. } => None,
        }
    }

    /// Text content of a leaf, `None` for elements.
    pub fn leaf_text(&self) -> Option<&str> {
        match self {
            Node::Text { text, .. } => Some(text),
            Node::Element { .. } => None,
        }
    }

    /// Length of a leaf's text in code points.
    pub fn leaf_len(&self) -> Option<usize> {
        self.leaf_text().map(|t| t.chars().count())
    }
}

/// Convert a code point offset into a byte index, clamped to the string end.
pub(crate) fn byte_index(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(char_offset)
        .unwrap_or(s.len())
}

/// Length of a string in code points.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}
