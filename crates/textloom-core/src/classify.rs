use serde::Serialize;

use crate::model::document::Document;
use crate::model::point::Range;
use crate::mutation::{MutationKind, MutationRecord};
use crate::surface::{SurfaceNodeDesc, SurfaceNodeId};

/// The high-level edit a mutation batch is believed to represent.
///
/// Exactly one intent per batch. Text updates stay unresolved here: the
/// affected nodes are diffed lazily by the translator, which is what
/// decides between insertion and deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EditIntent {
    /// Pure text-content change in one or more leaves.
    UpdateText { targets: Vec<SurfaceNodeId> },
    /// The surface split one block into two.
    SplitBlock,
    /// The surface merged two blocks into one.
    MergeBlock,
    /// The surface dropped a single node.
    DeleteNode { removed: SurfaceNodeDesc },
    /// An expanded selection was replaced or removed.
    DeleteSelection,
}

/// Map one drained batch to exactly one intent, in priority order.
///
/// Returns `None` for batches that match no rule: those are dropped as
/// no-ops rather than guessed at, since a wrong structural guess silently
/// corrupts content.
pub fn classify(
    batch: &[MutationRecord],
    prior_selection: Option<&Range>,
    doc: &Document,
) -> Option<EditIntent> {
    if batch.is_empty() {
        return None;
    }

    let pure_text = batch.iter().all(|r| r.is_character_data());

    // 1. An expanded selection existed before the batch and the batch is
    //    not a pure text change: the native edit replaced the selection.
    if !pure_text && prior_selection.is_some_and(|s| !s.is_collapsed()) {
        return Some(EditIntent::DeleteSelection);
    }

    // 2. A structural addition carrying the split signature: a text node
    //    holding only a line separator, or an element whose key already
    //    names a block in the model (the surface split that block into
    //    two nodes sharing identity).
    if batch
        .iter()
        .filter(|r| r.kind == MutationKind::ChildList)
        .flat_map(|r| r.added.iter())
        .any(|added| is_split_signature(added, doc))
    {
        return Some(EditIntent::SplitBlock);
    }

    // 3. Every record is a text change: resolve lazily, per target node.
    if pure_text {
        let mut targets: Vec<SurfaceNodeId> = Vec::new();
        for record in batch {
            if !targets.contains(&record.target) {
                targets.push(record.target);
            }
        }
        return Some(EditIntent::UpdateText { targets });
    }

    // 4./5. General catchers keyed off the first record.
    let first = &batch[0];
    if !first.removed.is_empty() {
        if batch.len() == 1 {
            return Some(EditIntent::DeleteNode {
                removed: first.removed[0].clone(),
            });
        }
        return Some(EditIntent::MergeBlock);
    }
    if !first.added.is_empty() {
        return Some(EditIntent::SplitBlock);
    }

    // 6. Unclassifiable.
    None
}

fn is_split_signature(added: &SurfaceNodeDesc, doc: &Document) -> bool {
    match added {
        SurfaceNodeDesc::Text { content } => is_line_separator(content),
        SurfaceNodeDesc::Element { key: Some(key) } => doc.closest_block(*key).is_some(),
        SurfaceNodeDesc::Element { key: None } => false,
    }
}

fn is_line_separator(content: &str) -> bool {
    !content.is_empty() && content.chars().all(|c| c == '\n' || c == '\u{2028}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::point::Point;
    use pretty_assertions::assert_eq;

    fn character_data(target: SurfaceNodeId) -> MutationRecord {
        MutationRecord {
            kind: MutationKind::CharacterData,
            target,
            added: Vec::new(),
            removed: Vec::new(),
            old_value: Some(String::new()),
        }
    }

    fn child_list(
        target: SurfaceNodeId,
        added: Vec<SurfaceNodeDesc>,
        removed: Vec<SurfaceNodeDesc>,
    ) -> MutationRecord {
        MutationRecord {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
            old_value: None,
        }
    }

    fn expanded_selection() -> Range {
        Range::new(Point::new([0, 0], 0), Point::new([0, 0], 3))
    }

    #[test]
    fn all_character_data_is_a_text_update() {
        let doc = Document::from_blocks(["abc"]);
        let batch = vec![character_data(5), character_data(5), character_data(7)];
        assert_eq!(
            classify(&batch, None, &doc),
            Some(EditIntent::UpdateText { targets: vec![5, 7] })
        );
    }

    #[test]
    fn character_data_wins_over_expanded_selection() {
        // A pure text change is never reinterpreted as a selection delete,
        // even with an expanded prior selection.
        let doc = Document::from_blocks(["abc"]);
        let batch = vec![character_data(5), character_data(5)];
        assert_eq!(
            classify(&batch, Some(&expanded_selection()), &doc),
            Some(EditIntent::UpdateText { targets: vec![5] })
        );
    }

    #[test]
    fn expanded_selection_with_structural_batch_is_delete_selection() {
        let doc = Document::from_blocks(["abc"]);
        let batch = vec![child_list(
            0,
            Vec::new(),
            vec![SurfaceNodeDesc::Text {
                content: "abc".into(),
            }],
        )];
        assert_eq!(
            classify(&batch, Some(&expanded_selection()), &doc),
            Some(EditIntent::DeleteSelection)
        );
    }

    #[test]
    fn newline_text_addition_is_a_split() {
        let doc = Document::from_blocks(["abc"]);
        let batch = vec![
            character_data(3),
            child_list(
                0,
                vec![SurfaceNodeDesc::Text { content: "\n".into() }],
                Vec::new(),
            ),
        ];
        assert_eq!(classify(&batch, None, &doc), Some(EditIntent::SplitBlock));
    }

    #[test]
    fn added_element_with_known_block_key_is_a_split() {
        let doc = Document::from_blocks(["abc"]);
        let block_key = doc.root().children()[0].key();
        let batch = vec![
            character_data(3),
            child_list(
                0,
                vec![SurfaceNodeDesc::Element {
                    key: Some(block_key),
                }],
                Vec::new(),
            ),
        ];
        assert_eq!(classify(&batch, None, &doc), Some(EditIntent::SplitBlock));
    }

    #[test]
    fn added_element_with_unknown_key_is_not_a_split_signature() {
        let doc = Document::from_blocks(["abc"]);
        let other = Document::from_blocks(["zzz"]);
        let foreign_key = other.root().children()[0].key();
        let batch = vec![child_list(
            0,
            vec![SurfaceNodeDesc::Element {
                key: Some(foreign_key),
            }],
            Vec::new(),
        )];
        // Falls through to the generic added-nodes catcher.
        assert_eq!(classify(&batch, None, &doc), Some(EditIntent::SplitBlock));
    }

    #[test]
    fn single_record_removal_is_delete_node() {
        let doc = Document::from_blocks(["abc"]);
        let removed = SurfaceNodeDesc::Text {
            content: "\u{FEFF}".into(),
        };
        let batch = vec![child_list(0, Vec::new(), vec![removed.clone()])];
        assert_eq!(
            classify(&batch, None, &doc),
            Some(EditIntent::DeleteNode { removed })
        );
    }

    #[test]
    fn multi_record_removal_is_merge_block() {
        let doc = Document::from_blocks(["abc", "def"]);
        let batch = vec![
            child_list(
                0,
                Vec::new(),
                vec![SurfaceNodeDesc::Element { key: None }],
            ),
            character_data(3),
        ];
        assert_eq!(classify(&batch, None, &doc), Some(EditIntent::MergeBlock));
    }

    #[test]
    fn attribute_noise_is_dropped() {
        let doc = Document::from_blocks(["abc"]);
        let batch = vec![MutationRecord {
            kind: MutationKind::Attributes,
            target: 0,
            added: Vec::new(),
            removed: Vec::new(),
            old_value: None,
        }];
        assert_eq!(classify(&batch, None, &doc), None);
    }

    #[test]
    fn classified_batch_snapshot() {
        let doc = Document::from_blocks(["abc"]);
        let batch = vec![character_data(5), character_data(7)];
        let intent = classify(&batch, None, &doc).unwrap();
        insta::assert_yaml_snapshot!("text_update_intent", intent);
    }

    #[test]
    fn empty_batch_is_dropped() {
        let doc = Document::from_blocks(["abc"]);
        assert_eq!(classify(&[], None, &doc), None);
    }
}
