use serde::{Deserialize, Serialize};

use crate::surface::{SurfaceNodeDesc, SurfaceNodeId};

/// What kind of change a mutation record describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    /// A text node's content changed.
    CharacterData,
    /// Children were added to or removed from an element.
    ChildList,
    /// An attribute changed. Carried for completeness; reconciliation
    /// never acts on attribute noise.
    Attributes,
}

/// One atomic observed surface change, as delivered by the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: SurfaceNodeId,
    pub added: Vec<SurfaceNodeDesc>,
    pub removed: Vec<SurfaceNodeDesc>,
    /// Text content before the change, for `CharacterData` records.
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn is_character_data(&self) -> bool {
        self.kind == MutationKind::CharacterData
    }
}

/// Append-only buffer of observed mutations.
///
/// Filled as batches arrive during a user action and drained atomically by
/// exactly one flush; nothing is ever processed out of the middle.
#[derive(Debug, Default)]
pub struct MutationBuffer {
    records: Vec<MutationRecord>,
}

impl MutationBuffer {
    pub fn new() -> Self {
        MutationBuffer::default()
    }

    pub fn push_batch(&mut self, records: impl IntoIterator<Item = MutationRecord>) {
        self.records.extend(records);
    }

    pub fn drain(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Source of mutation batches for one surface root.
///
/// Abstracts the observation substrate (a native observer, polling, a
/// watch primitive) away from reconciliation. Implementations accumulate
/// batches as they happen; the reconciliation loop drains them with
/// `poll` on its own single-threaded executor, preserving arrival order.
pub trait ChangeFeed {
    fn subscribe(&mut self, root: SurfaceNodeId);
    fn unsubscribe(&mut self);

    /// Batches observed since the last poll, oldest first. Empty when
    /// nothing happened or nothing is subscribed.
    fn poll(&mut self) -> Vec<Vec<MutationRecord>>;
}

/// Trivial in-memory change feed: whatever produces mutations pushes
/// batches in, the reconciliation loop polls them out.
#[derive(Debug, Default)]
pub struct QueueFeed {
    subscribed: Option<SurfaceNodeId>,
    batches: Vec<Vec<MutationRecord>>,
}

impl QueueFeed {
    pub fn new() -> Self {
        QueueFeed::default()
    }

    /// Deliver one observed batch. Ignored while unsubscribed, matching
    /// observer semantics: nothing is recorded before `subscribe`.
    pub fn push_batch(&mut self, records: Vec<MutationRecord>) {
        if self.subscribed.is_some() {
            self.batches.push(records);
        }
    }
}

impl ChangeFeed for QueueFeed {
    fn subscribe(&mut self, root: SurfaceNodeId) {
        self.subscribed = Some(root);
    }

    fn unsubscribe(&mut self) {
        self.subscribed = None;
        self.batches.clear();
    }

    fn poll(&mut self) -> Vec<Vec<MutationRecord>> {
        std::mem::take(&mut self.batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(target: SurfaceNodeId) -> MutationRecord {
        MutationRecord {
            kind: MutationKind::CharacterData,
            target,
            added: Vec::new(),
            removed: Vec::new(),
            old_value: None,
        }
    }

    #[test]
    fn buffer_drains_atomically() {
        let mut buffer = MutationBuffer::new();
        buffer.push_batch([record(1)]);
        buffer.push_batch([record(2), record(3)]);
        assert_eq!(buffer.len(), 3);

        let drained = buffer.drain();
        assert_eq!(drained.len(), 3);
        assert!(buffer.is_empty());
    }

    #[test]
    fn queue_feed_ignores_batches_while_unsubscribed() {
        let mut feed = QueueFeed::new();
        feed.push_batch(vec![record(1)]);
        assert!(feed.poll().is_empty());

        feed.subscribe(0);
        feed.push_batch(vec![record(1)]);
        feed.push_batch(vec![record(2)]);
        let polled = feed.poll();
        assert_eq!(polled.len(), 2);
        assert!(feed.poll().is_empty());

        feed.unsubscribe();
        feed.push_batch(vec![record(3)]);
        assert!(feed.poll().is_empty());
    }
}
