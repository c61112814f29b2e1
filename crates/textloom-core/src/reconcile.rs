use crate::classify::{EditIntent, classify};
use crate::diff::diff_text;
use crate::error::{ReconcileError, Result};
use crate::model::document::Document;
use crate::model::node::{Key, Node};
use crate::model::path::Path;
use crate::model::point::{Point, Range};
use crate::mutation::{ChangeFeed, MutationBuffer, MutationRecord};
use crate::scheduler::TaskSlot;
use crate::surface::{Surface, SurfaceNodeDesc, SurfaceNodeId, fix_text_and_offset};

/// A computed text diff pinned to the leaf it applies to, held until the
/// translator is ready to apply it (possibly not before a structural edit
/// forces it through).
#[derive(Debug, Clone, PartialEq)]
struct PendingDiff {
    path: Path,
    start: usize,
    end: usize,
    insert_text: String,
}

/// Counters for the paths that deliberately make no noise: dropped and
/// ambiguous batches, abandoned edits, clamped diff windows.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerStats {
    /// Coalesced flushes executed.
    pub flushes: u64,
    /// Batches discarded because no user action was in progress.
    pub dropped_batches: u64,
    /// Batches the classifier refused to guess at.
    pub ambiguous_batches: u64,
    /// Edits abandoned in favor of a full resync.
    pub abandoned_edits: u64,
    /// Diff windows clamped back into bounds.
    pub clamped_windows: u64,
}

/// Per-surface reconciliation context.
///
/// One instance owns the mutation buffer, the pending diff, the saved
/// selection and the scheduling slots for exactly one bound surface; no
/// state is shared across instances. The host wires it up with
/// [`Reconciler::connect`] on mount, delivers observed batches through
/// [`Reconciler::on_mutations`] (or [`Reconciler::pump`] from a
/// [`ChangeFeed`]), signals input with `mark_user_action_start`/`end`,
/// forwards native selection notifications to `on_selection_change`, and
/// pumps [`Reconciler::tick`] once per scheduling tick.
///
/// Ordering guarantee: batch N's derived edit and resynchronization fully
/// complete before batch N+1 is accepted. Two things enforce it: the
/// user-action flag gates observation (it is cleared before the surface is
/// rebuilt, so self-inflicted mutations from the resync are discarded),
/// and every scheduling slot is cancel-and-replace, so no stale work ever
/// runs.
#[derive(Debug, Default)]
pub struct Reconciler {
    root: Option<SurfaceNodeId>,
    user_action: bool,
    is_flushing: bool,
    buffer: MutationBuffer,
    flush_slot: TaskSlot<()>,
    select_slot: TaskSlot<()>,
    merge_slot: TaskSlot<()>,
    last_diff: Option<PendingDiff>,
    last_range: Option<Range>,
    stats: ReconcilerStats,
}

impl Reconciler {
    pub fn new() -> Self {
        Reconciler::default()
    }

    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }

    pub fn is_connected(&self) -> bool {
        self.root.is_some()
    }

    pub fn user_action_in_progress(&self) -> bool {
        self.user_action
    }

    /// The selection most recently saved from the surface, if any.
    pub fn saved_selection(&self) -> Option<&Range> {
        self.last_range.as_ref()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Bind to a surface root. Reconnecting to the same root is a no-op;
    /// a different root disconnects the old one first.
    pub fn connect(&mut self, root: SurfaceNodeId) {
        if self.root == Some(root) {
            return;
        }
        if self.root.is_some() {
            self.disconnect();
        }
        self.root = Some(root);
    }

    pub fn disconnect(&mut self) {
        self.root = None;
        self.buffer.drain();
        self.flush_slot.cancel();
        self.select_slot.cancel();
        self.merge_slot.cancel();
        self.last_diff = None;
        self.is_flushing = false;
    }

    /// A key, composition or input-start signal arrived: observed
    /// mutations are the user's until further notice.
    pub fn mark_user_action_start(&mut self) {
        self.user_action = true;
    }

    /// Input ended without producing an edit (e.g. a handled command).
    pub fn mark_user_action_end(&mut self) {
        self.user_action = false;
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    /// Deliver one observed batch of mutation records.
    ///
    /// Batches arriving outside a user action are discarded: they are the
    /// echo of our own controlled resynchronization, not an edit. Batches
    /// arriving during one are buffered, and the coalescing flush is
    /// (re)scheduled: a burst of batches within one tick flushes exactly
    /// once, over the final state.
    pub fn on_mutations(&mut self, records: Vec<MutationRecord>) {
        if self.root.is_none() || !self.user_action {
            self.stats.dropped_batches += 1;
            return;
        }

        // A pending selection save would capture mid-action state; kill it.
        self.select_slot.cancel();
        self.is_flushing = true;

        self.buffer.push_batch(records);
        self.flush_slot.schedule(());
    }

    /// Drain every batch a change feed has accumulated.
    pub fn pump<F: ChangeFeed>(&mut self, feed: &mut F) {
        for batch in feed.poll() {
            self.on_mutations(batch);
        }
    }

    /// Native selection-change notification.
    ///
    /// Selection is saved on the next tick, not immediately: the save is
    /// canceled both by newer notifications (last writer wins) and by any
    /// mutation arriving first, in which case the movement was part of the
    /// user action rather than a caret placement worth restoring later.
    pub fn on_selection_change(&mut self) {
        self.select_slot.cancel();
        if self.is_flushing || self.user_action {
            return;
        }
        self.select_slot.schedule(());
    }

    // ------------------------------------------------------------------
    // Tick pump
    // ------------------------------------------------------------------

    /// Run the work that became due this tick.
    ///
    /// Work scheduled while this tick is being processed waits for the
    /// next one; that is what gives the merge path its deliberate one-tick
    /// deferral (a measured platform caret-repositioning artifact appears
    /// on the tick after the merge mutation; merging immediately produces
    /// a visible caret jump).
    pub fn tick<S: Surface>(&mut self, doc: &mut Document, surface: &mut S) {
        let merge_due = self.merge_slot.take_due().is_some();
        let flush_due = self.flush_slot.take_due().is_some();
        let select_due = self.select_slot.take_due().is_some();

        if merge_due {
            let result = self.merge_block(doc, surface);
            self.settle(result, true, doc, surface);
        }
        if flush_due {
            self.flush(doc, surface);
        }
        if select_due {
            self.save_selection(doc, surface);
        }
    }

    // ------------------------------------------------------------------
    // Flush
    // ------------------------------------------------------------------

    fn flush<S: Surface>(&mut self, doc: &mut Document, surface: &mut S) {
        let batch = self.buffer.drain();
        self.stats.flushes += 1;

        if batch.is_empty() {
            self.is_flushing = false;
            return;
        }

        match classify(&batch, self.last_range.as_ref(), doc) {
            None => {
                // Never guessed: an incorrect structural guess silently
                // corrupts content. Dropping leaves surface and model
                // consistent because nothing was applied.
                self.stats.ambiguous_batches += 1;
                self.is_flushing = false;
                self.user_action = false;
            }
            Some(EditIntent::UpdateText { targets }) => {
                let result = self.update_text(&targets, doc, surface);
                // The surface already shows the text the model just
                // adopted; no rebuild needed on success.
                self.settle(result, false, doc, surface);
            }
            Some(EditIntent::DeleteSelection) => {
                let result = self.delete_selection(doc);
                self.settle(result, true, doc, surface);
            }
            Some(EditIntent::SplitBlock) => {
                let result = self.split_block(doc, surface);
                self.settle(result, true, doc, surface);
            }
            Some(EditIntent::MergeBlock) => {
                // Deferred by one extra tick; see `tick`. Flags stay up so
                // intervening selection saves cannot sneak in.
                self.merge_slot.schedule(());
                self.is_flushing = false;
            }
            Some(EditIntent::DeleteNode { removed }) => {
                let result = self.delete_node(&removed, doc, surface);
                self.settle(result, true, doc, surface);
            }
        }
    }

    /// Close out one derived edit: clear the action state, then either
    /// resynchronize the surface from the model (structural edits and
    /// every failure) or leave it alone (pure text adoption). The flags
    /// are cleared *before* the rebuild so the rebuild's own mutations
    /// arrive gated off.
    fn settle<S: Surface>(
        &mut self,
        result: Result<()>,
        resync_on_success: bool,
        doc: &Document,
        surface: &mut S,
    ) {
        self.last_diff = None;
        self.is_flushing = false;
        self.user_action = false;

        match result {
            Ok(()) => {
                if resync_on_success {
                    surface.focus();
                    surface.resync(doc);
                }
            }
            Err(_) => {
                // Abandon-and-resync: the model is authoritative, partial
                // repair is worse than losing one edit.
                self.stats.abandoned_edits += 1;
                surface.resync(doc);
            }
        }
    }

    // ------------------------------------------------------------------
    // Intent handlers
    // ------------------------------------------------------------------

    fn update_text<S: Surface>(
        &mut self,
        targets: &[SurfaceNodeId],
        doc: &mut Document,
        surface: &S,
    ) -> Result<()> {
        for &target in targets {
            self.resolve_surface_node(target, doc, surface)?;
        }
        self.apply_diff(doc, surface)
    }

    fn delete_selection(&mut self, doc: &mut Document) -> Result<()> {
        let range = self
            .last_range
            .clone()
            .ok_or_else(|| ReconcileError::UnresolvableReference("no saved selection".into()))?;
        doc.select(&range)?;
        doc.delete_backward(1)
    }

    fn split_block<S: Surface>(&mut self, doc: &mut Document, surface: &S) -> Result<()> {
        self.apply_diff(doc, surface)?;
        if let Some(range) = self.last_range.clone() {
            doc.select(&range)?;
        }
        doc.split_block()
    }

    fn merge_block<S: Surface>(&mut self, doc: &mut Document, surface: &S) -> Result<()> {
        self.apply_diff(doc, surface)?;
        if let Some(range) = self.last_range.clone() {
            doc.select(&range)?;
        }
        doc.delete_backward(1)
    }

    fn delete_node<S: Surface>(
        &mut self,
        removed: &SurfaceNodeDesc,
        doc: &mut Document,
        _surface: &S,
    ) -> Result<()> {
        match removed {
            // A removed non-element is the zero-width placeholder of an
            // emptied leaf: the user deleted its last character.
            SurfaceNodeDesc::Text { .. } => doc.delete_backward(1),
            SurfaceNodeDesc::Element { key } => {
                let key = key.ok_or_else(|| {
                    ReconcileError::UnresolvableReference("removed element has no key".into())
                })?;
                let path = doc.path_of_key(key).ok_or_else(|| {
                    ReconcileError::UnresolvableReference("removed element key".into())
                })?;
                let range = doc
                    .range_of_node(&path)
                    .ok_or(ReconcileError::InvalidDiffWindow)?;
                doc.select(&range)?;
                doc.delete_selection()?;
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Diffing
    // ------------------------------------------------------------------

    /// Resolve one mutated surface node against the model and stash the
    /// text diff for `apply_diff`. Equal text clears the pending diff.
    fn resolve_surface_node<S: Surface>(
        &mut self,
        target: SurfaceNodeId,
        doc: &Document,
        surface: &S,
    ) -> Result<()> {
        let key = surface.closest_key(target).ok_or_else(|| {
            ReconcileError::UnresolvableReference("surface node has no keyed ancestor".into())
        })?;
        let leaf_path = leaf_path_for_key(doc, key)?;

        let prev_text = doc
            .text_at(&leaf_path)
            .ok_or_else(|| ReconcileError::UnresolvableReference("leaf text".into()))?
            .to_string();

        let raw = surface
            .node_text(target)
            .ok_or_else(|| ReconcileError::UnresolvableReference("surface text".into()))?;

        // Renderers pad the last leaf of a block with a trailing newline;
        // strip it (and any placeholders) before comparing.
        let is_last = is_last_leaf(doc, &leaf_path);
        let (next_text, _) = fix_text_and_offset(&raw, 0, is_last);

        if next_text == prev_text {
            self.last_diff = None;
            return Ok(());
        }

        let diff = diff_text(&prev_text, &next_text);
        self.last_diff = Some(PendingDiff {
            path: leaf_path,
            start: diff.start,
            end: diff.end,
            insert_text: diff.insert_text,
        });
        Ok(())
    }

    /// Apply the pending diff, if any.
    ///
    /// The native selection is captured *before* the operation: mid-
    /// composition the surface's own caret placement is authoritative, so
    /// after the structural operation the model selection is forced to
    /// those offsets rather than whatever the operation computed.
    fn apply_diff<S: Surface>(&mut self, doc: &mut Document, surface: &S) -> Result<()> {
        let Some(diff) = self.last_diff.clone() else {
            return Ok(());
        };

        let native = surface.native_selection();

        let leaf_len = doc
            .node_at(&diff.path)
            .and_then(|n| n.leaf_len())
            .ok_or(ReconcileError::InvalidDiffWindow)?;
        let (start, end) = if diff.start <= leaf_len && diff.end <= leaf_len {
            (diff.start, diff.end)
        } else {
            // The leaf shrank between diff and apply; clamp, don't fail.
            self.stats.clamped_windows += 1;
            (diff.start.min(leaf_len), diff.end.min(leaf_len))
        };

        if start == end && !diff.insert_text.is_empty() {
            // Pure insertion fast path.
            doc.insert_text_at(&diff.path, start, &diff.insert_text)?;
        } else {
            let range = Range::new(
                Point::new(diff.path.clone(), start),
                Point::new(diff.path.clone(), end),
            );
            if diff.insert_text.is_empty() {
                doc.delete_backward_at_range(&range, end - start)?;
            } else {
                doc.insert_text_at_range(&range, &diff.insert_text)?;
            }
        }

        if let Some(native) = native {
            doc.move_anchor_to(&diff.path, native.anchor_offset)?;
            doc.move_focus_to(&diff.path, native.focus_offset)?;
        }

        self.last_diff = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Selection save
    // ------------------------------------------------------------------

    fn save_selection<S: Surface>(&mut self, doc: &mut Document, surface: &S) {
        let Some(native) = surface.native_selection() else {
            return;
        };
        let Some(anchor) = self.native_point(native.anchor_node, native.anchor_offset, doc, surface)
        else {
            return;
        };
        let Some(focus) = self.native_point(native.focus_node, native.focus_offset, doc, surface)
        else {
            return;
        };

        let range = Range::new(anchor, focus);
        if doc.select(&range).is_ok() {
            self.last_range = Some(range);
        }
    }

    fn native_point<S: Surface>(
        &self,
        node: SurfaceNodeId,
        offset: usize,
        doc: &Document,
        surface: &S,
    ) -> Option<Point> {
        let key = surface.closest_key(node)?;
        let leaf_path = leaf_path_for_key(doc, key).ok()?;
        let raw = surface.node_text(node)?;
        let is_last = is_last_leaf(doc, &leaf_path);
        let (_, fixed_offset) = fix_text_and_offset(&raw, offset, is_last);
        Some(Point::new(leaf_path, fixed_offset))
    }
}

/// Resolve a key to the text leaf it names: either the keyed node itself,
/// or the first leaf under a keyed element.
fn leaf_path_for_key(doc: &Document, key: Key) -> Result<Path> {
    let mut path = doc
        .path_of_key(key)
        .ok_or_else(|| ReconcileError::UnresolvableReference("stale key".into()))?;
    loop {
        match doc.node_at(&path) {
            Some(Node::Text { .. }) => return Ok(path),
            Some(Node::Element { children, .. }) if !children.is_empty() => {
                path = path.child(0);
            }
            _ => {
                return Err(ReconcileError::UnresolvableReference(
                    "key does not reach a text leaf".into(),
                ));
            }
        }
    }
}

fn is_last_leaf(doc: &Document, leaf_path: &Path) -> bool {
    let Some(parent) = leaf_path.parent() else {
        return false;
    };
    let Some(index) = leaf_path.last() else {
        return false;
    };
    doc.node_at(&parent)
        .map(|n| index + 1 == n.children().len())
        .unwrap_or(false)
}
