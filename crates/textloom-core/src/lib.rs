/*!
 * # textloom-core
 *
 * Reconciliation core for rich-text editing over a natively editable
 * surface. The surface (an IME-driven text view, a contenteditable-like
 * widget) edits itself first; this crate observes what changed, works out
 * the user's intent, and replays it as primitive operations against an
 * authoritative path-addressed document tree.
 *
 * ## Architecture
 *
 * - **Model** ([`model`]): the document tree, `Path`/`Point`/`Range`
 *   addressing, the primitive `Operation` set, and the edit pipeline that
 *   keeps live refs and the selection transformed through every applied
 *   operation.
 * - **Refs** ([`refs`]): live point/range references that track positions
 *   across edits until disposed.
 * - **Diff** ([`diff`]): single-window text diffing; one contiguous
 *   changed region per comparison, by common prefix/suffix.
 * - **Observation** ([`mutation`], [`surface`]): mutation records, the
 *   [`mutation::ChangeFeed`] they arrive through, and the [`surface::Surface`]
 *   abstraction over the host's render layer (with [`surface::SurfaceTree`]
 *   as the in-memory implementation).
 * - **Reconciliation** ([`classify`], [`scheduler`], [`reconcile`]): batch
 *   classification into edit intents, cancel-and-replace task scheduling,
 *   and the [`reconcile::Reconciler`] that ties it all together on the
 *   host's tick.
 *
 * ## Failure policy
 *
 * Reconciliation never surfaces an error to the host: an edit that cannot
 * be applied faithfully is abandoned and the surface is rebuilt from the
 * model, which is always authoritative.
 */

pub mod classify;
pub mod diff;
pub mod error;
pub mod model;
pub mod mutation;
pub mod reconcile;
pub mod refs;
pub mod scheduler;
pub mod surface;

pub use classify::EditIntent;
pub use diff::{TextDiff, diff_text};
pub use error::{ReconcileError, Result};
pub use model::{
    Affinity, Document, Key, Node, Operation, Patch, Path, Point, Range, RangeAffinity,
};
pub use mutation::{ChangeFeed, MutationKind, MutationRecord, QueueFeed};
pub use reconcile::{Reconciler, ReconcilerStats};
pub use refs::{PointRef, RangeRef};
pub use scheduler::TaskSlot;
pub use surface::{NativeSelection, Surface, SurfaceNodeDesc, SurfaceNodeId, SurfaceTree, ZERO_WIDTH};
