/*!
 * Document model: the path-addressed tree and everything positional.
 *
 * `Path`, `Point` and `Range` address into the tree by child indexes and
 * code point offsets; `Operation` is the closed set of primitive edits;
 * `Document` owns the tree and runs the edit pipeline (tree, then live
 * refs, then selection, then version bump) for every applied operation,
 * reporting each result as a `Patch`.
 */

pub mod document;
pub mod node;
pub mod operation;
pub mod patch;
pub mod path;
pub mod point;

pub use document::Document;
pub use node::{Key, Node};
pub use operation::Operation;
pub use patch::Patch;
pub use path::Path;
pub use point::{Affinity, Point, Range, RangeAffinity};
