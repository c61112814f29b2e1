use crate::model::path::Path;
use crate::model::point::Range;

/// Result of applying an operation
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub changed: Vec<Path>,
    pub new_selection: Option<Range>,
    pub version: u64,
}
