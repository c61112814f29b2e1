use thiserror::Error;

/// Failures internal to the reconciliation path.
///
/// None of these ever reach the host: an uncaught failure mid-edit would
/// leave surface and model permanently desynchronized, so every variant is
/// resolved locally by abandoning the in-flight edit and resynchronizing
/// the surface from the model.
#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    /// A path, key or node identity no longer resolves against the current
    /// tree shape (stale key, concurrent unrelated update).
    #[error("reference no longer resolves: {0}")]
    UnresolvableReference(String),

    /// The classifier could not map a mutation batch to an intent. The
    /// batch is dropped rather than guessed at; a wrong structural guess
    /// silently corrupts content.
    #[error("mutation batch is ambiguous")]
    AmbiguousBatch,

    /// Computed diff offsets fell outside valid bounds after a structural
    /// change mid-flight. Callers clamp to the valid window instead of
    /// failing where possible.
    #[error("diff window out of bounds")]
    InvalidDiffWindow,
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
