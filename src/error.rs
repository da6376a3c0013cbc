//! Crate-wide error taxonomy.
//!
//! Build stages are fallible (bad input files, unwritable output paths);
//! the query path is not (`distance` always returns a `Distance`, saturating
//! to [`Distance::INF`] rather than propagating an error).

use thiserror::Error;

/// Errors a build stage can report.
///
/// `MalformedInput` lines are recoverable on their own — the ingester logs
/// and skips them rather than failing the whole run, so this variant
/// surfaces only when the file has no valid lines at all. `UnreadableArtifact`
/// is likewise soft: callers that hit it fall back to whatever layers did
/// load (see [`crate::query::CoreTreeIndex::load`]).
#[derive(Debug, Error)]
pub enum CoreTreeError {
    /// The input text graph had no usable edges.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// An index artifact was missing or truncated.
    #[error("unreadable artifact at {path}: {reason}")]
    UnreadableArtifact {
        /// Path that failed to load.
        path: String,
        /// Why it could not be used.
        reason: String,
    },
    /// Core labeling stopped at `MAXDIS` before the label reached fixpoint.
    #[error("core labeling budget exceeded at distance {0}")]
    BudgetExceeded(u32),
    /// An output artifact could not be created; the command should abort.
    #[error("cannot write artifact {path}: {source}")]
    Fatal {
        /// Path that could not be opened for writing.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for fallible build-stage results.
pub type Result<T> = std::result::Result<T, CoreTreeError>;
