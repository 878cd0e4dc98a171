//! Error types for Marlin inference.

use thiserror::Error;

/// Errors that can occur during grounding, simplification, or sampling.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Timeouts are deliberately *not* an error: cancellation is a normal
/// termination that still reports partial tallies (see
/// [`Termination`](crate::engine::driver::Termination)).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum InferError {
    /// A hard contradiction: the hard clauses admit no satisfying assignment.
    /// Carries a rendering of the clause that became empty.
    #[error("hard contradiction: clause {clause} is unsatisfiable")]
    Unsat { clause: String },

    /// Configuration rejected at driver start (e.g. zero MC-SAT samples).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The active ground-clause count exceeded the configured ceiling.
    #[error("grounding produced {clauses} clauses, exceeding the ceiling of {ceiling}")]
    GroundingOversize { clauses: usize, ceiling: usize },

    /// Malformed model surfaced through the ground store.
    #[error("model error: {0}")]
    Model(#[from] marlin_ir::ModelError),

    /// Internal invariant violation (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}
