use thiserror::Error;

use trellis_core::id::StepId;

/// Faults that escape the bucket executor.
///
/// Data-level failures (row errors, whole-step failures) never appear
/// here; they are embedded in columns as error cells. Everything below
/// indicates a broken step implementation or a broken planner.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{step} returned a column of length {actual}, expected {expected}")]
    ColumnShape {
        step: StepId,
        expected: usize,
        actual: usize,
    },

    #[error("{step} violated its sync-and-safe contract: {reason}")]
    SyncSafeContract { step: StepId, reason: String },

    #[error("missing dependency column {dep} for {step}")]
    MissingDependency { step: StepId, dep: StepId },

    #[error("root bucket missing or mis-sized column for root dependency {dep}")]
    BadRootColumn { dep: StepId },

    #[error("the root layer plan must not appear as a child")]
    RootChild,

    #[error("bucket stalled with {pending} steps pending and none in flight")]
    Stalled { pending: usize },

    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl From<trellis_core::error::Error> for ExecError {
    fn from(e: trellis_core::error::Error) -> Self {
        ExecError::InvalidPlan(e.to_string())
    }
}
