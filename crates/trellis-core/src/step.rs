//! Step contract + per-step execution context.
//!
//! The executor calls `execute(...)` once per bucket with the step's
//! dependency columns in declared order; the step is responsible for any
//! internal vectorization or fan-out.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use crate::error::StepError;
use crate::events::EventEmitter;
use crate::value::{Cell, Column, Value};

/// The whole-batch deferred form of a step's output.
pub type BatchFuture = BoxFuture<'static, std::result::Result<Vec<Cell>, StepError>>;

/// What `execute` returns: a column of cells now, or a future of one.
/// Either way the cell count must equal the common input length.
pub enum StepOutput {
    Ready(Vec<Cell>),
    Deferred(BatchFuture),
}

impl StepOutput {
    /// Convenience for the common all-values synchronous case.
    pub fn values(values: Vec<Value>) -> Self {
        StepOutput::Ready(values.into_iter().map(Cell::Value).collect())
    }
}

/// Per-step scratchpad, persisting across every bucket of a request.
/// Steps use it for request-scoped caches (e.g. batching state).
pub type StepMeta = Arc<Mutex<HashMap<String, Value>>>;

/// Ambient context handed to each invocation alongside the dependency
/// columns: the step's scratchpad plus the diagnostic event handle.
#[derive(Debug, Clone)]
pub struct StepExtra {
    pub meta: StepMeta,
    pub events: EventEmitter,
}

/// Trait that all plan steps implement.
///
/// Invariants:
/// - `execute` receives one column per declared dependency, each of the
///   bucket's length (or a single placeholder-unit column when the step has
///   no dependencies), and must return exactly that many cells.
/// - A step marked `is_sync_and_safe` must return `StepOutput::Ready` with
///   plain-value cells only: no deferred entries, no error cells that were
///   not already present in its inputs. Violations are programming errors
///   and fail the whole bucket.
pub trait Step: Send + Sync + 'static {
    /// Human-readable step name (stable), used in diagnostics and
    /// plan fingerprints.
    fn name(&self) -> &'static str;

    /// Fast-path promise; see trait docs. Defaults to the conservative
    /// answer.
    fn is_sync_and_safe(&self) -> bool {
        false
    }

    /// Evaluate one bucket worth of rows.
    ///
    /// A synchronous `Err` is a whole-batch failure: the executor converts
    /// it into an error column, never a rejection.
    fn execute(
        &self,
        deps: &[Column],
        extra: &StepExtra,
    ) -> std::result::Result<StepOutput, StepError>;
}

/// Fresh scratchpad, used by request contexts when a step first asks
/// for its meta.
pub fn new_step_meta() -> StepMeta {
    Arc::new(Mutex::new(HashMap::new()))
}
