#![forbid(unsafe_code)]
//! trellis: bucketed, error-aware execution of planned step DAGs.
//!
//! Facade over the workspace crates; see `trellis-core` for the value and
//! plan model, `trellis-exec` for the executor, and `trellis-steps` for
//! built-in steps.

pub use trellis_core::config::RuntimeConfig;
pub use trellis_core::error::{Error, StepError};
pub use trellis_core::events::{EventEmitter, EventSink, ExecEvent};
pub use trellis_core::id::{BucketId, StepId};
pub use trellis_core::plan::{ChildLayerPlan, ChildReason, LayerPlan, LayerPlanBuilder};
pub use trellis_core::step::{Step, StepExtra, StepOutput};
pub use trellis_core::value::{Cell, Column, Datum, ErrorCell, Value};
pub use trellis_exec::invoker;
pub use trellis_exec::{
    event_channel, execute_bucket, Bucket, ChildDispatch, ExecError, RequestContext,
    RequestSummary, Runtime,
};
pub use trellis_steps::{AccessStep, ApplyStep, ConstantStep};
