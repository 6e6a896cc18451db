//! Convenient re-exports for downstream crates.

pub use crate::config::RuntimeConfig;
pub use crate::error::{Error, Result, StepError};
pub use crate::events::{EventEmitter, EventSink, ExecEvent};
pub use crate::hash::Hash256;
pub use crate::id::{BucketId, StepId};
pub use crate::plan::{ChildLayerPlan, ChildReason, LayerPlan, LayerPlanBuilder, PlanStep};
pub use crate::step::{Step, StepExtra, StepMeta, StepOutput};
pub use crate::value::{Cell, Column, Datum, ErrorCell, Value};
