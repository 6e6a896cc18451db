#![forbid(unsafe_code)]
//! trellis-exec: bucket executor, error-aware invocation, child hand-off.
//!
//! Single-threaded cooperative scheduling: one logical executor drives a
//! bucket at a time, concurrency comes only from asynchronous step
//! execution, and the store is single-writer. Data-level failures travel
//! inside columns as error cells; the only faults that escape are
//! programming errors (shape/contract/planner violations).

pub mod bucket;
pub mod error;
pub mod events;
pub mod executor;
pub mod handoff;
pub mod invoker;
pub mod runtime;

pub use bucket::Bucket;
pub use error::ExecError;
pub use events::event_channel;
pub use executor::execute_bucket;
pub use handoff::ChildDispatch;
pub use runtime::{RequestContext, RequestSummary, Runtime};
