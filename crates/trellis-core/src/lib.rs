#![forbid(unsafe_code)]
//! trellis-core: value model, step contract, and layer plans.
//!
//! This crate defines the *shapes* the executor works over: columns of
//! values with in-band error cells, the batched step-invocation contract,
//! and the static step DAG. Execution state (buckets, scheduling) lives in
//! `trellis-exec`; step implementations live in `trellis-steps`. No I/O and
//! no runtime dependency here.

pub mod config;
pub mod error;
pub mod events;
pub mod hash;
pub mod id;
pub mod plan;
pub mod prelude;
pub mod step;
pub mod value;
