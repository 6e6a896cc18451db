#![forbid(unsafe_code)]
//! trellis-steps: built-in step implementations (constant/access/apply).
//!
//! Design intent:
//! - No I/O here; asynchrony is limited to the deferred apply flavor,
//!   which wraps whatever future the host's per-row function produces.
//! - Row-level failures are emitted as in-band cells, never as `Err` from
//!   `execute`, so one bad row cannot take down its siblings (the
//!   whole-batch `failing` flavor is the deliberate exception).

pub mod access;
pub mod apply;
pub mod constant;

pub use access::AccessStep;
pub use apply::ApplyStep;
pub use constant::ConstantStep;
