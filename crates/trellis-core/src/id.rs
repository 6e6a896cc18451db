//! Strongly-typed identifiers used across the engine.
//!
//! Both ids are dense, zero-based allocations — not opaque handles. A
//! [`StepId`] is handed out by the plan builder in one id space shared
//! between plan steps and imported root-dependency columns, and reverse
//! edges are stored as these indices so plans stay value-typed with no
//! live references between steps. A [`BucketId`] is allocated
//! monotonically per request by the runtime, purely so diagnostic events
//! and summaries can be correlated. Downstream crates should not traffic
//! in raw integers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one step — or one imported column — within a layer plan's
/// id space. Doubles as the index the plan and its reverse edges are
/// keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(usize);

impl StepId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The dense index this id was allocated at.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step#{}", self.0)
    }
}

/// Identifies one bucket instance within a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketId(usize);

impl BucketId {
    pub const fn new(seq: usize) -> Self {
        Self(seq)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bucket#{}", self.0)
    }
}
