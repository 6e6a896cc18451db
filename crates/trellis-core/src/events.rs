//! Diagnostic event surface.
//!
//! The core defines the event vocabulary and the emitter handle; a concrete
//! sink (e.g. a bounded channel) is wired up by the exec crate. Emission is
//! best-effort: it never blocks and never fails execution.

use std::fmt;
use std::sync::Arc;

use crate::id::{BucketId, StepId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    StepDispatched {
        bucket: BucketId,
        step: StepId,
    },
    StepCompleted {
        bucket: BucketId,
        step: StepId,
        /// Error cells this step materialized (not counting re-injected
        /// upstream errors).
        errors: usize,
    },
    /// The step failed wholesale; its entire column is one error.
    StepFaulted {
        bucket: BucketId,
        step: StepId,
    },
    ChildDispatched {
        bucket: BucketId,
        child_index: usize,
    },
    BucketCompleted {
        bucket: BucketId,
        steps: usize,
        had_errors: bool,
    },
}

/// Where events go. Implementations must be cheap and non-blocking.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecEvent);
}

/// Clonable handle passed through the request into every step's extra.
/// A disabled emitter drops events on the floor.
#[derive(Clone, Default)]
pub struct EventEmitter {
    sink: Option<Arc<dyn EventSink>>,
}

impl EventEmitter {
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn emit(&self, event: ExecEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(event);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
