//! Runtime: request-scoped context plus the engine wrapper that builds
//! root buckets, executes them, and reports a run summary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::mpsc;

use trellis_core::config::RuntimeConfig;
use trellis_core::events::{EventEmitter, ExecEvent};
use trellis_core::hash::Hash256;
use trellis_core::id::{BucketId, StepId};
use trellis_core::plan::LayerPlan;
use trellis_core::step::{new_step_meta, StepMeta};
use trellis_core::value::Column;

use crate::bucket::Bucket;
use crate::error::ExecError;
use crate::events::event_channel;
use crate::executor::execute_bucket;
use crate::handoff::ChildDispatch;

/// The only ambient input at this layer, scoped to one request: per-step
/// scratchpads, the diagnostic emitter, and the optional child dispatcher.
/// There is no global state.
pub struct RequestContext {
    meta: Mutex<HashMap<StepId, StepMeta>>,
    events: EventEmitter,
    children: Option<Arc<dyn ChildDispatch>>,
}

impl RequestContext {
    pub fn new(events: EventEmitter) -> Self {
        Self {
            meta: Mutex::new(HashMap::new()),
            events,
            children: None,
        }
    }

    pub fn with_child_dispatch(mut self, handler: Arc<dyn ChildDispatch>) -> Self {
        self.children = Some(handler);
        self
    }

    /// The scratchpad for a step, created on first use and persisting
    /// across every bucket of the request.
    pub fn meta_for(&self, step: StepId) -> StepMeta {
        let mut meta = self.meta.lock().unwrap_or_else(|e| e.into_inner());
        meta.entry(step).or_insert_with(new_step_meta).clone()
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub(crate) fn child_dispatch(&self) -> Option<&Arc<dyn ChildDispatch>> {
        self.children.as_ref()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(EventEmitter::disabled())
    }
}

/// What a finished request reports back, keyed by the plan fingerprint so
/// summaries can be correlated with diagnostic events offline.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub plan: Hash256,
    pub started_ms: u64,
    pub finished_ms: u64,
    pub steps: usize,
    pub had_errors: bool,
}

/// Engine wrapper: owns the config and hands out bucket ids.
pub struct Runtime {
    cfg: RuntimeConfig,
    bucket_seq: AtomicUsize,
}

impl Runtime {
    pub fn new(cfg: RuntimeConfig) -> Self {
        Self {
            cfg,
            bucket_seq: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.cfg
    }

    /// A diagnostic channel sized per config, for hosts that want events.
    pub fn event_channel(&self) -> (EventEmitter, mpsc::Receiver<ExecEvent>) {
        event_channel(self.cfg.event_capacity)
    }

    fn next_bucket_id(&self) -> BucketId {
        BucketId::new(self.bucket_seq.fetch_add(1, Ordering::Relaxed))
    }

    /// Build the root bucket for `plan`, seeded with `roots`, execute it to
    /// completion, and return it alongside a summary. The returned future
    /// resolves even when every row errors; only programming errors in
    /// steps or the plan surface as `Err`.
    pub async fn execute_request(
        &self,
        plan: Arc<LayerPlan>,
        roots: Vec<(StepId, Column)>,
        size: usize,
        ctx: &RequestContext,
    ) -> Result<(Bucket, RequestSummary), ExecError> {
        if self.cfg.verify_plans {
            plan.verify()?;
        }
        let fingerprint = plan.fingerprint()?;
        let started_ms = now_millis();

        let mut bucket = Bucket::new(self.next_bucket_id(), plan, roots, size)?;
        execute_bucket(&mut bucket, ctx).await?;

        let summary = RequestSummary {
            plan: fingerprint,
            started_ms,
            finished_ms: now_millis(),
            steps: bucket.plan().step_count(),
            had_errors: bucket.has_errors(),
        };
        Ok((bucket, summary))
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
