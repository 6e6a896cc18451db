//! Child-layer hand-off: what happens after a bucket's last step settles.
//!
//! The executor does not expand child buckets itself; list-item fan-out,
//! mutation sequencing bodies, and polymorphic partitioning live elsewhere
//! in the runtime. This module owns the seam: enumerate the child layer
//! plans in declared order, route the expandable ones through the host's
//! [`ChildDispatch`], and mark the bucket complete once everything
//! dispatched has settled.

use futures::future::BoxFuture;

use trellis_core::error::StepError;
use trellis_core::events::ExecEvent;
use trellis_core::plan::{ChildLayerPlan, ChildReason};

use crate::bucket::Bucket;
use crate::error::ExecError;
use crate::runtime::RequestContext;

/// Host-side expansion of one child layer plan for a completed parent
/// bucket. Implementations own sub-bucket store seeding.
///
/// Dispatches are awaited in declared order, so a mutation child is never
/// launched while an earlier one is still running. An `Err` from a
/// dispatch is the handler's own failure, not the bucket's: it is logged
/// and must not poison sibling children, so expansion continues.
pub trait ChildDispatch: Send + Sync {
    fn dispatch<'a>(
        &'a self,
        parent: &'a Bucket,
        child: &'a ChildLayerPlan,
        child_index: usize,
    ) -> BoxFuture<'a, Result<(), StepError>>;
}

pub(crate) async fn run(bucket: &mut Bucket, ctx: &RequestContext) -> Result<(), ExecError> {
    for (child_index, child) in bucket.plan().children().iter().enumerate() {
        match child.reason {
            ChildReason::Root => return Err(ExecError::RootChild),
            ChildReason::ListItem | ChildReason::MutationField | ChildReason::Polymorphic => {
                let Some(handler) = ctx.child_dispatch() else {
                    tracing::debug!(
                        bucket = %bucket.id(),
                        child_index,
                        reason = ?child.reason,
                        "no child dispatcher installed; skipping expansion"
                    );
                    continue;
                };
                ctx.events().emit(ExecEvent::ChildDispatched {
                    bucket: bucket.id(),
                    child_index,
                });
                if let Err(e) = handler.dispatch(bucket, child, child_index).await {
                    tracing::warn!(
                        bucket = %bucket.id(),
                        child_index,
                        error = %e,
                        "child expansion failed"
                    );
                }
            }
            reason if reason.handled_elsewhere() => {
                tracing::trace!(
                    bucket = %bucket.id(),
                    child_index,
                    reason = ?reason,
                    "child handled elsewhere; skipping"
                );
            }
            reason => {
                return Err(ExecError::Invariant(format!(
                    "unhandled child reason {reason:?}"
                )))
            }
        }
    }

    bucket.mark_complete();
    ctx.events().emit(ExecEvent::BucketCompleted {
        bucket: bucket.id(),
        steps: bucket.plan().step_count(),
        had_errors: bucket.has_errors(),
    });
    tracing::debug!(bucket = %bucket.id(), has_errors = bucket.has_errors(), "bucket complete");
    Ok(())
}
