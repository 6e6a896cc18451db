//! Bucket executor: the dependency-driven scheduler.
//!
//! Steps are dispatched the moment every dependency column they declare has
//! materialized. Synchronous completions cascade through a ready queue
//! without yielding; asynchronous outcomes park in a `FuturesUnordered` and
//! each settlement re-runs ready discovery over the step's dependents. The
//! scheduler is the single writer of the bucket's store, so no locking is
//! needed anywhere in this module.
//!
//! Data-level failures never escape: a failing row becomes an error cell at
//! that row, a failing step becomes a whole-column broadcast of one error
//! cell. Only shape violations, sync-and-safe contract violations, and
//! planner violations surface as `Err`.

use std::collections::{HashSet, VecDeque};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

use trellis_core::error::StepError;
use trellis_core::events::ExecEvent;
use trellis_core::id::StepId;
use trellis_core::step::{StepExtra, StepOutput};
use trellis_core::value::{Cell, Column, Datum, ErrorCell};

use crate::bucket::Bucket;
use crate::error::ExecError;
use crate::handoff;
use crate::invoker::{self, ErrorMap};
use crate::runtime::RequestContext;

/// Run every step of the bucket's layer plan to completion, then run child
/// hand-off. Resolves once the bucket is complete; all row- and step-level
/// failures are embedded in the published columns rather than returned.
pub async fn execute_bucket(
    bucket: &mut Bucket,
    ctx: &RequestContext,
) -> Result<(), ExecError> {
    Scheduler::new(bucket, ctx).run().await?;
    handoff::run(bucket, ctx).await
}

/// How a settled step invocation reaches the scheduler.
struct Completion {
    step: StepId,
    /// Errored rows filtered out of the inputs, to be re-injected
    /// positionally at publication.
    merge: Option<ErrorMap>,
    outcome: Outcome,
}

enum Outcome {
    /// Reduced cells ready for publication. `introduced` counts error
    /// cells this step itself materialized.
    Reduced { data: Vec<Datum>, introduced: usize },
    /// Whole-batch failure, broadcast across every row.
    Fault(StepError),
    /// Length mismatch observed after a deferred output settled. Fatal.
    Shape { expected: usize, actual: usize },
}

struct Scheduler<'a> {
    bucket: &'a mut Bucket,
    ctx: &'a RequestContext,
    pending: HashSet<StepId>,
    in_progress: HashSet<StepId>,
    ready: VecDeque<StepId>,
    in_flight: FuturesUnordered<BoxFuture<'static, Completion>>,
}

impl<'a> Scheduler<'a> {
    fn new(bucket: &'a mut Bucket, ctx: &'a RequestContext) -> Self {
        let pending = bucket.plan().steps().iter().map(|s| s.id).collect();
        let ready = bucket.plan().start_steps().iter().copied().collect();
        Self {
            bucket,
            ctx,
            pending,
            in_progress: HashSet::new(),
            ready,
            in_flight: FuturesUnordered::new(),
        }
    }

    async fn run(mut self) -> Result<(), ExecError> {
        loop {
            while let Some(id) = self.ready.pop_front() {
                self.dispatch(id)?;
            }
            if self.pending.is_empty() {
                return Ok(());
            }
            let settled = self.in_flight.next().await;
            match settled {
                Some(completion) => self.complete(completion)?,
                // Pending steps but nothing running: the plan references
                // columns nobody will ever produce.
                None => {
                    return Err(ExecError::Stalled {
                        pending: self.pending.len(),
                    })
                }
            }
        }
    }

    fn dispatch(&mut self, id: StepId) -> Result<(), ExecError> {
        if !self.pending.contains(&id) || self.in_progress.contains(&id) {
            return Ok(());
        }
        let plan = self.bucket.plan().clone();
        let step = plan
            .step(id)
            .ok_or_else(|| ExecError::Invariant(format!("{id} is not a plan step")))?;

        let mut deps = Vec::with_capacity(step.dependencies.len());
        for d in &step.dependencies {
            match self.bucket.column(*d) {
                Some(c) => deps.push(c.clone()),
                None => return Err(ExecError::MissingDependency { step: id, dep: *d }),
            }
        }
        if deps.is_empty() {
            deps.push(self.bucket.no_deps_list());
        }

        self.in_progress.insert(id);
        tracing::trace!(bucket = %self.bucket.id(), step = %id, "dispatching step");
        self.ctx.events().emit(ExecEvent::StepDispatched {
            bucket: self.bucket.id(),
            step: id,
        });

        let size = self.bucket.size();

        // Once the bucket carries errors, rows whose inputs already failed
        // are filtered out before invocation and re-injected afterwards.
        let (deps, merge) = if self.bucket.has_errors() {
            let errors = invoker::scan_errors(&deps);
            if errors.is_empty() {
                (deps, None)
            } else {
                let filtered = invoker::filter_deps(&deps, &errors);
                (filtered, Some(errors))
            }
        } else {
            (deps, None)
        };

        // Every row already failed: the step is not invoked at all and its
        // output is exactly the upstream error column.
        if let Some(errors) = &merge {
            if errors.len() == size && size > 0 {
                let data = invoker::merge_back(id, size, errors, Vec::new())?;
                return self.complete(Completion {
                    step: id,
                    merge: None,
                    outcome: Outcome::Reduced {
                        data,
                        introduced: 0,
                    },
                });
            }
        }
        let expected = size - merge.as_ref().map_or(0, ErrorMap::len);

        let extra = StepExtra {
            meta: self.ctx.meta_for(id),
            events: self.ctx.events().clone(),
        };

        // A synchronous raise is converted to a broadcast fault before
        // control returns, so sibling dispatches in this round can never
        // observe a half-failed bucket.
        match step.op.execute(&deps, &extra) {
            Err(e) => self.complete(Completion {
                step: id,
                merge,
                outcome: Outcome::Fault(e),
            }),
            Ok(StepOutput::Ready(cells)) => {
                if cells.len() != expected {
                    return Err(ExecError::ColumnShape {
                        step: id,
                        expected,
                        actual: cells.len(),
                    });
                }
                if step.sync_and_safe && merge.is_none() {
                    // Fast path: no reduction pass, no error bookkeeping.
                    let data = fast_reduce(id, cells)?;
                    return self.complete(Completion {
                        step: id,
                        merge: None,
                        outcome: Outcome::Reduced {
                            data,
                            introduced: 0,
                        },
                    });
                }
                match reduce_settled(id, cells) {
                    Settled::Done { data, introduced } => {
                        if step.sync_and_safe && introduced > 0 {
                            return Err(ExecError::SyncSafeContract {
                                step: id,
                                reason: "introduced new error cells".into(),
                            });
                        }
                        self.complete(Completion {
                            step: id,
                            merge,
                            outcome: Outcome::Reduced { data, introduced },
                        })
                    }
                    Settled::NeedsAwait(cells) => {
                        if step.sync_and_safe {
                            return Err(ExecError::SyncSafeContract {
                                step: id,
                                reason: "returned deferred cells".into(),
                            });
                        }
                        self.in_flight.push(
                            async move {
                                Completion {
                                    step: id,
                                    merge,
                                    outcome: reduce_deferred(id, cells).await,
                                }
                            }
                            .boxed(),
                        );
                        Ok(())
                    }
                }
            }
            Ok(StepOutput::Deferred(fut)) => {
                if step.sync_and_safe {
                    return Err(ExecError::SyncSafeContract {
                        step: id,
                        reason: "returned a deferred batch".into(),
                    });
                }
                self.in_flight.push(
                    async move {
                        let outcome = match fut.await {
                            Ok(cells) => {
                                if cells.len() != expected {
                                    Outcome::Shape {
                                        expected,
                                        actual: cells.len(),
                                    }
                                } else {
                                    reduce_deferred(id, cells).await
                                }
                            }
                            Err(e) => Outcome::Fault(e),
                        };
                        Completion {
                            step: id,
                            merge,
                            outcome,
                        }
                    }
                    .boxed(),
                );
                Ok(())
            }
        }
    }

    fn complete(&mut self, completion: Completion) -> Result<(), ExecError> {
        let Completion {
            step,
            merge,
            outcome,
        } = completion;
        let size = self.bucket.size();

        let (data, introduced) = match outcome {
            Outcome::Reduced { data, introduced } => match merge {
                Some(errors) => (invoker::merge_back(step, size, &errors, data)?, introduced),
                None => (data, introduced),
            },
            Outcome::Fault(e) => {
                tracing::debug!(step = %step, error = %e, "step failed wholesale; broadcasting");
                self.ctx.events().emit(ExecEvent::StepFaulted {
                    bucket: self.bucket.id(),
                    step,
                });
                self.bucket.mark_errors();
                let cell = ErrorCell::new(e, step);
                (vec![Datum::Error(cell); size], size)
            }
            Outcome::Shape { expected, actual } => {
                return Err(ExecError::ColumnShape {
                    step,
                    expected,
                    actual,
                })
            }
        };

        if data.len() != size {
            return Err(ExecError::ColumnShape {
                step,
                expected: size,
                actual: data.len(),
            });
        }
        if introduced > 0 {
            self.bucket.mark_errors();
        }

        self.bucket.publish(step, Column::new(data));
        self.in_progress.remove(&step);
        self.pending.remove(&step);
        tracing::trace!(bucket = %self.bucket.id(), step = %step, errors = introduced, "step completed");
        self.ctx.events().emit(ExecEvent::StepCompleted {
            bucket: self.bucket.id(),
            step,
            errors: introduced,
        });

        if self.pending.is_empty() {
            return Ok(());
        }
        let plan = self.bucket.plan().clone();
        if let Some(ps) = plan.step(step) {
            for t in &ps.dependents {
                if self.is_ready(*t) {
                    self.ready.push_back(*t);
                }
            }
        }
        Ok(())
    }

    fn is_ready(&self, id: StepId) -> bool {
        self.pending.contains(&id)
            && !self.in_progress.contains(&id)
            && self.bucket.plan().step(id).is_some_and(|s| {
                s.dependencies
                    .iter()
                    .all(|d| self.bucket.column(*d).is_some())
            })
    }
}

/// Direct publication for sync-and-safe steps: every cell must be a plain
/// value, or the step has broken its promise.
fn fast_reduce(step: StepId, cells: Vec<Cell>) -> Result<Vec<Datum>, ExecError> {
    cells
        .into_iter()
        .map(|c| match c {
            Cell::Value(v) => Ok(Datum::Value(v)),
            Cell::Error(_) | Cell::Fail(_) => Err(ExecError::SyncSafeContract {
                step,
                reason: "introduced new error cells".into(),
            }),
            Cell::Deferred(_) => Err(ExecError::SyncSafeContract {
                step,
                reason: "returned deferred cells".into(),
            }),
        })
        .collect()
}

enum Settled {
    Done { data: Vec<Datum>, introduced: usize },
    NeedsAwait(Vec<Cell>),
}

/// Reduce a column with no deferred entries without creating a future, so
/// an already-settled column round-trips untouched and synchronously.
fn reduce_settled(step: StepId, cells: Vec<Cell>) -> Settled {
    if cells.iter().any(|c| matches!(c, Cell::Deferred(_))) {
        return Settled::NeedsAwait(cells);
    }
    let mut introduced = 0;
    let mut data = Vec::with_capacity(cells.len());
    for c in cells {
        match c {
            Cell::Value(v) => data.push(Datum::Value(v)),
            Cell::Error(e) => {
                introduced += 1;
                data.push(Datum::Error(e));
            }
            Cell::Fail(e) => {
                introduced += 1;
                data.push(Datum::Error(ErrorCell::new(e, step)));
            }
            // Excluded by the scan above.
            Cell::Deferred(_) => unreachable!("deferred cell in settled column"),
        }
    }
    Settled::Done { data, introduced }
}

/// Positional reduction: await each deferred entry in row order, mapping
/// fulfilled entries to values and rejections to fresh error cells tagged
/// with the producing step.
async fn reduce_deferred(step: StepId, cells: Vec<Cell>) -> Outcome {
    let mut introduced = 0;
    let mut data = Vec::with_capacity(cells.len());
    for c in cells {
        match c {
            Cell::Value(v) => data.push(Datum::Value(v)),
            Cell::Error(e) => {
                introduced += 1;
                data.push(Datum::Error(e));
            }
            Cell::Fail(e) => {
                introduced += 1;
                data.push(Datum::Error(ErrorCell::new(e, step)));
            }
            Cell::Deferred(f) => match f.await {
                Ok(v) => data.push(Datum::Value(v)),
                Err(e) => {
                    introduced += 1;
                    data.push(Datum::Error(ErrorCell::new(e, step)));
                }
            },
        }
    }
    Outcome::Reduced { data, introduced }
}
