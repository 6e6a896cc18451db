#![allow(dead_code)]
//! Shared steps and helpers for the integration suites.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use serde_json::Value;

use trellis::{Cell, Column, Datum, Step, StepError, StepExtra, StepOutput};

/// Turn a slice of JSON values into a column.
pub fn values_col(vals: &[Value]) -> Column {
    Column::of_values(vals.to_vec())
}

/// Unwrap a column of plain values; panics if an error cell sneaks in.
pub fn col_values(col: &Column) -> Vec<Value> {
    col.iter()
        .map(|d| match d {
            Datum::Value(v) => v.clone(),
            Datum::Error(e) => panic!("unexpected error cell: {e}"),
        })
        .collect()
}

/// Whole-batch asynchronous step resolving to fixed values.
pub struct DeferredValuesStep {
    pub values: Vec<Value>,
}

impl Step for DeferredValuesStep {
    fn name(&self) -> &'static str {
        "deferred-values"
    }

    fn execute(&self, _deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let values = self.values.clone();
        Ok(StepOutput::Deferred(
            async move {
                tokio::task::yield_now().await;
                Ok(values.into_iter().map(Cell::Value).collect())
            }
            .boxed(),
        ))
    }
}

/// Step whose deferred batch rejects wholesale.
pub struct RejectStep;

impl Step for RejectStep {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn execute(&self, _deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        Ok(StepOutput::Deferred(
            async move {
                tokio::task::yield_now().await;
                Err(StepError::exec("late boom"))
            }
            .boxed(),
        ))
    }
}

/// Step emitting a mixed column: per-row values, per-row futures, and a
/// rejecting future, to exercise positional reduction.
pub struct MixedCellsStep;

impl Step for MixedCellsStep {
    fn name(&self) -> &'static str {
        "mixed-cells"
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let rows = deps[0].len();
        let cells = (0..rows)
            .map(|row| match row % 3 {
                0 => Cell::Value(Value::from(row)),
                1 => Cell::Deferred(
                    async move {
                        tokio::task::yield_now().await;
                        Ok(Value::from(row * 10))
                    }
                    .boxed(),
                ),
                _ => Cell::Deferred(
                    async move {
                        tokio::task::yield_now().await;
                        Err(StepError::exec(format!("row {row} failed")))
                    }
                    .boxed(),
                ),
            })
            .collect();
        Ok(StepOutput::Ready(cells))
    }
}

/// Step returning the wrong number of cells.
pub struct BadLengthStep;

impl Step for BadLengthStep {
    fn name(&self) -> &'static str {
        "bad-length"
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let rows = deps[0].len();
        Ok(StepOutput::values(vec![Value::Null; rows + 1]))
    }
}

/// Claims the fast path but breaks the promise in a configurable way.
pub struct LyingSyncSafeStep {
    /// true: returns a deferred batch; false: returns a fresh error cell.
    pub defer: bool,
}

impl Step for LyingSyncSafeStep {
    fn name(&self) -> &'static str {
        "lying-sync-safe"
    }

    fn is_sync_and_safe(&self) -> bool {
        true
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let rows = deps[0].len();
        if self.defer {
            Ok(StepOutput::Deferred(
                async move { Ok((0..rows).map(|_| Cell::null()).collect()) }.boxed(),
            ))
        } else {
            let mut cells: Vec<Cell> =
                (0..rows.saturating_sub(1)).map(|_| Cell::null()).collect();
            cells.push(Cell::Fail(StepError::exec("not so safe")));
            Ok(StepOutput::Ready(cells))
        }
    }
}

/// Wraps another step, counting invocations and recording the dependency
/// columns each invocation saw.
pub struct Spy {
    inner: Arc<dyn Step>,
    pub invocations: Arc<AtomicUsize>,
    pub seen: Arc<Mutex<Vec<Vec<Column>>>>,
}

impl Spy {
    pub fn wrap(inner: Arc<dyn Step>) -> Self {
        Self {
            inner,
            invocations: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handles(&self) -> (Arc<AtomicUsize>, Arc<Mutex<Vec<Vec<Column>>>>) {
        (self.invocations.clone(), self.seen.clone())
    }
}

impl Step for Spy {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn is_sync_and_safe(&self) -> bool {
        self.inner.is_sync_and_safe()
    }

    fn execute(&self, deps: &[Column], extra: &StepExtra) -> Result<StepOutput, StepError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(deps.to_vec());
        self.inner.execute(deps, extra)
    }
}
