//! Apply step: per-row functions over the dependency columns, in
//! synchronous, deferred, and whole-batch-failing flavors.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use trellis_core::error::StepError;
use trellis_core::step::{Step, StepExtra, StepOutput};
use trellis_core::value::{Cell, Column, Value};

pub type RowFn = dyn Fn(&[&Value]) -> Result<Value, StepError> + Send + Sync;
pub type DeferredRowFn =
    dyn Fn(&[&Value]) -> BoxFuture<'static, Result<Value, StepError>> + Send + Sync;

enum Body {
    Row(Arc<RowFn>),
    DeferredRow(Arc<DeferredRowFn>),
    Fail(String),
}

/// Applies a function to each row, passing the row's value from every
/// dependency column in declared order. A failing row becomes an in-band
/// error cell for that row only; sibling rows are unaffected.
pub struct ApplyStep {
    name: &'static str,
    body: Body,
    sync_and_safe: bool,
}

impl ApplyStep {
    /// A fallible per-row function. Not sync-and-safe: it may introduce
    /// error cells.
    pub fn new(
        name: &'static str,
        f: impl Fn(&[&Value]) -> Result<Value, StepError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            body: Body::Row(Arc::new(f)),
            sync_and_safe: false,
        }
    }

    /// An infallible per-row function, promising the fast publication path.
    pub fn sync_and_safe(
        name: &'static str,
        f: impl Fn(&[&Value]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            body: Body::Row(Arc::new(move |row| Ok(f(row)))),
            sync_and_safe: true,
        }
    }

    /// A per-row future: the batch settles asynchronously, and a rejected
    /// row stays a row-level error.
    pub fn deferred(
        name: &'static str,
        f: impl Fn(&[&Value]) -> BoxFuture<'static, Result<Value, StepError>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name,
            body: Body::DeferredRow(Arc::new(f)),
            sync_and_safe: false,
        }
    }

    /// Fails the whole batch on every invocation; the executor broadcasts
    /// the failure across all rows.
    pub fn failing(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            body: Body::Fail(message.into()),
            sync_and_safe: false,
        }
    }

    // Error rows are filtered out upstream; treat a stray error datum like
    // a null rather than double-reporting it.
    fn row_args<'c>(deps: &'c [Column], row: usize, null: &'c Value) -> Vec<&'c Value> {
        deps.iter()
            .map(|col| col.get(row).and_then(|d| d.as_value()).unwrap_or(null))
            .collect()
    }
}

impl Step for ApplyStep {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_sync_and_safe(&self) -> bool {
        self.sync_and_safe
    }

    fn execute(&self, deps: &[Column], _extra: &StepExtra) -> Result<StepOutput, StepError> {
        let rows = deps
            .first()
            .ok_or_else(|| StepError::input("apply expects at least one input"))?
            .len();
        let null = Value::Null;

        match &self.body {
            Body::Fail(message) => Err(StepError::exec(message.clone())),
            Body::Row(f) => {
                let mut cells = Vec::with_capacity(rows);
                for row in 0..rows {
                    let args = Self::row_args(deps, row, &null);
                    cells.push(match f(&args) {
                        Ok(v) => Cell::Value(v),
                        Err(e) => Cell::Fail(e),
                    });
                }
                Ok(StepOutput::Ready(cells))
            }
            Body::DeferredRow(f) => {
                let mut pending = Vec::with_capacity(rows);
                for row in 0..rows {
                    let args = Self::row_args(deps, row, &null);
                    pending.push(f(&args));
                }
                Ok(StepOutput::Deferred(
                    async move {
                        let mut cells = Vec::with_capacity(pending.len());
                        for fut in pending {
                            cells.push(match fut.await {
                                Ok(v) => Cell::Value(v),
                                Err(e) => Cell::Fail(e),
                            });
                        }
                        Ok(cells)
                    }
                    .boxed(),
                ))
            }
        }
    }
}
