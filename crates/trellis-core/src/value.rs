//! Column values, in-band error cells, and the shared column type.
//!
//! Execution moves batches of JSON-shaped values through step outputs.
//! Failures travel through the same columns as ordinary data: an
//! [`ErrorCell`] wraps the original [`StepError`] plus the step it
//! originated at, and [`Datum::Error`] is the *only* discriminator by
//! which error-ness is decided. The constructor lives here and nowhere
//! else; user data cannot mimic an error cell by structural accident.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::StepError;
use crate::id::StepId;

/// The user-visible datum type flowing through columns.
pub type Value = serde_json::Value;

/// An in-band error value: the original failure plus where it originated.
///
/// Cloning shares the underlying error, so re-injecting the same cell at
/// many row positions is cheap and preserves identity for diagnostics.
#[derive(Clone)]
pub struct ErrorCell {
    source: Arc<StepError>,
    origin: StepId,
}

impl ErrorCell {
    /// The one constructor. Downstream code tags failures with the id of
    /// the step that produced them; consumers unwrap via [`Self::original`].
    pub fn new(source: StepError, origin: StepId) -> Self {
        Self {
            source: Arc::new(source),
            origin,
        }
    }

    /// The original error, preserved for the resolver boundary.
    pub fn original(&self) -> &StepError {
        &self.source
    }

    /// The step at which this error originated.
    pub fn origin(&self) -> StepId {
        self.origin
    }
}

impl fmt::Debug for ErrorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorCell")
            .field("origin", &self.origin)
            .field("source", &self.source.to_string())
            .finish()
    }
}

impl fmt::Display for ErrorCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error at {}: {}", self.origin, self.source)
    }
}

impl PartialEq for ErrorCell {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.source.to_string() == other.source.to_string()
    }
}

/// A materialized column entry: a plain value or an in-band error.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Value(Value),
    Error(ErrorCell),
}

impl Datum {
    pub fn is_error(&self) -> bool {
        matches!(self, Datum::Error(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Datum::Value(v) => Some(v),
            Datum::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorCell> {
        match self {
            Datum::Value(_) => None,
            Datum::Error(e) => Some(e),
        }
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        Datum::Value(v)
    }
}

/// A deferred column entry, resolved by the executor's reduction pass.
pub type CellFuture = BoxFuture<'static, std::result::Result<Value, StepError>>;

/// A raw step-output entry. Steps may emit values, existing error cells,
/// fresh row-level failures, or per-row futures; the executor reduces
/// these to [`Datum`]s before publication.
pub enum Cell {
    Value(Value),
    /// Re-emit an error cell as-is (origin preserved).
    Error(ErrorCell),
    /// A fresh row-level failure; the executor tags it with the id of the
    /// step that produced it.
    Fail(StepError),
    Deferred(CellFuture),
}

impl Cell {
    pub fn null() -> Self {
        Cell::Value(Value::Null)
    }
}

impl From<Value> for Cell {
    fn from(v: Value) -> Self {
        Cell::Value(v)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Cell::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Cell::Fail(e) => f.debug_tuple("Fail").field(e).finish(),
            Cell::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A published column: an immutable, shared, ordered sequence of data.
///
/// Columns are written exactly once per step and read by every dependent;
/// cloning is an `Arc` bump, and row indices preserve row identity across
/// the whole pipeline.
#[derive(Debug, Clone)]
pub struct Column {
    data: Arc<Vec<Datum>>,
}

impl Column {
    pub fn new(data: Vec<Datum>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    /// Build a column of plain values.
    pub fn of_values(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(Datum::Value).collect())
    }

    /// A column of `len` placeholder units, handed to steps with no
    /// dependencies so they still see a batch of the correct shape.
    pub fn unit(len: usize) -> Self {
        Self::new(vec![Datum::Value(Value::Null); len])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Datum> {
        self.data.get(row)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Datum> {
        self.data.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.data.iter().any(Datum::is_error)
    }
}

impl FromIterator<Datum> for Column {
    fn from_iter<I: IntoIterator<Item = Datum>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
