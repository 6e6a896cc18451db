//! Error-aware invocation helpers.
//!
//! Once a bucket carries errors, steps must not be re-invoked on rows whose
//! inputs already failed: those rows' outputs are defined to be the same
//! upstream error. The scheduler composes the three helpers here — scan the
//! dependency columns for errored rows, filter those rows out of every
//! column, and merge the step's reduced output back positionally so row
//! identity survives the round trip.

use std::collections::BTreeMap;

use trellis_core::id::StepId;
use trellis_core::value::{Column, Datum, ErrorCell};

use crate::error::ExecError;

/// Row index → the first error seen at that index, scanning dependency
/// columns in declared order.
pub type ErrorMap = BTreeMap<usize, ErrorCell>;

/// Scan dependency columns for errored rows. Iterating columns in declared
/// order and keeping the first hit per row makes the winner deterministic.
pub fn scan_errors(deps: &[Column]) -> ErrorMap {
    let mut errors = ErrorMap::new();
    for col in deps {
        for (row, datum) in col.iter().enumerate() {
            if let Datum::Error(e) = datum {
                errors.entry(row).or_insert_with(|| e.clone());
            }
        }
    }
    errors
}

/// Drop errored rows out of every dependency column, preserving order.
/// Each resulting column has `len - errors.len()` rows.
pub fn filter_deps(deps: &[Column], errors: &ErrorMap) -> Vec<Column> {
    deps.iter()
        .map(|col| {
            col.iter()
                .enumerate()
                .filter(|(row, _)| !errors.contains_key(row))
                .map(|(_, datum)| datum.clone())
                .collect()
        })
        .collect()
}

/// Positionally merge a reduced output of `size - errors.len()` rows back
/// to full size: errored rows keep their upstream error, every other row
/// takes the next unconsumed reduced entry.
pub fn merge_back(
    step: StepId,
    size: usize,
    errors: &ErrorMap,
    reduced: Vec<Datum>,
) -> Result<Vec<Datum>, ExecError> {
    if reduced.len() + errors.len() != size {
        return Err(ExecError::ColumnShape {
            step,
            expected: size - errors.len().min(size),
            actual: reduced.len(),
        });
    }
    let mut out = Vec::with_capacity(size);
    let mut rest = reduced.into_iter();
    for row in 0..size {
        match errors.get(&row) {
            Some(e) => out.push(Datum::Error(e.clone())),
            None => out.push(rest.next().ok_or_else(|| {
                ExecError::Invariant("reduced output exhausted before merge completed".into())
            })?),
        }
    }
    debug_assert!(rest.next().is_none(), "reduced output not fully consumed");
    Ok(out)
}
