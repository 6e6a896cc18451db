//! Buckets: the mutable columnar batches a layer plan executes over.

use std::collections::HashMap;
use std::sync::Arc;

use trellis_core::id::{BucketId, StepId};
use trellis_core::plan::LayerPlan;
use trellis_core::value::Column;

use crate::error::ExecError;

/// A batch of `size` rows being driven through one layer plan.
///
/// The store is single-writer (the scheduler) and append-only: a column is
/// published at most once per step id and never mutated afterwards.
/// `has_errors` is monotonic; it never resets for the bucket's lifetime.
pub struct Bucket {
    id: BucketId,
    size: usize,
    plan: Arc<LayerPlan>,
    store: HashMap<StepId, Column>,
    no_deps_list: Column,
    has_errors: bool,
    is_complete: bool,
}

impl Bucket {
    /// Create a bucket seeded with the columns its plan imports from the
    /// parent layer. Every declared root dependency must be present with
    /// exactly `size` rows; anything else is rejected up front.
    ///
    /// If a seeded column already carries error cells, the bucket starts
    /// in the errored state so dependent steps get the filtering path.
    pub fn new(
        id: BucketId,
        plan: Arc<LayerPlan>,
        roots: Vec<(StepId, Column)>,
        size: usize,
    ) -> Result<Self, ExecError> {
        let mut store = HashMap::with_capacity(plan.step_count() + roots.len());
        let mut has_errors = false;
        for (dep, column) in roots {
            if !plan.root_dependencies().contains(&dep) || column.len() != size {
                return Err(ExecError::BadRootColumn { dep });
            }
            has_errors |= column.has_errors();
            store.insert(dep, column);
        }
        for dep in plan.root_dependencies() {
            if !store.contains_key(dep) {
                return Err(ExecError::BadRootColumn { dep: *dep });
            }
        }
        Ok(Self {
            id,
            size,
            plan,
            store,
            no_deps_list: Column::unit(size),
            has_errors,
            is_complete: false,
        })
    }

    pub fn id(&self) -> BucketId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn plan(&self) -> &Arc<LayerPlan> {
        &self.plan
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    /// The published column for a step (or seeded root dependency), if it
    /// has materialized yet.
    pub fn column(&self, id: StepId) -> Option<&Column> {
        self.store.get(&id)
    }

    /// Placeholder batch handed to zero-dependency steps.
    pub(crate) fn no_deps_list(&self) -> Column {
        self.no_deps_list.clone()
    }

    pub(crate) fn publish(&mut self, id: StepId, column: Column) {
        debug_assert!(!self.store.contains_key(&id), "column published twice");
        self.store.insert(id, column);
    }

    pub(crate) fn mark_errors(&mut self) {
        self.has_errors = true;
    }

    pub(crate) fn mark_complete(&mut self) {
        self.is_complete = true;
    }
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bucket")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("columns", &self.store.len())
            .field("has_errors", &self.has_errors)
            .field("is_complete", &self.is_complete)
            .finish()
    }
}
