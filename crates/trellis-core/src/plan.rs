//! Layer plans: the static DAG of steps the executor drives.
//!
//! A layer plan is shared immutable input. The planner assembles it through
//! [`LayerPlanBuilder`], which hands out dense [`StepId`]s, precomputes
//! reverse edges, and yields acyclic graphs by construction (a step may only
//! depend on ids that already exist). Reverse edges are stored as ids into
//! the plan's step table, not live references, so plans stay value-typed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::hash::{hash_serde, Hash256};
use crate::id::StepId;
use crate::step::Step;

/// Why a child layer plan exists, and therefore how its buckets are
/// dispatched once the parent bucket completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
pub enum ChildReason {
    /// Only valid for the topmost plan of a request; a planner that emits
    /// it as a child is broken and the executor fails fast.
    Root,
    ListItem,
    MutationField,
    Polymorphic,
    Subroutine,
    Subscription,
    Defer,
    Stream,
}

impl ChildReason {
    /// Reasons whose buckets are driven by other parts of the runtime;
    /// the bucket executor skips them at hand-off.
    pub fn handled_elsewhere(self) -> bool {
        matches!(
            self,
            ChildReason::Subroutine
                | ChildReason::Subscription
                | ChildReason::Defer
                | ChildReason::Stream
        )
    }

    /// Mutation children must be expanded strictly one-at-a-time in
    /// declared order.
    pub fn sequential(self) -> bool {
        matches!(self, ChildReason::MutationField)
    }
}

/// A successor execution phase, dispatched after the parent bucket's
/// steps have all completed.
#[derive(Clone)]
pub struct ChildLayerPlan {
    pub reason: ChildReason,
    pub plan: Arc<LayerPlan>,
}

impl std::fmt::Debug for ChildLayerPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildLayerPlan")
            .field("reason", &self.reason)
            .field("steps", &self.plan.step_count())
            .finish()
    }
}

/// One step of a layer plan: the executable plus its wiring.
///
/// `dependencies` order is significant (the step sees columns in this
/// order); `dependents` holds the precomputed intra-layer reverse edges.
/// `sync_and_safe` is captured once from the step at plan-build time.
#[derive(Clone)]
pub struct PlanStep {
    pub id: StepId,
    pub op: Arc<dyn Step>,
    pub dependencies: Vec<StepId>,
    pub dependents: Vec<StepId>,
    pub sync_and_safe: bool,
}

impl std::fmt::Debug for PlanStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanStep")
            .field("id", &self.id)
            .field("op", &self.op.name())
            .field("dependencies", &self.dependencies)
            .field("dependents", &self.dependents)
            .field("sync_and_safe", &self.sync_and_safe)
            .finish()
    }
}

/// Static DAG for one execution phase.
pub struct LayerPlan {
    steps: Vec<PlanStep>,
    index: HashMap<StepId, usize>,
    start_steps: Vec<StepId>,
    root_dependencies: Vec<StepId>,
    children: Vec<ChildLayerPlan>,
}

/// Serializable skeleton used for fingerprinting: names and shape only.
#[derive(Serialize)]
struct PlanSkeleton {
    steps: Vec<(String, Vec<usize>, bool)>,
    root_dependencies: Vec<usize>,
    children: Vec<(ChildReason, PlanSkeleton)>,
}

impl LayerPlan {
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn step(&self, id: StepId) -> Option<&PlanStep> {
        self.index.get(&id).map(|&i| &self.steps[i])
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Steps with no intra-layer dependencies; dispatched first.
    pub fn start_steps(&self) -> &[StepId] {
        &self.start_steps
    }

    /// Column ids this plan expects pre-populated by its parent.
    pub fn root_dependencies(&self) -> &[StepId] {
        &self.root_dependencies
    }

    pub fn children(&self) -> &[ChildLayerPlan] {
        &self.children
    }

    /// Stable content hash of the plan shape (names, edges, reasons),
    /// recursing into children.
    pub fn fingerprint(&self) -> Result<Hash256> {
        hash_serde("trellis.layer-plan", &self.skeleton())
    }

    fn skeleton(&self) -> PlanSkeleton {
        PlanSkeleton {
            steps: self
                .steps
                .iter()
                .map(|s| {
                    (
                        s.op.name().to_string(),
                        s.dependencies.iter().map(|d| d.index()).collect(),
                        s.sync_and_safe,
                    )
                })
                .collect(),
            root_dependencies: self.root_dependencies.iter().map(|d| d.index()).collect(),
            children: self
                .children
                .iter()
                .map(|c| (c.reason, c.plan.skeleton()))
                .collect(),
        }
    }

    /// Debug-time invariant checks. Cheap; intended for plan assembly
    /// seams and test harnesses, not per-bucket hot paths.
    pub fn verify(&self) -> Result<()> {
        let is_known = |id: StepId| {
            self.index.contains_key(&id) || self.root_dependencies.contains(&id)
        };
        for (pos, s) in self.steps.iter().enumerate() {
            for d in &s.dependencies {
                if !is_known(*d) {
                    return Err(Error::Plan(format!(
                        "{} depends on unknown id {}",
                        s.id, d
                    )));
                }
                // Intra-layer deps must precede their dependents; the
                // builder guarantees this, so a violation means the plan
                // was assembled by other means.
                if let Some(&di) = self.index.get(d) {
                    if di >= pos {
                        return Err(Error::Plan(format!(
                            "dependency {} does not precede {}",
                            d, s.id
                        )));
                    }
                    if !self.steps[di].dependents.contains(&s.id) {
                        return Err(Error::Plan(format!(
                            "reverse edge {} -> {} missing",
                            d, s.id
                        )));
                    }
                }
            }
            let is_start = s
                .dependencies
                .iter()
                .all(|d| !self.index.contains_key(d));
            if is_start != self.start_steps.contains(&s.id) {
                return Err(Error::Plan(format!(
                    "start-step set disagrees with dependencies of {}",
                    s.id
                )));
            }
            for t in &s.dependents {
                let Some(&ti) = self.index.get(t) else {
                    return Err(Error::Plan(format!(
                        "dependent {} of {} is not a plan step",
                        t, s.id
                    )));
                };
                if !self.steps[ti].dependencies.contains(&s.id) {
                    return Err(Error::Plan(format!(
                        "forward edge {} -> {} missing",
                        s.id, t
                    )));
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for LayerPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerPlan")
            .field("steps", &self.steps)
            .field("start_steps", &self.start_steps)
            .field("root_dependencies", &self.root_dependencies)
            .field("children", &self.children)
            .finish()
    }
}

/// Assembles a [`LayerPlan`], allocating dense ids as it goes.
///
/// Root dependencies (columns imported from the parent layer) and steps
/// share one id space, so a step's `dependencies` may freely mix both.
#[derive(Default)]
pub struct LayerPlanBuilder {
    steps: Vec<PlanStep>,
    index: HashMap<StepId, usize>,
    root_dependencies: Vec<StepId>,
    children: Vec<ChildLayerPlan>,
    next_id: usize,
}

impl LayerPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> StepId {
        let id = StepId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Declare a column this layer receives from its parent; buckets must
    /// be seeded with it before execution.
    pub fn root_dependency(&mut self) -> StepId {
        let id = self.allocate();
        self.root_dependencies.push(id);
        id
    }

    /// Add a step depending (in significant order) on previously created
    /// ids. Unknown ids are rejected, which also keeps the graph acyclic.
    pub fn add_step(&mut self, op: Arc<dyn Step>, dependencies: &[StepId]) -> Result<StepId> {
        for d in dependencies {
            if !self.index.contains_key(d) && !self.root_dependencies.contains(d) {
                return Err(Error::Plan(format!(
                    "step '{}' depends on unknown id {}",
                    op.name(),
                    d
                )));
            }
        }
        let id = self.allocate();
        for d in dependencies {
            if let Some(&di) = self.index.get(d) {
                self.steps[di].dependents.push(id);
            }
        }
        let sync_and_safe = op.is_sync_and_safe();
        self.index.insert(id, self.steps.len());
        self.steps.push(PlanStep {
            id,
            op,
            dependencies: dependencies.to_vec(),
            dependents: Vec::new(),
            sync_and_safe,
        });
        Ok(id)
    }

    /// Attach a child layer plan. Reason semantics (including the fatal
    /// `Root` case) are enforced by the executor at hand-off.
    pub fn child(&mut self, reason: ChildReason, plan: Arc<LayerPlan>) {
        self.children.push(ChildLayerPlan { reason, plan });
    }

    pub fn finish(self) -> LayerPlan {
        let start_steps = self
            .steps
            .iter()
            .filter(|s| s.dependencies.iter().all(|d| !self.index.contains_key(d)))
            .map(|s| s.id)
            .collect();
        LayerPlan {
            steps: self.steps,
            index: self.index,
            start_steps,
            root_dependencies: self.root_dependencies,
            children: self.children,
        }
    }
}
