//! Plan assembly: id allocation, reverse edges, start sets, verification,
//! and fingerprints.

use std::sync::Arc;

use serde_json::json;

use trellis::{AccessStep, ConstantStep, LayerPlanBuilder, StepId};

#[test]
fn builder_wires_reverse_edges_and_start_set() {
    let mut builder = LayerPlanBuilder::new();
    let root = builder.root_dependency();
    let a = builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    let b = builder
        .add_step(Arc::new(AccessStep::new("x")), &[root])
        .unwrap();
    let c = builder
        .add_step(Arc::new(AccessStep::new("y")), &[a, b])
        .unwrap();
    let plan = builder.finish();

    // a and b have no intra-layer dependencies (b's input is imported).
    assert_eq!(plan.start_steps(), &[a, b]);
    assert_eq!(plan.root_dependencies(), &[root]);

    assert_eq!(plan.step(a).unwrap().dependents, vec![c]);
    assert_eq!(plan.step(b).unwrap().dependents, vec![c]);
    assert_eq!(plan.step(c).unwrap().dependencies, vec![a, b]);
    assert!(plan.step(c).unwrap().dependents.is_empty());
    assert!(plan.step(root).is_none());

    plan.verify().unwrap();
}

#[test]
fn builder_rejects_unknown_dependencies() {
    let mut builder = LayerPlanBuilder::new();
    let err = builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[StepId::new(42)])
        .unwrap_err();
    assert!(err.to_string().contains("unknown id"));
}

#[test]
fn sync_and_safe_flag_is_captured_from_the_step() {
    let mut builder = LayerPlanBuilder::new();
    let a = builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    let plan = builder.finish();
    assert!(plan.step(a).unwrap().sync_and_safe);
}

#[test]
fn fingerprint_is_stable_and_shape_sensitive() {
    let build = |key: &str| {
        let mut builder = LayerPlanBuilder::new();
        let a = builder
            .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
            .unwrap();
        builder
            .add_step(Arc::new(AccessStep::new(key)), &[a])
            .unwrap();
        builder.finish()
    };

    let one = build("x").fingerprint().unwrap();
    let two = build("x").fingerprint().unwrap();
    assert_eq!(one, two);

    // AccessStep's name does not embed the key, but a different edge shape
    // must change the hash.
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    builder
        .add_step(Arc::new(AccessStep::new("x")), &[])
        .unwrap();
    let flat = builder.finish().fingerprint().unwrap();
    assert_ne!(one, flat);
}
