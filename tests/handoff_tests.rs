//! Child-layer hand-off: dispatch order, mutation sequencing, skips, and
//! planner violations.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;

use trellis::{
    Bucket, ChildDispatch, ChildLayerPlan, ChildReason, ConstantStep, ExecError,
    LayerPlanBuilder, RequestContext, Runtime, RuntimeConfig, StepError,
};

fn runtime() -> Runtime {
    Runtime::new(RuntimeConfig::default())
}

fn leaf_plan() -> Arc<trellis::LayerPlan> {
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!("leaf"))), &[])
        .unwrap();
    Arc::new(builder.finish())
}

/// Records `start`/`end` markers per dispatch, with a yield in between so
/// overlapping dispatches would interleave visibly.
struct OrderRecorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl ChildDispatch for OrderRecorder {
    fn dispatch<'a>(
        &'a self,
        _parent: &'a Bucket,
        child: &'a ChildLayerPlan,
        child_index: usize,
    ) -> BoxFuture<'a, Result<(), StepError>> {
        async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("start {child_index} {:?}", child.reason));
            tokio::task::yield_now().await;
            self.log
                .lock()
                .unwrap()
                .push(format!("end {child_index} {:?}", child.reason));
            Ok(())
        }
        .boxed()
    }
}

#[tokio::test]
async fn children_dispatch_in_declared_order_and_mutations_never_overlap() {
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    builder.child(ChildReason::ListItem, leaf_plan());
    builder.child(ChildReason::MutationField, leaf_plan());
    builder.child(ChildReason::MutationField, leaf_plan());
    let plan = Arc::new(builder.finish());

    let log = Arc::new(Mutex::new(Vec::new()));
    let ctx = RequestContext::default()
        .with_child_dispatch(Arc::new(OrderRecorder { log: log.clone() }));

    let (bucket, _) = runtime()
        .execute_request(plan, vec![], 1, &ctx)
        .await
        .unwrap();

    assert!(bucket.is_complete());
    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            "start 0 ListItem",
            "end 0 ListItem",
            "start 1 MutationField",
            "end 1 MutationField",
            "start 2 MutationField",
            "end 2 MutationField",
        ]
    );
}

#[tokio::test]
async fn elsewhere_reasons_are_skipped() {
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    builder.child(ChildReason::Subroutine, leaf_plan());
    builder.child(ChildReason::Subscription, leaf_plan());
    builder.child(ChildReason::Defer, leaf_plan());
    builder.child(ChildReason::Stream, leaf_plan());
    let plan = Arc::new(builder.finish());

    let log = Arc::new(Mutex::new(Vec::new()));
    let ctx = RequestContext::default()
        .with_child_dispatch(Arc::new(OrderRecorder { log: log.clone() }));

    let (bucket, _) = runtime()
        .execute_request(plan, vec![], 1, &ctx)
        .await
        .unwrap();

    assert!(bucket.is_complete());
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_dispatcher_still_completes_the_bucket() {
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    builder.child(ChildReason::ListItem, leaf_plan());
    let plan = Arc::new(builder.finish());

    let ctx = RequestContext::default();
    let (bucket, _) = runtime()
        .execute_request(plan, vec![], 1, &ctx)
        .await
        .unwrap();
    assert!(bucket.is_complete());
}

#[tokio::test]
async fn root_as_child_is_a_planner_violation() {
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    builder.child(ChildReason::Root, leaf_plan());
    let plan = Arc::new(builder.finish());

    let ctx = RequestContext::default();
    let err = runtime()
        .execute_request(plan, vec![], 1, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::RootChild));
}

/// A failing dispatch is the handler's problem: siblings still run and the
/// bucket still completes.
struct FailingDispatch {
    log: Arc<Mutex<Vec<usize>>>,
}

impl ChildDispatch for FailingDispatch {
    fn dispatch<'a>(
        &'a self,
        _parent: &'a Bucket,
        _child: &'a ChildLayerPlan,
        child_index: usize,
    ) -> BoxFuture<'a, Result<(), StepError>> {
        async move {
            self.log.lock().unwrap().push(child_index);
            if child_index == 0 {
                Err(StepError::exec("expansion failed"))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn failed_child_expansion_does_not_poison_siblings() {
    let mut builder = LayerPlanBuilder::new();
    builder
        .add_step(Arc::new(ConstantStep::new(json!(1))), &[])
        .unwrap();
    builder.child(ChildReason::ListItem, leaf_plan());
    builder.child(ChildReason::Polymorphic, leaf_plan());
    let plan = Arc::new(builder.finish());

    let log = Arc::new(Mutex::new(Vec::new()));
    let ctx = RequestContext::default()
        .with_child_dispatch(Arc::new(FailingDispatch { log: log.clone() }));

    let (bucket, _) = runtime()
        .execute_request(plan, vec![], 1, &ctx)
        .await
        .unwrap();

    assert!(bucket.is_complete());
    assert_eq!(*log.lock().unwrap(), vec![0, 1]);
}
