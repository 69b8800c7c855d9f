// tests/pipeline_execution_tests.rs
mod common;

use common::*;
use instashop_flow::{ContextData, FlowError, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use serial_test::serial;
use std::sync::Arc;

fn three_step_pipeline() -> Pipeline<TestContext, TestError> {
  let mut pipeline =
    Pipeline::<TestContext, TestError>::new(&[("step1", false, None), ("step2", false, None), ("step3", false, None)])
      .unwrap();
  pipeline.on("step1", create_simple_handler("step1", " S1")).unwrap();
  pipeline.on("step2", create_simple_handler("step2", " S2")).unwrap();
  pipeline.on("step3", create_simple_handler("step3", " S3")).unwrap();
  pipeline
}

#[tokio::test]
#[serial]
async fn test_pipeline_runs_steps_in_order() {
  setup_tracing();
  let pipeline = three_step_pipeline();

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_stops_on_pipeline_control_stop() {
  setup_tracing();
  let pipeline = three_step_pipeline();

  let ctx = ContextData::new(TestContext {
    should_stop_at: Some("step2".to_string()),
    ..Default::default()
  });
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  let guard = ctx.read();
  assert_eq!(guard.counter, 2);
  assert_eq!(guard.steps_executed, vec!["step1", "step2"]);
}

#[tokio::test]
#[serial]
async fn test_stop_in_before_skips_rest_of_step() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("guarded", false, None), ("next", false, None)]).unwrap();
  pipeline
    .before("guarded", |ctx: ContextData<TestContext>| async move {
      ctx.write().steps_executed.push("guard".to_string());
      Ok::<_, TestError>(PipelineControl::Stop)
    })
    .unwrap();
  pipeline.on("guarded", create_simple_handler("guarded_on", "X")).unwrap();
  pipeline.on("next", create_simple_handler("next", "Y")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Stopped);
  assert_eq!(ctx.read().steps_executed, vec!["guard"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_propagates_handler_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("good_step", false, None),
    ("bad_step", false, None),
    ("another_step", false, None),
  ])
  .unwrap();

  pipeline.on("good_step", create_simple_handler("good_step", "Good")).unwrap();
  pipeline.on("bad_step", create_failing_handler("bad_step", "I am a bad step!")).unwrap();
  pipeline.on("another_step", create_simple_handler("another_step", "NeverRun")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  let result = pipeline.run(ctx.clone()).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("I am a bad step!".to_string()));
  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_error_in_on_prevents_after_handlers() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("work", false, None)]).unwrap();
  pipeline.on("work", create_failing_handler("work", "boom")).unwrap();
  pipeline.after("work", create_simple_handler("cleanup", "C")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert!(pipeline.run(ctx.clone()).await.is_err());
  assert_eq!(ctx.read().steps_executed, vec!["work"]);
}

#[tokio::test]
#[serial]
async fn test_pipeline_skips_step_if_condition_met() {
  setup_tracing();
  let skip_when_counted: SkipCondition<TestContext> = Arc::new(|ctx: ContextData<TestContext>| ctx.read().counter > 0);
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[
    ("step1", false, None),
    ("step_to_skip", false, Some(skip_when_counted)),
    ("step3", false, None),
  ])
  .unwrap();

  pipeline.on("step1", create_simple_handler("step1", " S1")).unwrap();
  pipeline.on("step_to_skip", create_simple_handler("step_to_skip", " SKIPPED")).unwrap();
  pipeline.on("step3", create_simple_handler("step3", " S3")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);

  let guard = ctx.read();
  assert_eq!(guard.message, " S1 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_optional_step_missing_handler_succeeds() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("optional_step_no_handler", true, None)]).unwrap();

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx).await.unwrap(), PipelineResult::Completed);
}

#[tokio::test]
#[serial]
async fn test_before_on_after_execution_order() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("main_step", false, None)]).unwrap();

  pipeline.after("main_step", create_simple_handler("after_main", "After;")).unwrap();
  pipeline.on("main_step", create_simple_handler("on_main", "On;")).unwrap();
  pipeline.before("main_step", create_simple_handler("before_main", "Before;")).unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();

  let guard = ctx.read();
  assert_eq!(guard.message, "Before;On;After;");
  assert_eq!(guard.steps_executed, vec!["before_main", "on_main", "after_main"]);
}

#[tokio::test]
#[serial]
async fn test_inserted_steps_run_at_their_position() {
  setup_tracing();
  let mut pipeline = three_step_pipeline();
  pipeline.insert_before_step("step2", "audit", false, None).unwrap();
  pipeline.insert_after_step("step3", "notify", true, None).unwrap();
  pipeline.on("audit", create_simple_handler("audit", " A")).unwrap();

  assert_eq!(pipeline.step_names(), vec!["step1", "audit", "step2", "step3", "notify"]);

  let ctx = ContextData::new(TestContext::default());
  assert_eq!(pipeline.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx.read().message, " S1 A S2 S3");
}

#[tokio::test]
#[serial]
async fn test_removed_step_and_handlers_do_not_run() {
  setup_tracing();
  let mut pipeline = three_step_pipeline();
  pipeline.remove_step("step2").unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().steps_executed, vec!["step1", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_skip_condition_can_be_changed_after_construction() {
  setup_tracing();
  let mut pipeline = three_step_pipeline();
  pipeline
    .set_skip_condition("step3", Some(Arc::new(|_ctx: ContextData<TestContext>| true)))
    .unwrap();

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().steps_executed, vec!["step1", "step2"]);

  pipeline.set_skip_condition("step3", None).unwrap();
  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_set_optional_turns_missing_handler_into_skip() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("later", false, None)]).unwrap();
  assert!(pipeline.run(ContextData::new(TestContext::default())).await.is_err());

  pipeline.set_optional("later", true).unwrap();
  assert_eq!(
    pipeline.run(ContextData::new(TestContext::default())).await.unwrap(),
    PipelineResult::Completed
  );
}

#[test]
fn test_structural_operations_reject_unknown_or_duplicate_steps() {
  let duplicate = Pipeline::<TestContext, TestError>::new(&[("a", false, None), ("a", false, None)]);
  assert!(matches!(duplicate, Err(FlowError::DuplicateStep { step_name }) if step_name == "a"));

  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("a", false, None)]).unwrap();
  assert!(matches!(
    pipeline.insert_after_step("missing", "b", false, None),
    Err(FlowError::StepNotFound { .. })
  ));
  assert!(matches!(
    pipeline.insert_before_step("a", "a", false, None),
    Err(FlowError::DuplicateStep { .. })
  ));
  assert!(matches!(pipeline.remove_step("missing"), Err(FlowError::StepNotFound { .. })));
  assert!(matches!(
    pipeline.on("missing", create_simple_handler("missing", "")),
    Err(FlowError::StepNotFound { step_name }) if step_name == "missing"
  ));
  assert_eq!(pipeline.step_names(), vec!["a"]);
}
