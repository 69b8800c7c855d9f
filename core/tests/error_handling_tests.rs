// tests/error_handling_tests.rs
mod common;

use common::*;
use instashop_flow::{ContextData, FlowError, Pipeline, PipelineControl};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_pipeline_run_catches_handler_missing() {
  setup_tracing();
  let pipeline = Pipeline::<TestContext, TestError>::new(&[("missing", false, None)]).unwrap();
  let result = pipeline.run(ContextData::new(TestContext::default())).await;
  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected TestError::Flow(HandlerMissing), got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_pipeline_with_flow_error_type() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("fail_task", false, None)]).unwrap();
  pipeline
    .on("fail_task", |_ctx: ContextData<TestContext>| async move {
      Err::<PipelineControl, _>(FlowError::Internal("Intentional flow error".to_string()))
    })
    .unwrap();

  match pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err() {
    FlowError::Internal(s) => assert_eq!(s, "Intentional flow error"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_anyhow_handler_errors_convert_into_flow_error() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, FlowError>::new(&[("io", false, None)]).unwrap();
  pipeline
    .on("io", |_ctx: ContextData<TestContext>| async move {
      Err::<PipelineControl, _>(anyhow::anyhow!("connection reset"))
    })
    .unwrap();

  let err = pipeline.run(ContextData::new(TestContext::default())).await.unwrap_err();
  assert!(matches!(err, FlowError::HandlerError { .. }));
  assert!(err.to_string().contains("connection reset"));
}
