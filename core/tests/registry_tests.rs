// tests/registry_tests.rs
mod common;

use common::*;
use instashop_flow::{ContextData, FlowError, FlowRegistry, Pipeline, PipelineControl, PipelineResult};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RegistryContextAlpha {
  val: String,
}
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RegistryContextBeta {
  num: i32,
}

#[tokio::test]
async fn test_registry_runs_pipeline_for_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut p_alpha = Pipeline::<RegistryContextAlpha, TestError>::new(&[("alpha_task", false, None)]).unwrap();
  p_alpha
    .on("alpha_task", |ctx: ContextData<RegistryContextAlpha>| async move {
      ctx.write().val = "alpha_processed".to_string();
      Ok::<_, TestError>(PipelineControl::Continue)
    })
    .unwrap();
  registry.register_pipeline(p_alpha);

  let mut p_beta = Pipeline::<RegistryContextBeta, TestError>::new(&[("beta_task", false, None)]).unwrap();
  p_beta
    .on("beta_task", |ctx: ContextData<RegistryContextBeta>| async move {
      ctx.write().num = 100;
      Ok::<_, TestError>(PipelineControl::Continue)
    })
    .unwrap();
  registry.register_pipeline(p_beta);

  assert!(registry.is_registered::<RegistryContextAlpha>());
  assert!(registry.is_registered::<RegistryContextBeta>());

  let ctx_alpha = ContextData::new(RegistryContextAlpha::default());
  assert_eq!(registry.run(ctx_alpha.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_alpha.read().val, "alpha_processed");

  let ctx_beta = ContextData::new(RegistryContextBeta::default());
  assert_eq!(registry.run(ctx_beta.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_beta.read().num, 100);
}

#[tokio::test]
async fn test_registry_pipeline_not_registered() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  #[derive(Debug, Default)]
  struct UnregisteredContext;

  assert!(!registry.is_registered::<UnregisteredContext>());
  match registry.run(ContextData::new(UnregisteredContext)).await {
    Err(TestError::Flow(s)) => {
      assert!(s.contains("PipelineNotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected PipelineNotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_returns_pipeline_errors_unchanged() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut p_alpha = Pipeline::<RegistryContextAlpha, TestError>::new(&[("alpha_fail", false, None)]).unwrap();
  p_alpha
    .on("alpha_fail", |_ctx: ContextData<RegistryContextAlpha>| async move {
      Err::<PipelineControl, _>(TestError::Handler("Alpha pipeline failed".to_string()))
    })
    .unwrap();
  registry.register_pipeline(p_alpha);

  let result = registry.run(ContextData::new(RegistryContextAlpha::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("Alpha pipeline failed".to_string()));
}

#[tokio::test]
async fn test_registry_with_default_flow_error() {
  setup_tracing();
  let registry: FlowRegistry = FlowRegistry::default();

  let mut first = Pipeline::<RegistryContextBeta, FlowError>::new(&[("task", false, None)]).unwrap();
  first
    .on("task", |ctx: ContextData<RegistryContextBeta>| async move {
      ctx.write().num = 1;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
    .unwrap();
  registry.register_pipeline(first);

  let mut replacement = Pipeline::<RegistryContextBeta, FlowError>::new(&[("task", false, None)]).unwrap();
  replacement
    .on("task", |ctx: ContextData<RegistryContextBeta>| async move {
      ctx.write().num = 2;
      Ok::<_, FlowError>(PipelineControl::Continue)
    })
    .unwrap();
  registry.register_pipeline(replacement);

  let ctx = ContextData::new(RegistryContextBeta::default());
  registry.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().num, 2);
}
