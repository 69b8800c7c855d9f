// shop/src/pipelines/complete_order_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CompleteOrderCtxData;
use instashop_flow::{FlowRegistry, FlowResult, Pipeline};
use tracing::info;

/// Administrative Pending -> Completed transition. No stock changes.
pub fn build_complete_order_pipeline() -> FlowResult<Pipeline<CompleteOrderCtxData, AppError>> {
  let mut p = Pipeline::<CompleteOrderCtxData, AppError>::new(&[
    ("begin_unit_of_work", false, None),
    ("load_order_for_update", false, None),
    ("ensure_order_pending", false, None),
    ("apply_status_transition", false, None),
    ("commit_unit_of_work", false, None),
  ])?;

  p.on("begin_unit_of_work", common_steps::begin_unit_of_work::<CompleteOrderCtxData>)?;
  p.on("load_order_for_update", common_steps::load_order_for_update::<CompleteOrderCtxData>)?;
  p.on("ensure_order_pending", common_steps::ensure_order_pending::<CompleteOrderCtxData>)?;
  p.on("apply_status_transition", common_steps::apply_status_transition::<CompleteOrderCtxData>)?;
  p.on("commit_unit_of_work", common_steps::commit_unit_of_work::<CompleteOrderCtxData>)?;

  Ok(p)
}

pub fn register_complete_order_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  flows.register_pipeline(build_complete_order_pipeline()?);
  info!("Complete-order pipeline registered.");
  Ok(())
}
