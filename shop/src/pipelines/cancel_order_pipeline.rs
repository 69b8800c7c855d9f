// shop/src/pipelines/cancel_order_pipeline.rs

use crate::errors::{AppError, OrderError, Result as AppResult};
use crate::pipelines::common_steps::{self, require_unit_of_work};
use crate::pipelines::contexts::CancelOrderCtxData;
use instashop_flow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{event, info, instrument, warn, Level};

/// Builds the cancel pipeline. `restock_order_items` is skipped when the
/// context says restocking is off; the status transition always runs last
/// before the commit.
pub fn build_cancel_order_pipeline() -> FlowResult<Pipeline<CancelOrderCtxData, AppError>> {
  let restock_disabled: SkipCondition<CancelOrderCtxData> =
    Arc::new(|ctx_data: ContextData<CancelOrderCtxData>| {
      let restock = ctx_data.read().restock_on_cancel;
      !restock
    });

  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(&[
    ("begin_unit_of_work", false, None),
    ("load_order_for_update", false, None),
    ("authorize_order_owner", false, None),
    ("ensure_order_pending", false, None),
    ("restock_order_items", false, Some(restock_disabled)),
    ("apply_status_transition", false, None),
    ("commit_unit_of_work", false, None),
  ])?;

  p.on("begin_unit_of_work", common_steps::begin_unit_of_work::<CancelOrderCtxData>)?;
  p.on("load_order_for_update", common_steps::load_order_for_update::<CancelOrderCtxData>)?;
  p.on("authorize_order_owner", authorize_order_owner)?;
  p.on("ensure_order_pending", common_steps::ensure_order_pending::<CancelOrderCtxData>)?;
  p.on("restock_order_items", restock_order_items)?;
  p.on("apply_status_transition", common_steps::apply_status_transition::<CancelOrderCtxData>)?;
  p.on("commit_unit_of_work", common_steps::commit_unit_of_work::<CancelOrderCtxData>)?;

  Ok(p)
}

pub fn register_cancel_order_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  flows.register_pipeline(build_cancel_order_pipeline()?);
  info!("Cancel-order pipeline registered.");
  Ok(())
}

#[instrument(name = "cancel_order::authorize_order_owner", skip_all, err(Display))]
async fn authorize_order_owner(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let order = guard
    .order
    .as_ref()
    .ok_or_else(|| AppError::Internal("order missing from pipeline context".to_string()))?;

  if order.user_id != guard.requesting_user_id {
    warn!(order_id = order.id, owner = order.user_id, requester = guard.requesting_user_id, "Cancel refused: not the owner.");
    return Err(OrderError::Unauthorized { order_id: order.id }.into());
  }
  Ok(PipelineControl::Continue)
}

/// Puts every item's quantity back on its product. Products deleted since
/// the order was placed are skipped.
#[instrument(name = "cancel_order::restock_order_items", skip_all, err(Display))]
async fn restock_order_items(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let items = ctx_data
    .read()
    .order
    .as_ref()
    .map(|order| order.items.clone())
    .ok_or_else(|| AppError::Internal("order missing from pipeline context".to_string()))?;

  let uow = require_unit_of_work(&ctx_data)?;
  let mut uow = uow.lock().await;
  let mut restocked: i64 = 0;

  for item in &items {
    if uow.increase_stock(item.product_id, item.quantity).await? {
      restocked += i64::from(item.quantity);
      event!(Level::DEBUG, product_id = item.product_id, quantity = item.quantity, "Stock restored.");
    } else {
      warn!(product_id = item.product_id, order_id = item.order_id, "Product no longer exists; not restocked.");
    }
  }
  drop(uow);

  ctx_data.write().restocked_units = restocked;
  Ok(PipelineControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn restock_runs_between_state_check_and_transition() {
    let p = build_cancel_order_pipeline().expect("pipeline builds");
    let names = p.step_names();
    let pos = |name: &str| names.iter().position(|n| *n == name).expect("step exists");
    assert!(pos("ensure_order_pending") < pos("restock_order_items"));
    assert!(pos("restock_order_items") < pos("apply_status_transition"));
  }
}
