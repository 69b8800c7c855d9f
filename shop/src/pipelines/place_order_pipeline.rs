// shop/src/pipelines/place_order_pipeline.rs

use crate::errors::{AppError, OrderError, Result as AppResult};
use crate::models::{NewOrder, NewOrderItem};
use crate::pipelines::common_steps::{self, require_unit_of_work};
use crate::pipelines::contexts::PlaceOrderCtxData;
use instashop_flow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl};
use tracing::{event, info, instrument, warn, Level};

/// Builds the order placement pipeline.
///
/// Steps, in order: `validate_order_lines`, `begin_unit_of_work`,
/// `reserve_stock`, `persist_order`, `commit_unit_of_work`. Every step after
/// `begin_unit_of_work` runs inside the same unit of work, so a failure in
/// any of them leaves stock and orders untouched once the caller rolls back.
///
/// # Returns
/// The pipeline, or a `FlowError` if a step name is duplicated.
pub fn build_place_order_pipeline() -> FlowResult<Pipeline<PlaceOrderCtxData, AppError>> {
  let mut p = Pipeline::<PlaceOrderCtxData, AppError>::new(&[
    ("validate_order_lines", false, None),
    ("begin_unit_of_work", false, None),
    ("reserve_stock", false, None),
    ("persist_order", false, None),
    ("commit_unit_of_work", false, None),
  ])?;

  p.on("validate_order_lines", validate_order_lines)?;
  p.on("begin_unit_of_work", common_steps::begin_unit_of_work::<PlaceOrderCtxData>)?;
  p.on("reserve_stock", reserve_stock)?;
  p.on("persist_order", persist_order)?;
  p.on("commit_unit_of_work", common_steps::commit_unit_of_work::<PlaceOrderCtxData>)?;

  Ok(p)
}

pub fn register_place_order_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  flows.register_pipeline(build_place_order_pipeline()?);
  info!("Place-order pipeline registered.");
  Ok(())
}

#[instrument(name = "place_order::validate_order_lines", skip_all, err(Display))]
async fn validate_order_lines(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let lines = ctx_data.read().lines.clone();

  if lines.is_empty() {
    warn!("Order rejected: no lines.");
    return Err(OrderError::EmptyOrder.into());
  }
  if let Some(bad) = lines.iter().find(|line| line.quantity < 1) {
    warn!(product_id = bad.product_id, quantity = bad.quantity, "Order rejected: invalid quantity.");
    return Err(
      OrderError::InvalidQuantity {
        product_id: bad.product_id,
        quantity: bad.quantity,
      }
      .into(),
    );
  }

  event!(Level::DEBUG, line_count = lines.len(), "Order lines validated.");
  Ok(PipelineControl::Continue)
}

/// Locks each product in request order, checks and decrements its stock and
/// records the unit price at this moment.
#[instrument(name = "place_order::reserve_stock", skip_all, err(Display))]
async fn reserve_stock(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let lines = ctx_data.read().lines.clone();
  let uow = require_unit_of_work(&ctx_data)?;
  let mut uow = uow.lock().await;

  let mut reserved = Vec::with_capacity(lines.len());
  let mut total: i64 = 0;

  for line in &lines {
    let product = uow
      .find_product_for_update(line.product_id)
      .await?
      .ok_or(OrderError::ProductNotFound {
        product_id: line.product_id,
      })?;

    let insufficient = OrderError::InsufficientStock {
      product_id: product.id,
      requested: line.quantity,
      available: product.stock,
    };
    if product.stock < line.quantity {
      warn!(product_id = product.id, requested = line.quantity, available = product.stock, "Insufficient stock.");
      return Err(insufficient.into());
    }

    let subtotal = product
      .price_cents
      .checked_mul(i64::from(line.quantity))
      .ok_or_else(|| AppError::Internal(format!("subtotal overflow for product {}", product.id)))?;
    total = total
      .checked_add(subtotal)
      .ok_or_else(|| AppError::Internal("order total overflow".to_string()))?;

    if !uow.decrease_stock(product.id, line.quantity).await? {
      warn!(product_id = product.id, "Conditional stock decrement refused.");
      return Err(insufficient.into());
    }

    event!(Level::DEBUG, product_id = product.id, quantity = line.quantity, price_cents = product.price_cents, "Stock reserved.");
    reserved.push(NewOrderItem {
      product_id: product.id,
      quantity: line.quantity,
      price_cents: product.price_cents,
    });
  }
  drop(uow);

  let mut guard = ctx_data.write();
  guard.reserved = reserved;
  guard.total_price_cents = total;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "place_order::persist_order", skip_all, err(Display))]
async fn persist_order(ctx_data: ContextData<PlaceOrderCtxData>) -> AppResult<PipelineControl> {
  let new_order = {
    let guard = ctx_data.read();
    NewOrder {
      user_id: guard.user_id,
      total_price_cents: guard.total_price_cents,
      items: guard.reserved.clone(),
    }
  };
  if new_order.items.is_empty() {
    return Err(AppError::Internal("no reserved lines to persist".to_string()));
  }

  let uow = require_unit_of_work(&ctx_data)?;
  let order = uow.lock().await.create_order_with_items(new_order).await?;

  info!(order_id = order.id, user_id = order.user_id, total_price_cents = order.total_price_cents, "Order persisted.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn steps_are_declared_in_workflow_order() {
    let p = build_place_order_pipeline().expect("pipeline builds");
    assert_eq!(
      p.step_names(),
      vec![
        "validate_order_lines",
        "begin_unit_of_work",
        "reserve_stock",
        "persist_order",
        "commit_unit_of_work"
      ]
    );
  }
}
