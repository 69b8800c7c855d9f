// shop/src/services/order_service.rs

//! Order placement and lifecycle. Every mutating call runs one pipeline
//! inside one unit of work.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Order, OrderLine, OrderSummary};
use crate::pipelines::common_steps::release_unit_of_work;
use crate::pipelines::contexts::{CancelOrderCtxData, CompleteOrderCtxData, PlaceOrderCtxData, UnitOfWorkCtx};
use crate::store::Stores;
use instashop_flow::{ContextData, FlowRegistry, PipelineResult};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Behavior switches of the order workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderPolicy {
  /// Put an order's quantities back on stock when it is cancelled.
  pub restock_on_cancel: bool,
}

impl Default for OrderPolicy {
  fn default() -> Self {
    Self { restock_on_cancel: true }
  }
}

#[derive(Clone)]
pub struct OrderService {
  flows: Arc<FlowRegistry<AppError>>,
  stores: Stores,
  policy: OrderPolicy,
}

impl OrderService {
  pub fn new(flows: Arc<FlowRegistry<AppError>>, stores: Stores, policy: OrderPolicy) -> Self {
    Self { flows, stores, policy }
  }

  /// Prices the lines, reserves their stock and persists a pending order.
  /// Either all of it happens or none of it does.
  ///
  /// # Arguments
  /// * `user_id`: The buyer. The order is owned by this user.
  /// * `lines`: Product and quantity pairs, reserved in the given order.
  ///
  /// # Returns
  /// The stored order with its items and their price snapshots.
  ///
  /// # Errors
  /// An `OrderError` for an empty order, a non-positive quantity, an unknown
  /// product or insufficient stock. The first failing line decides which.
  /// Store failures are `Internal`. Stock is untouched on every error.
  #[instrument(name = "OrderService::place_order", skip(self, lines), fields(line_count = lines.len()), err(Display))]
  pub async fn place_order(&self, user_id: i64, lines: Vec<OrderLine>) -> AppResult<Order> {
    let ctx_data = ContextData::new(PlaceOrderCtxData::new(self.stores.clone(), user_id, lines));
    self.run_in_unit_of_work(&ctx_data).await?;

    let order = ctx_data.write().order.take();
    let order = order.ok_or_else(|| AppError::Internal("order missing after placement".to_string()))?;
    info!(order_id = order.id, total_price_cents = order.total_price_cents, "Order placed.");
    Ok(order)
  }

  /// All orders of `user_id` with their items, oldest first.
  #[instrument(name = "OrderService::list_orders", skip(self), err(Display))]
  pub async fn list_orders(&self, user_id: i64) -> AppResult<Vec<OrderSummary>> {
    let orders = self.stores.orders.find_by_owner(user_id).await?;
    Ok(orders.into_iter().map(OrderSummary::from).collect())
  }

  /// Cancels a pending order on behalf of its owner and, when the policy
  /// says so, puts the ordered quantities back on stock.
  ///
  /// # Arguments
  /// * `order_id`: The order to cancel.
  /// * `user_id`: The caller. Must own the order.
  ///
  /// # Returns
  /// The order with status `Cancelled`.
  ///
  /// # Errors
  /// `OrderNotFound`, `Unauthorized` for another user's order, and
  /// `InvalidState` when the order is no longer pending. A failed cancel
  /// leaves both the order and the stock as they were.
  #[instrument(name = "OrderService::cancel_order", skip(self), err(Display))]
  pub async fn cancel_order(&self, order_id: i64, user_id: i64) -> AppResult<Order> {
    let ctx_data = ContextData::new(CancelOrderCtxData::new(
      self.stores.clone(),
      order_id,
      user_id,
      self.policy.restock_on_cancel,
    ));
    self.run_in_unit_of_work(&ctx_data).await?;

    let (order, restocked_units) = {
      let mut guard = ctx_data.write();
      (guard.order.take(), guard.restocked_units)
    };
    let order = order.ok_or_else(|| AppError::Internal("order missing after cancellation".to_string()))?;
    info!(order_id, restocked_units, "Order cancelled.");
    Ok(order)
  }

  /// Marks a pending order `Completed`. Only admins reach this through the
  /// HTTP surface; the service itself does not check roles.
  ///
  /// # Errors
  /// `OrderNotFound`, or `InvalidState` when the order is not pending.
  #[instrument(name = "OrderService::complete_order", skip(self), err(Display))]
  pub async fn complete_order(&self, order_id: i64) -> AppResult<Order> {
    let ctx_data = ContextData::new(CompleteOrderCtxData::new(self.stores.clone(), order_id));
    self.run_in_unit_of_work(&ctx_data).await?;

    let order = ctx_data.write().order.take();
    order.ok_or_else(|| AppError::Internal("order missing after completion".to_string()))
  }

  /// Runs the pipeline for `C`. A failed or halted run has its unit of work
  /// rolled back before the error is returned.
  async fn run_in_unit_of_work<C: UnitOfWorkCtx>(&self, ctx_data: &ContextData<C>) -> AppResult<()> {
    let outcome = self.flows.run(ctx_data.clone()).await;

    match outcome {
      Ok(PipelineResult::Completed) => Ok(()),
      Ok(PipelineResult::Stopped) => {
        release_unit_of_work(ctx_data).await;
        warn!("Order workflow was halted by a step.");
        Err(AppError::Internal("order workflow halted before completion".to_string()))
      }
      Err(e) => {
        release_unit_of_work(ctx_data).await;
        Err(e)
      }
    }
  }
}
