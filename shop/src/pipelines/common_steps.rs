// shop/src/pipelines/common_steps.rs

//! Steps shared by the order pipelines. They are generic over the context
//! traits in `contexts`, so each pipeline registers e.g.
//! `begin_unit_of_work::<CancelOrderCtxData>`.

use crate::errors::{AppError, OrderError, Result as AppResult};
use crate::pipelines::contexts::{OrderTransitionCtx, UnitOfWorkCtx};
use crate::store::{unit_of_work_handle, UnitOfWorkHandle};
use instashop_flow::{ContextData, PipelineControl};
use tracing::{debug, info, instrument, warn};

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("{} missing from pipeline context", what))
}

pub(crate) fn require_unit_of_work<C: UnitOfWorkCtx>(ctx_data: &ContextData<C>) -> AppResult<UnitOfWorkHandle> {
  ctx_data.read().unit_of_work().ok_or_else(|| missing("unit of work"))
}

/// Opens the unit of work the rest of the pipeline runs in.
#[instrument(name = "common_step::begin_unit_of_work", skip_all, err(Display))]
pub async fn begin_unit_of_work<C: UnitOfWorkCtx>(ctx_data: ContextData<C>) -> AppResult<PipelineControl> {
  let transactions = ctx_data.read().stores().transactions.clone();
  let uow = transactions.begin().await?;
  ctx_data.write().set_unit_of_work(Some(unit_of_work_handle(uow)));
  debug!("Unit of work started.");
  Ok(PipelineControl::Continue)
}

#[instrument(name = "common_step::commit_unit_of_work", skip_all, err(Display))]
pub async fn commit_unit_of_work<C: UnitOfWorkCtx>(ctx_data: ContextData<C>) -> AppResult<PipelineControl> {
  let uow = require_unit_of_work(&ctx_data)?;
  uow.lock().await.commit().await?;
  ctx_data.write().set_unit_of_work(None);
  debug!("Unit of work committed.");
  Ok(PipelineControl::Continue)
}

/// Rolls back whatever unit of work a failed or stopped run left behind.
pub async fn release_unit_of_work<C: UnitOfWorkCtx>(ctx_data: &ContextData<C>) {
  let leftover = {
    let mut guard = ctx_data.write();
    let uow = guard.unit_of_work();
    guard.set_unit_of_work(None);
    uow
  };
  if let Some(uow) = leftover {
    if let Err(e) = uow.lock().await.rollback().await {
      warn!(error = %e, "Rollback failed; the transaction is discarded on drop.");
    } else {
      debug!("Unit of work rolled back.");
    }
  }
}

#[instrument(
  name = "common_step::load_order_for_update",
  skip_all,
  fields(order_id = tracing::field::Empty),
  err(Display)
)]
pub async fn load_order_for_update<C: OrderTransitionCtx>(ctx_data: ContextData<C>) -> AppResult<PipelineControl> {
  let order_id = ctx_data.read().order_id();
  tracing::Span::current().record("order_id", order_id);

  let uow = require_unit_of_work(&ctx_data)?;
  let order = uow.lock().await.find_order_for_update(order_id).await?;
  let order = order.ok_or(OrderError::OrderNotFound { order_id })?;

  ctx_data.write().set_order(order);
  Ok(PipelineControl::Continue)
}

/// Only pending orders may change status. Anything else is `InvalidState`.
#[instrument(name = "common_step::ensure_order_pending", skip_all, err(Display))]
pub async fn ensure_order_pending<C: OrderTransitionCtx>(ctx_data: ContextData<C>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let target = guard.target_status();
  let order = guard.order().ok_or_else(|| missing("order"))?;

  if !order.status.can_transition_to(target) {
    warn!(order_id = order.id, status = %order.status, attempted = %target, "Rejected status transition.");
    return Err(
      OrderError::InvalidState {
        order_id: order.id,
        status: order.status,
        attempted: target,
      }
      .into(),
    );
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "common_step::apply_status_transition", skip_all, err(Display))]
pub async fn apply_status_transition<C: OrderTransitionCtx>(ctx_data: ContextData<C>) -> AppResult<PipelineControl> {
  let (order_id, target) = {
    let guard = ctx_data.read();
    (guard.order_id(), guard.target_status())
  };

  let uow = require_unit_of_work(&ctx_data)?;
  let updated = uow.lock().await.update_order_status(order_id, target).await?;

  info!(order_id, status = %updated.status, "Order status updated.");
  ctx_data.write().set_order(updated);
  Ok(PipelineControl::Continue)
}
