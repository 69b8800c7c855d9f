// shop/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{OrderLine, OrderSummary};
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use crate::web::responses;

#[derive(Deserialize, Debug)]
pub struct PlaceOrderRequestPayload {
  pub items: Vec<OrderLine>,
}

#[instrument(
  name = "handler::place_order",
  skip(app_state, req_payload, auth_user),
  fields(user_id = auth_user.user_id, line_count = req_payload.items.len())
)]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PlaceOrderRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders
    .place_order(auth_user.user_id, req_payload.into_inner().items)
    .await?;

  info!(order_id = order.id, "Order placed through HTTP.");
  Ok(responses::created("Order placed successfully", OrderSummary::from(order)))
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = auth_user.user_id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.orders.list_orders(auth_user.user_id).await?;
  Ok(responses::ok("Orders retrieved successfully", orders))
}

#[instrument(name = "handler::cancel_order", skip(app_state, path, auth_user), fields(order_id = *path, user_id = auth_user.user_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.cancel_order(path.into_inner(), auth_user.user_id).await?;
  Ok(responses::ok("Order cancelled successfully", OrderSummary::from(order)))
}

#[instrument(name = "handler::complete_order", skip(app_state, path, admin), fields(order_id = *path, admin_id = admin.0.user_id))]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.complete_order(path.into_inner()).await?;
  Ok(responses::ok("Order completed successfully", OrderSummary::from(order)))
}
