// shop/src/errors.rs

use crate::models::OrderStatus;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use instashop_flow::FlowError;
use serde_json::json;
use thiserror::Error;

/// Failures of the order workflows. Every variant maps to exactly one
/// [`ErrorKind`].
#[derive(Debug, Error)]
pub enum OrderError {
  #[error("order must contain at least one item")]
  EmptyOrder,

  #[error("quantity for product {product_id} must be at least 1, got {quantity}")]
  InvalidQuantity { product_id: i64, quantity: i32 },

  #[error("product {product_id} not found")]
  ProductNotFound { product_id: i64 },

  #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
  InsufficientStock {
    product_id: i64,
    requested: i32,
    available: i32,
  },

  #[error("order {order_id} not found")]
  OrderNotFound { order_id: i64 },

  #[error("order {order_id} does not belong to the requesting user")]
  Unauthorized { order_id: i64 },

  #[error("only pending orders can become {attempted}; order {order_id} is {status}")]
  InvalidState {
    order_id: i64,
    status: OrderStatus,
    attempted: OrderStatus,
  },
}

impl OrderError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      OrderError::ProductNotFound { .. } | OrderError::OrderNotFound { .. } => ErrorKind::NotFound,
      OrderError::Unauthorized { .. } => ErrorKind::Unauthorized,
      OrderError::EmptyOrder
      | OrderError::InvalidQuantity { .. }
      | OrderError::InsufficientStock { .. }
      | OrderError::InvalidState { .. } => ErrorKind::BadRequest,
    }
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error(transparent)]
  Order(#[from] OrderError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

/// Error classes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  BadRequest,
  Unauthorized,
  Internal,
}

impl ErrorKind {
  pub fn status_code(self) -> StatusCode {
    match self {
      ErrorKind::NotFound => StatusCode::NOT_FOUND,
      ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
      ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
      ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl AppError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      AppError::Validation(_) => ErrorKind::BadRequest,
      AppError::Auth(_) => ErrorKind::Unauthorized,
      AppError::NotFound(_) | AppError::Sqlx(sqlx::Error::RowNotFound) => ErrorKind::NotFound,
      AppError::Order(order_err) => order_err.kind(),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        ErrorKind::Internal
      }
    }
  }

  /// The message sent to clients. Internal details stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m) | AppError::Auth(m) | AppError::NotFound(m) => m.clone(),
      AppError::Order(order_err) => order_err.to_string(),
      AppError::Sqlx(sqlx::Error::RowNotFound) => "resource not found".to_string(),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "an internal error occurred".to_string()
      }
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    self.kind().status_code()
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "success": false,
      "message": self.public_message(),
      "code": status.as_u16(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn order_errors_map_to_their_kinds() {
    let cases = [
      (AppError::from(OrderError::EmptyOrder), ErrorKind::BadRequest),
      (AppError::from(OrderError::ProductNotFound { product_id: 1 }), ErrorKind::NotFound),
      (
        AppError::from(OrderError::InsufficientStock {
          product_id: 1,
          requested: 3,
          available: 2,
        }),
        ErrorKind::BadRequest,
      ),
      (AppError::from(OrderError::OrderNotFound { order_id: 9 }), ErrorKind::NotFound),
      (AppError::from(OrderError::Unauthorized { order_id: 9 }), ErrorKind::Unauthorized),
      (
        AppError::from(OrderError::InvalidState {
          order_id: 9,
          status: OrderStatus::Cancelled,
          attempted: OrderStatus::Cancelled,
        }),
        ErrorKind::BadRequest,
      ),
    ];
    for (err, kind) in cases {
      assert_eq!(err.kind(), kind, "{err}");
    }
  }

  #[test]
  fn store_failures_are_internal_unless_not_found() {
    assert_eq!(AppError::Sqlx(sqlx::Error::RowNotFound).kind(), ErrorKind::NotFound);
    assert_eq!(AppError::Sqlx(sqlx::Error::PoolTimedOut).kind(), ErrorKind::Internal);
    let flow = AppError::from(FlowError::Internal("boom".into()));
    assert_eq!(flow.kind(), ErrorKind::Internal);
    assert_eq!(flow.public_message(), "an internal error occurred");
  }

  #[test]
  fn error_body_carries_success_flag_and_code() {
    let response = AppError::Auth("unauthorized".into()).error_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
  }
}
