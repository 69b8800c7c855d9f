// shop/src/models/order_item.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One line of an order. Never updated after creation.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  /// Unit price at the time of purchase.
  pub price_cents: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
  pub product_id: i64,
  pub quantity: i32,
  pub price_cents: i64,
}
