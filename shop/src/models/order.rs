// shop/src/models/order.rs

use super::order_item::{NewOrderItem, OrderItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;

/// Lifecycle of an order. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Completed,
  Cancelled,
}

impl OrderStatus {
  pub fn is_terminal(self) -> bool {
    !matches!(self, OrderStatus::Pending)
  }

  /// Pending may move to Completed or Cancelled. Nothing leaves a terminal state.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    matches!(
      (self, next),
      (OrderStatus::Pending, OrderStatus::Completed) | (OrderStatus::Pending, OrderStatus::Cancelled)
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub user_id: i64,
  pub status: OrderStatus,
  /// Sum of `quantity * price_cents` over the items, fixed when the order is placed.
  pub total_price_cents: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  #[sqlx(skip)]
  pub items: Vec<OrderItem>,
}

/// An order as the store receives it before ids and timestamps exist.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: i64,
  pub total_price_cents: i64,
  pub items: Vec<NewOrderItem>,
}

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OrderLine {
  pub product_id: i64,
  pub quantity: i32,
}

/// The shape returned by order listing.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
  pub id: i64,
  pub user_id: i64,
  pub status: OrderStatus,
  pub total_price_cents: i64,
  pub items: Vec<OrderSummaryItem>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderSummaryItem {
  pub product_id: i64,
  pub quantity: i32,
  pub price_cents: i64,
}

impl From<Order> for OrderSummary {
  fn from(order: Order) -> Self {
    Self {
      id: order.id,
      user_id: order.user_id,
      status: order.status,
      total_price_cents: order.total_price_cents,
      items: order
        .items
        .into_iter()
        .map(|item| OrderSummaryItem {
          product_id: item.product_id,
          quantity: item.quantity,
          price_cents: item.price_cents,
        })
        .collect(),
      created_at: order.created_at,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pending_is_the_only_state_with_exits() {
    use OrderStatus::*;
    assert!(Pending.can_transition_to(Completed));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(!Pending.can_transition_to(Pending));
    for terminal in [Completed, Cancelled] {
      assert!(terminal.is_terminal());
      for next in [Pending, Completed, Cancelled] {
        assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
      }
    }
  }

  #[test]
  fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
    let parsed: OrderStatus = serde_json::from_str("\"completed\"").unwrap();
    assert_eq!(parsed, OrderStatus::Completed);
  }

  #[test]
  fn summary_keeps_item_price_snapshots() {
    let now = Utc::now();
    let order = Order {
      id: 7,
      user_id: 3,
      status: OrderStatus::Pending,
      total_price_cents: 3000,
      created_at: now,
      updated_at: now,
      items: vec![OrderItem {
        id: 1,
        order_id: 7,
        product_id: 42,
        quantity: 3,
        price_cents: 1000,
        created_at: now,
        updated_at: now,
      }],
    };
    let summary = OrderSummary::from(order);
    assert_eq!(summary.items.len(), 1);
    assert_eq!(summary.items[0].price_cents, 1000);
    assert_eq!(summary.total_price_cents, 3000);
  }
}
