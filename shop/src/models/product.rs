// shop/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  /// Never negative. Reservations go through a conditional decrement.
  pub stock: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub stock: i32,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
  pub name: Option<String>,
  pub description: Option<String>,
  pub price_cents: Option<i64>,
  pub stock: Option<i32>,
}

impl ProductChanges {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.description.is_none() && self.price_cents.is_none() && self.stock.is_none()
  }

  pub(crate) fn apply_to(&self, product: &mut Product) {
    if let Some(name) = &self.name {
      product.name = name.clone();
    }
    if let Some(description) = &self.description {
      product.description = description.clone();
    }
    if let Some(price_cents) = self.price_cents {
      product.price_cents = price_cents;
    }
    if let Some(stock) = self.stock {
      product.stock = stock;
    }
  }
}
