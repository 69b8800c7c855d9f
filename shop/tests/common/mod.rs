// shop/tests/common/mod.rs
#![allow(dead_code)]

use instashop::config::AppConfig;
use instashop::models::{NewProduct, NewUser, Product, User};
use instashop::services::auth_service;
use instashop::state::AppState;
use instashop::store::Stores;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;

pub const TEST_PASSWORD: &str = "hunter2hunter2";

static TRACING: Lazy<()> = Lazy::new(|| {
  let _ = tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Application state over a fresh in-memory store.
pub fn test_state(restock_on_cancel: bool) -> AppState {
  setup_tracing();
  let config = AppConfig {
    restock_on_cancel,
    ..AppConfig::default()
  };
  AppState::build(Arc::new(config), Stores::in_memory()).expect("application state builds")
}

pub async fn seed_product(state: &AppState, name: &str, price_cents: i64, stock: i32) -> Product {
  let mut created = state
    .stores
    .products
    .create_many(vec![NewProduct {
      name: name.to_string(),
      description: format!("{} for tests", name),
      price_cents,
      stock,
    }])
    .await
    .expect("product created");
  created.remove(0)
}

pub async fn seed_user(state: &AppState, email: &str, is_admin: bool) -> User {
  state
    .stores
    .users
    .create(NewUser {
      email: email.to_string(),
      first_name: "Test".to_string(),
      last_name: "User".to_string(),
      password_hash: auth_service::hash_password(TEST_PASSWORD).expect("hash"),
      phone_number: None,
      is_admin,
    })
    .await
    .expect("user created")
}

pub async fn stock_of(state: &AppState, product_id: i64) -> i32 {
  state
    .stores
    .products
    .find_by_id(product_id)
    .await
    .expect("store read")
    .expect("product exists")
    .stock
}
