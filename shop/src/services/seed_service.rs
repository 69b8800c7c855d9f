// shop/src/services/seed_service.rs

//! Startup seeding of a default catalog and an administrator account.

use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::models::{NewProduct, NewUser};
use crate::services::auth_service;
use crate::services::product_service::ProductService;
use crate::store::Stores;
use tracing::{info, instrument, warn};

pub fn default_catalog() -> Vec<NewProduct> {
  [
    ("Espresso Beans 1kg", "Dark roast whole beans", 2450, 40),
    ("Pour-over Kettle", "Gooseneck kettle, 1 litre", 5900, 15),
    ("Ceramic Mug", "350 ml stoneware mug", 1200, 120),
    ("Paper Filters", "Pack of 100 cone filters", 650, 200),
    ("Hand Grinder", "Conical burr hand grinder", 8900, 10),
  ]
  .into_iter()
  .map(|(name, description, price_cents, stock)| NewProduct {
    name: name.to_string(),
    description: description.to_string(),
    price_cents,
    stock,
  })
  .collect()
}

#[instrument(name = "seed_service::seed", skip_all, err(Display))]
pub async fn seed(stores: &Stores, config: &AppConfig) -> AppResult<()> {
  ProductService::new(stores.clone()).seed_catalog(default_catalog()).await?;

  match (&config.seed_admin_email, &config.seed_admin_password) {
    (Some(email), Some(password)) => ensure_admin(stores, email, password).await,
    _ => {
      warn!("SEED_ADMIN_EMAIL / SEED_ADMIN_PASSWORD not set; no administrator seeded.");
      Ok(())
    }
  }
}

async fn ensure_admin(stores: &Stores, email: &str, password: &str) -> AppResult<()> {
  let email = email.trim().to_lowercase();
  if stores.users.email_exists(&email).await? {
    info!(%email, "Seed administrator already exists.");
    return Ok(());
  }

  let admin = stores
    .users
    .create(NewUser {
      email,
      first_name: "Store".to_string(),
      last_name: "Admin".to_string(),
      password_hash: auth_service::hash_password(password)?,
      phone_number: None,
      is_admin: true,
    })
    .await?;
  info!(user_id = admin.id, "Seed administrator created.");
  Ok(())
}
