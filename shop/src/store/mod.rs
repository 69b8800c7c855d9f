// shop/src/store/mod.rs

//! Persistence contracts and their two implementations.
//!
//! Read paths and catalog administration use the plain store traits. Every
//! operation of an order workflow goes through one [`UnitOfWork`], obtained
//! from [`TransactionalStore::begin`], so that a failing workflow leaves
//! stock and orders exactly as they were.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{NewOrder, NewProduct, NewUser, Order, OrderStatus, Product, ProductChanges, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ProductStore: Send + Sync {
  async fn find_by_id(&self, id: i64) -> Result<Option<Product>>;

  /// Products whose name is in `names`. Unknown names are simply absent.
  async fn find_by_names(&self, names: &[String]) -> Result<Vec<Product>>;

  /// Inserts all products or none of them.
  async fn create_many(&self, products: Vec<NewProduct>) -> Result<Vec<Product>>;

  /// One page ordered by id, plus the total number of products.
  async fn list_page(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)>;

  async fn update(&self, id: i64, changes: ProductChanges) -> Result<Option<Product>>;

  /// Returns `false` if no product had this id.
  async fn delete(&self, id: i64) -> Result<bool>;

  /// Decrements stock only if at least `quantity` is available.
  /// Returns `false` when the decrement was refused or the product is absent.
  async fn decrease_stock(&self, id: i64, quantity: i32) -> Result<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// The order with its items.
  async fn find_by_id(&self, id: i64) -> Result<Option<Order>>;

  /// All orders of `user_id` with their items, oldest first.
  async fn find_by_owner(&self, user_id: i64) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
  async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
  async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn email_exists(&self, email: &str) -> Result<bool>;
  async fn create(&self, user: NewUser) -> Result<User>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
  async fn create(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<Session>;
  async fn find(&self, token: &str) -> Result<Option<Session>>;
}

/// One transaction spanning a whole workflow call.
///
/// Dropping a unit of work that was neither committed nor rolled back
/// discards its changes.
#[async_trait]
pub trait UnitOfWork: Send {
  /// Reads a product and locks it until the unit of work ends.
  async fn find_product_for_update(&mut self, id: i64) -> Result<Option<Product>>;

  /// Same contract as [`ProductStore::decrease_stock`], inside this transaction.
  async fn decrease_stock(&mut self, id: i64, quantity: i32) -> Result<bool>;

  /// Returns `false` if the product no longer exists.
  async fn increase_stock(&mut self, id: i64, quantity: i32) -> Result<bool>;

  /// Persists the order in `Pending` state together with all its items.
  async fn create_order_with_items(&mut self, order: NewOrder) -> Result<Order>;

  /// Reads an order with its items and locks it until the unit of work ends.
  async fn find_order_for_update(&mut self, id: i64) -> Result<Option<Order>>;

  async fn update_order_status(&mut self, id: i64, status: OrderStatus) -> Result<Order>;

  async fn commit(&mut self) -> Result<()>;

  async fn rollback(&mut self) -> Result<()>;
}

#[async_trait]
pub trait TransactionalStore: Send + Sync {
  async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

/// Shared handle to the unit of work a pipeline run is using.
pub type UnitOfWorkHandle = Arc<AsyncMutex<Box<dyn UnitOfWork>>>;

pub fn unit_of_work_handle(uow: Box<dyn UnitOfWork>) -> UnitOfWorkHandle {
  Arc::new(AsyncMutex::new(uow))
}

/// Every store the application uses, backed by one implementation.
#[derive(Clone)]
pub struct Stores {
  pub products: Arc<dyn ProductStore>,
  pub orders: Arc<dyn OrderStore>,
  pub users: Arc<dyn UserStore>,
  pub sessions: Arc<dyn SessionStore>,
  pub transactions: Arc<dyn TransactionalStore>,
}

impl Stores {
  pub fn postgres(pool: sqlx::PgPool) -> Self {
    Self::from_backend(Arc::new(PgStore::new(pool)))
  }

  pub fn in_memory() -> Self {
    Self::from_backend(Arc::new(MemoryStore::new()))
  }

  fn from_backend<B>(backend: Arc<B>) -> Self
  where
    B: ProductStore + OrderStore + UserStore + SessionStore + TransactionalStore + 'static,
  {
    Self {
      products: backend.clone(),
      orders: backend.clone(),
      users: backend.clone(),
      sessions: backend.clone(),
      transactions: backend,
    }
  }
}
