// shop/src/store/postgres.rs

//! PostgreSQL store using runtime-checked `sqlx` queries.
//!
//! A unit of work is one `SERIALIZABLE` transaction. Rows a workflow
//! depends on are read with `FOR UPDATE`, and stock only ever moves through
//! `UPDATE ... WHERE stock >= $n` with the affected row count checked.

use super::{OrderStore, ProductStore, SessionStore, TransactionalStore, UnitOfWork, UserStore};
use crate::errors::{AppError, Result};
use crate::models::{
  NewOrder, NewProduct, NewUser, Order, OrderItem, OrderStatus, Product, ProductChanges, Session, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, stock, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, status, total_price_cents, created_at, updated_at";
const ORDER_ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price_cents, created_at, updated_at";
const USER_COLUMNS: &str =
  "id, email, first_name, last_name, password_hash, phone_number, is_verified, is_admin, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

/// Fills `items` on each order with one query.
async fn attach_items(conn: &mut PgConnection, orders: &mut [Order]) -> Result<()> {
  if orders.is_empty() {
    return Ok(());
  }
  let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
  let items: Vec<OrderItem> = sqlx::query_as(&format!(
    "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
  ))
  .bind(&ids)
  .fetch_all(&mut *conn)
  .await?;

  let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
  for item in items {
    by_order.entry(item.order_id).or_default().push(item);
  }
  for order in orders.iter_mut() {
    order.items = by_order.remove(&order.id).unwrap_or_default();
  }
  Ok(())
}

#[async_trait]
impl ProductStore for PgStore {
  async fn find_by_id(&self, id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  async fn find_by_names(&self, names: &[String]) -> Result<Vec<Product>> {
    let products = sqlx::query_as(&format!(
      "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ANY($1) ORDER BY id"
    ))
    .bind(names.to_vec())
    .fetch_all(&self.pool)
    .await?;
    Ok(products)
  }

  #[instrument(name = "PgStore::create_many", skip_all, fields(count = products.len()), err(Display))]
  async fn create_many(&self, products: Vec<NewProduct>) -> Result<Vec<Product>> {
    let mut tx = self.pool.begin().await?;
    let sql = format!(
      "INSERT INTO products (name, description, price_cents, stock) VALUES ($1, $2, $3, $4) RETURNING {PRODUCT_COLUMNS}"
    );
    let mut created = Vec::with_capacity(products.len());
    for new in products {
      let product: Product = sqlx::query_as(&sql)
        .bind(new.name)
        .bind(new.description)
        .bind(new.price_cents)
        .bind(new.stock)
        .fetch_one(&mut *tx)
        .await?;
      created.push(product);
    }
    tx.commit().await?;
    Ok(created)
  }

  async fn list_page(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
      .fetch_one(&self.pool)
      .await?;
    let page = sqlx::query_as(&format!(
      "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(&self.pool)
    .await?;
    Ok((page, total))
  }

  async fn update(&self, id: i64, changes: ProductChanges) -> Result<Option<Product>> {
    let product = sqlx::query_as(&format!(
      "UPDATE products SET \
         name = COALESCE($2, name), \
         description = COALESCE($3, description), \
         price_cents = COALESCE($4, price_cents), \
         stock = COALESCE($5, stock), \
         updated_at = NOW() \
       WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(id)
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.price_cents)
    .bind(changes.stock)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  async fn delete(&self, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn decrease_stock(&self, id: i64, quantity: i32) -> Result<bool> {
    let mut conn = self.pool.acquire().await?;
    decrease_stock_on(&mut conn, id, quantity).await
  }
}

async fn decrease_stock_on(conn: &mut PgConnection, id: i64, quantity: i32) -> Result<bool> {
  let result =
    sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2")
      .bind(id)
      .bind(quantity)
      .execute(conn)
      .await?;
  Ok(result.rows_affected() == 1)
}

#[async_trait]
impl OrderStore for PgStore {
  async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
    let mut conn = self.pool.acquire().await?;
    let order: Option<Order> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
      .bind(id)
      .fetch_optional(&mut *conn)
      .await?;
    let Some(order) = order else {
      return Ok(None);
    };
    let mut orders = [order];
    attach_items(&mut *conn, &mut orders).await?;
    let [order] = orders;
    Ok(Some(order))
  }

  async fn find_by_owner(&self, user_id: i64) -> Result<Vec<Order>> {
    let mut conn = self.pool.acquire().await?;
    let mut orders: Vec<Order> = sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY id"
    ))
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;
    attach_items(&mut *conn, &mut orders).await?;
    Ok(orders)
  }
}

#[async_trait]
impl UserStore for PgStore {
  async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
    let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
      .bind(email)
      .fetch_optional(&self.pool)
      .await?;
    Ok(user)
  }

  async fn email_exists(&self, email: &str) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
      .bind(email)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  async fn create(&self, new: NewUser) -> Result<User> {
    let user = sqlx::query_as(&format!(
      "INSERT INTO users (email, first_name, last_name, password_hash, phone_number, is_admin) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
    ))
    .bind(new.email)
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(new.password_hash)
    .bind(new.phone_number)
    .bind(new.is_admin)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| {
      if e.as_database_error().is_some_and(|db_err| db_err.is_unique_violation()) {
        AppError::Validation("email already in use".to_string())
      } else {
        AppError::Sqlx(e)
      }
    })?;
    Ok(user)
  }
}

#[async_trait]
impl SessionStore for PgStore {
  async fn create(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<Session> {
    let purged = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
      .execute(&self.pool)
      .await?
      .rows_affected();
    if purged > 0 {
      debug!(purged, "Expired sessions removed.");
    }
    let session = sqlx::query_as(
      "WITH inserted AS ( \
         INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3) \
         RETURNING token, user_id, created_at, expires_at \
       ) \
       SELECT i.token, i.user_id, u.email, u.is_admin, i.created_at, i.expires_at \
       FROM inserted i JOIN users u ON u.id = i.user_id",
    )
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .fetch_one(&self.pool)
    .await?;
    Ok(session)
  }

  async fn find(&self, token: &str) -> Result<Option<Session>> {
    let session = sqlx::query_as(
      "SELECT s.token, s.user_id, u.email, u.is_admin, s.created_at, s.expires_at \
       FROM sessions s JOIN users u ON u.id = s.user_id \
       WHERE s.token = $1 AND s.expires_at > NOW()",
    )
    .bind(token)
    .fetch_optional(&self.pool)
    .await?;
    Ok(session)
  }
}

#[async_trait]
impl TransactionalStore for PgStore {
  async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
    let mut tx = self.pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
      .execute(&mut *tx)
      .await?;
    debug!("Postgres unit of work started.");
    Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
  }
}

/// Dropping the inner `Transaction` without commit rolls it back.
struct PgUnitOfWork {
  tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
  fn conn(&mut self) -> Result<&mut PgConnection> {
    match self.tx.as_mut() {
      Some(tx) => Ok(&mut **tx),
      None => Err(AppError::Internal("unit of work already finished".to_string())),
    }
  }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
  async fn find_product_for_update(&mut self, id: i64) -> Result<Option<Product>> {
    let product = sqlx::query_as(&format!(
      "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(self.conn()?)
    .await?;
    Ok(product)
  }

  async fn decrease_stock(&mut self, id: i64, quantity: i32) -> Result<bool> {
    decrease_stock_on(self.conn()?, id, quantity).await
  }

  async fn increase_stock(&mut self, id: i64, quantity: i32) -> Result<bool> {
    let result = sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .bind(quantity)
      .execute(self.conn()?)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn create_order_with_items(&mut self, new: NewOrder) -> Result<Order> {
    let conn = self.conn()?;
    let mut order: Order = sqlx::query_as(&format!(
      "INSERT INTO orders (user_id, status, total_price_cents) VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(new.user_id)
    .bind(OrderStatus::Pending)
    .bind(new.total_price_cents)
    .fetch_one(&mut *conn)
    .await?;

    let sql = format!(
      "INSERT INTO order_items (order_id, product_id, quantity, price_cents) VALUES ($1, $2, $3, $4) \
       RETURNING {ORDER_ITEM_COLUMNS}"
    );
    for item in new.items {
      let created: OrderItem = sqlx::query_as(&sql)
        .bind(order.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price_cents)
        .fetch_one(&mut *conn)
        .await?;
      order.items.push(created);
    }
    Ok(order)
  }

  async fn find_order_for_update(&mut self, id: i64) -> Result<Option<Order>> {
    let conn = self.conn()?;
    let order: Option<Order> = sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(order) = order else {
      return Ok(None);
    };
    let mut orders = [order];
    attach_items(conn, &mut orders).await?;
    let [order] = orders;
    Ok(Some(order))
  }

  async fn update_order_status(&mut self, id: i64, status: OrderStatus) -> Result<Order> {
    let conn = self.conn()?;
    let order: Option<Order> = sqlx::query_as(&format!(
      "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(&mut *conn)
    .await?;
    let order = order.ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;
    let mut orders = [order];
    attach_items(conn, &mut orders).await?;
    let [order] = orders;
    Ok(order)
  }

  async fn commit(&mut self) -> Result<()> {
    let tx = self
      .tx
      .take()
      .ok_or_else(|| AppError::Internal("unit of work already finished".to_string()))?;
    tx.commit().await?;
    debug!("Postgres unit of work committed.");
    Ok(())
  }

  async fn rollback(&mut self) -> Result<()> {
    let tx = self
      .tx
      .take()
      .ok_or_else(|| AppError::Internal("unit of work already finished".to_string()))?;
    tx.rollback().await?;
    debug!("Postgres unit of work rolled back.");
    Ok(())
  }
}
