// shop/src/store/memory.rs

//! In-process store used when no database is configured and by the tests.
//!
//! All state sits behind one async mutex. A unit of work holds that mutex
//! from `begin` until commit or rollback, so workflows are fully serialized,
//! and it records what it overwrites so a rollback can put it back.

use super::{OrderStore, ProductStore, SessionStore, TransactionalStore, UnitOfWork, UserStore};
use crate::errors::{AppError, Result};
use crate::models::{
  NewOrder, NewProduct, NewUser, Order, OrderItem, OrderStatus, Product, ProductChanges, Session, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct MemoryState {
  products: BTreeMap<i64, Product>,
  orders: BTreeMap<i64, Order>,
  users: BTreeMap<i64, User>,
  sessions: HashMap<String, (i64, DateTime<Utc>, DateTime<Utc>)>,
  last_product_id: i64,
  last_order_id: i64,
  last_order_item_id: i64,
  last_user_id: i64,
}

impl MemoryState {
  fn next_product_id(&mut self) -> i64 {
    self.last_product_id += 1;
    self.last_product_id
  }

  fn next_order_id(&mut self) -> i64 {
    self.last_order_id += 1;
    self.last_order_id
  }

  fn next_order_item_id(&mut self) -> i64 {
    self.last_order_item_id += 1;
    self.last_order_item_id
  }

  fn next_user_id(&mut self) -> i64 {
    self.last_user_id += 1;
    self.last_user_id
  }

  fn decrease_stock(&mut self, id: i64, quantity: i32) -> bool {
    match self.products.get_mut(&id) {
      Some(product) if product.stock >= quantity => {
        product.stock -= quantity;
        product.updated_at = Utc::now();
        true
      }
      _ => false,
    }
  }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ProductStore for MemoryStore {
  async fn find_by_id(&self, id: i64) -> Result<Option<Product>> {
    Ok(self.state.lock().await.products.get(&id).cloned())
  }

  async fn find_by_names(&self, names: &[String]) -> Result<Vec<Product>> {
    let state = self.state.lock().await;
    Ok(state.products.values().filter(|p| names.contains(&p.name)).cloned().collect())
  }

  async fn create_many(&self, products: Vec<NewProduct>) -> Result<Vec<Product>> {
    let mut state = self.state.lock().await;
    let now = Utc::now();
    let mut created = Vec::with_capacity(products.len());
    for new in products {
      let product = Product {
        id: state.next_product_id(),
        name: new.name,
        description: new.description,
        price_cents: new.price_cents,
        stock: new.stock,
        created_at: now,
        updated_at: now,
      };
      state.products.insert(product.id, product.clone());
      created.push(product);
    }
    Ok(created)
  }

  async fn list_page(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64)> {
    let state = self.state.lock().await;
    let total = state.products.len() as i64;
    let page = state
      .products
      .values()
      .skip(offset.max(0) as usize)
      .take(limit.max(0) as usize)
      .cloned()
      .collect();
    Ok((page, total))
  }

  async fn update(&self, id: i64, changes: ProductChanges) -> Result<Option<Product>> {
    let mut state = self.state.lock().await;
    Ok(state.products.get_mut(&id).map(|product| {
      changes.apply_to(product);
      product.updated_at = Utc::now();
      product.clone()
    }))
  }

  async fn delete(&self, id: i64) -> Result<bool> {
    Ok(self.state.lock().await.products.remove(&id).is_some())
  }

  async fn decrease_stock(&self, id: i64, quantity: i32) -> Result<bool> {
    Ok(self.state.lock().await.decrease_stock(id, quantity))
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
    Ok(self.state.lock().await.orders.get(&id).cloned())
  }

  async fn find_by_owner(&self, user_id: i64) -> Result<Vec<Order>> {
    let state = self.state.lock().await;
    Ok(state.orders.values().filter(|o| o.user_id == user_id).cloned().collect())
  }
}

#[async_trait]
impl UserStore for MemoryStore {
  async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
    Ok(self.state.lock().await.users.get(&id).cloned())
  }

  async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
    let state = self.state.lock().await;
    Ok(state.users.values().find(|u| u.email == email).cloned())
  }

  async fn email_exists(&self, email: &str) -> Result<bool> {
    let state = self.state.lock().await;
    Ok(state.users.values().any(|u| u.email == email))
  }

  async fn create(&self, new: NewUser) -> Result<User> {
    let mut state = self.state.lock().await;
    if state.users.values().any(|u| u.email == new.email) {
      return Err(AppError::Validation("email already in use".to_string()));
    }
    let now = Utc::now();
    let user = User {
      id: state.next_user_id(),
      email: new.email,
      first_name: new.first_name,
      last_name: new.last_name,
      password_hash: new.password_hash,
      phone_number: new.phone_number,
      is_verified: false,
      is_admin: new.is_admin,
      created_at: now,
      updated_at: now,
    };
    state.users.insert(user.id, user.clone());
    Ok(user)
  }
}

#[async_trait]
impl SessionStore for MemoryStore {
  async fn create(&self, token: &str, user_id: i64, expires_at: DateTime<Utc>) -> Result<Session> {
    let mut state = self.state.lock().await;
    let user = state
      .users
      .get(&user_id)
      .cloned()
      .ok_or_else(|| AppError::Internal(format!("session for unknown user {}", user_id)))?;
    let created_at = Utc::now();
    state.sessions.retain(|_, (_, _, expires)| *expires > created_at);
    state.sessions.insert(token.to_string(), (user_id, created_at, expires_at));
    Ok(Session {
      token: token.to_string(),
      user_id,
      email: user.email,
      is_admin: user.is_admin,
      created_at,
      expires_at,
    })
  }

  /// Expired sessions are removed on lookup and reported as absent.
  async fn find(&self, token: &str) -> Result<Option<Session>> {
    let mut state = self.state.lock().await;
    let Some((user_id, created_at, expires_at)) = state.sessions.get(token).copied() else {
      return Ok(None);
    };
    if expires_at <= Utc::now() {
      state.sessions.remove(token);
      return Ok(None);
    }
    Ok(state.users.get(&user_id).map(|user| Session {
      token: token.to_string(),
      user_id,
      email: user.email.clone(),
      is_admin: user.is_admin,
      created_at,
      expires_at,
    }))
  }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
  async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
    let guard = self.state.clone().lock_owned().await;
    Ok(Box::new(MemoryUnitOfWork {
      guard: Some(guard),
      undo: Vec::new(),
    }))
  }
}

/// Previous value of one piece of state a unit of work changed.
enum Undo {
  Product(Product),
  Order(Order),
  InsertedOrder(i64),
  IdCounters { last_order_id: i64, last_order_item_id: i64 },
}

/// Holds the store lock until commit or rollback. Every change first pushes
/// what it overwrites onto `undo`, which is replayed backwards on rollback.
struct MemoryUnitOfWork {
  guard: Option<OwnedMutexGuard<MemoryState>>,
  undo: Vec<Undo>,
}

impl MemoryUnitOfWork {
  fn state(&mut self) -> Result<&mut MemoryState> {
    self
      .guard
      .as_deref_mut()
      .ok_or_else(|| AppError::Internal("unit of work already finished".to_string()))
  }

  fn remember_product(&mut self, id: i64) -> Result<()> {
    let previous = self.state()?.products.get(&id).cloned();
    self.undo.extend(previous.map(Undo::Product));
    Ok(())
  }

  fn undo_changes(&mut self) {
    let Some(state) = self.guard.as_deref_mut() else {
      return;
    };
    while let Some(entry) = self.undo.pop() {
      match entry {
        Undo::Product(product) => {
          state.products.insert(product.id, product);
        }
        Undo::Order(order) => {
          state.orders.insert(order.id, order);
        }
        Undo::InsertedOrder(id) => {
          state.orders.remove(&id);
        }
        Undo::IdCounters {
          last_order_id,
          last_order_item_id,
        } => {
          state.last_order_id = last_order_id;
          state.last_order_item_id = last_order_item_id;
        }
      }
    }
  }
}

impl Drop for MemoryUnitOfWork {
  fn drop(&mut self) {
    if self.guard.is_some() && !self.undo.is_empty() {
      warn!("Unit of work dropped without commit, discarding changes.");
      self.undo_changes();
    }
  }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
  async fn find_product_for_update(&mut self, id: i64) -> Result<Option<Product>> {
    Ok(self.state()?.products.get(&id).cloned())
  }

  async fn decrease_stock(&mut self, id: i64, quantity: i32) -> Result<bool> {
    self.remember_product(id)?;
    Ok(self.state()?.decrease_stock(id, quantity))
  }

  async fn increase_stock(&mut self, id: i64, quantity: i32) -> Result<bool> {
    self.remember_product(id)?;
    let state = self.state()?;
    match state.products.get_mut(&id) {
      Some(product) => {
        product.stock = product
          .stock
          .checked_add(quantity)
          .ok_or_else(|| AppError::Internal(format!("stock overflow for product {}", id)))?;
        product.updated_at = Utc::now();
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn create_order_with_items(&mut self, new: NewOrder) -> Result<Order> {
    let state = self.state()?;
    let counters = Undo::IdCounters {
      last_order_id: state.last_order_id,
      last_order_item_id: state.last_order_item_id,
    };
    let now = Utc::now();
    let order_id = state.next_order_id();
    let mut items = Vec::with_capacity(new.items.len());
    for item in new.items {
      items.push(OrderItem {
        id: state.next_order_item_id(),
        order_id,
        product_id: item.product_id,
        quantity: item.quantity,
        price_cents: item.price_cents,
        created_at: now,
        updated_at: now,
      });
    }
    let order = Order {
      id: order_id,
      user_id: new.user_id,
      status: OrderStatus::Pending,
      total_price_cents: new.total_price_cents,
      created_at: now,
      updated_at: now,
      items,
    };
    state.orders.insert(order_id, order.clone());
    self.undo.push(counters);
    self.undo.push(Undo::InsertedOrder(order_id));
    Ok(order)
  }

  async fn find_order_for_update(&mut self, id: i64) -> Result<Option<Order>> {
    Ok(self.state()?.orders.get(&id).cloned())
  }

  async fn update_order_status(&mut self, id: i64, status: OrderStatus) -> Result<Order> {
    let order = self
      .state()?
      .orders
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;
    let previous = order.clone();
    order.status = status;
    order.updated_at = Utc::now();
    let updated = order.clone();
    self.undo.push(Undo::Order(previous));
    Ok(updated)
  }

  async fn commit(&mut self) -> Result<()> {
    self.state()?;
    self.undo.clear();
    self.guard = None;
    debug!("Memory unit of work committed.");
    Ok(())
  }

  async fn rollback(&mut self) -> Result<()> {
    self.state()?;
    self.undo_changes();
    self.guard = None;
    debug!("Memory unit of work rolled back.");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::NewOrderItem;

  async fn store_with_product(stock: i32) -> (MemoryStore, i64) {
    let store = MemoryStore::new();
    let created = store
      .create_many(vec![NewProduct {
        name: "Kettle".into(),
        description: "Boils water".into(),
        price_cents: 2500,
        stock,
      }])
      .await
      .unwrap();
    (store, created[0].id)
  }

  #[tokio::test]
  async fn conditional_decrement_never_goes_negative() {
    let (store, id) = store_with_product(2).await;
    assert!(ProductStore::decrease_stock(&store, id, 2).await.unwrap());
    assert!(!ProductStore::decrease_stock(&store, id, 1).await.unwrap());
    assert!(!ProductStore::decrease_stock(&store, 999, 1).await.unwrap());
    assert_eq!(ProductStore::find_by_id(&store, id).await.unwrap().unwrap().stock, 0);
  }

  #[tokio::test]
  async fn dropped_unit_of_work_discards_changes() {
    let (store, id) = store_with_product(5).await;
    {
      let mut uow = store.begin().await.unwrap();
      assert!(uow.decrease_stock(id, 3).await.unwrap());
      uow
        .create_order_with_items(NewOrder {
          user_id: 1,
          total_price_cents: 7500,
          items: vec![NewOrderItem {
            product_id: id,
            quantity: 3,
            price_cents: 2500,
          }],
        })
        .await
        .unwrap();
    }
    assert_eq!(ProductStore::find_by_id(&store, id).await.unwrap().unwrap().stock, 5);
    assert!(store.find_by_owner(1).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn committed_unit_of_work_is_visible_and_finished() {
    let (store, id) = store_with_product(5).await;
    let mut uow = store.begin().await.unwrap();
    assert!(uow.decrease_stock(id, 1).await.unwrap());
    uow.commit().await.unwrap();
    assert!(matches!(uow.commit().await, Err(AppError::Internal(_))));
    drop(uow);
    assert_eq!(ProductStore::find_by_id(&store, id).await.unwrap().unwrap().stock, 4);
  }

  #[tokio::test]
  async fn explicit_rollback_undoes_stock_change() {
    let (store, id) = store_with_product(5).await;
    let mut uow = store.begin().await.unwrap();
    assert!(uow.increase_stock(id, 10).await.unwrap());
    uow.rollback().await.unwrap();
    drop(uow);
    assert_eq!(ProductStore::find_by_id(&store, id).await.unwrap().unwrap().stock, 5);
  }

  #[tokio::test]
  async fn rollback_restores_order_status_and_id_counters() {
    let (store, id) = store_with_product(5).await;
    let mut uow = store.begin().await.unwrap();
    let order = uow
      .create_order_with_items(NewOrder {
        user_id: 1,
        total_price_cents: 2500,
        items: vec![NewOrderItem {
          product_id: id,
          quantity: 1,
          price_cents: 2500,
        }],
      })
      .await
      .unwrap();
    uow.commit().await.unwrap();
    drop(uow);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.increase_stock(id, 1).await.unwrap());
    uow.update_order_status(order.id, OrderStatus::Cancelled).await.unwrap();
    let second = uow
      .create_order_with_items(NewOrder {
        user_id: 1,
        total_price_cents: 2500,
        items: vec![NewOrderItem {
          product_id: id,
          quantity: 1,
          price_cents: 2500,
        }],
      })
      .await
      .unwrap();
    uow.rollback().await.unwrap();
    drop(uow);

    let stored = OrderStore::find_by_id(&store, order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(OrderStore::find_by_id(&store, second.id).await.unwrap().is_none());
    assert_eq!(ProductStore::find_by_id(&store, id).await.unwrap().unwrap().stock, 5);

    // Ids handed out inside the rolled back unit of work are reused.
    let mut uow = store.begin().await.unwrap();
    let third = uow
      .create_order_with_items(NewOrder {
        user_id: 1,
        total_price_cents: 0,
        items: vec![],
      })
      .await
      .unwrap();
    assert_eq!(third.id, second.id);
  }

  async fn store_with_user() -> (MemoryStore, i64) {
    let store = MemoryStore::new();
    let user = UserStore::create(
      &store,
      NewUser {
        email: "ada@example.com".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        password_hash: "hash".to_string(),
        phone_number: None,
        is_admin: false,
      },
    )
    .await
    .unwrap();
    (store, user.id)
  }

  #[tokio::test]
  async fn expired_session_is_not_found_and_removed() {
    let (store, user_id) = store_with_user().await;
    let past = Utc::now() - chrono::Duration::minutes(1);
    SessionStore::create(&store, "old", user_id, past).await.unwrap();
    assert!(SessionStore::find(&store, "old").await.unwrap().is_none());
    assert!(!store.state.lock().await.sessions.contains_key("old"));
  }

  #[tokio::test]
  async fn creating_a_session_purges_expired_ones() {
    let (store, user_id) = store_with_user().await;
    let past = Utc::now() - chrono::Duration::minutes(1);
    let future = Utc::now() + chrono::Duration::hours(1);
    SessionStore::create(&store, "old", user_id, past).await.unwrap();
    SessionStore::create(&store, "new", user_id, future).await.unwrap();

    let state = store.state.lock().await;
    assert!(!state.sessions.contains_key("old"));
    assert!(state.sessions.contains_key("new"));
    drop(state);
    let session = SessionStore::find(&store, "new").await.unwrap().unwrap();
    assert_eq!(session.user_id, user_id);
  }
}
