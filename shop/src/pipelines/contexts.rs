// shop/src/pipelines/contexts.rs

//! Data structs the pipelines run on. Handlers receive them wrapped in
//! `instashop_flow::ContextData`.

use crate::models::{NewOrderItem, Order, OrderLine, OrderStatus, Session, User};
use crate::store::{Stores, UnitOfWorkHandle};

/// State shared by every pipeline that runs inside a unit of work.
pub trait UnitOfWorkCtx: Send + Sync + 'static {
  fn stores(&self) -> &Stores;
  fn unit_of_work(&self) -> Option<UnitOfWorkHandle>;
  fn set_unit_of_work(&mut self, uow: Option<UnitOfWorkHandle>);
}

/// A pipeline that moves one existing order to `target_status()`.
pub trait OrderTransitionCtx: UnitOfWorkCtx {
  fn order_id(&self) -> i64;
  fn target_status(&self) -> OrderStatus;
  fn order(&self) -> Option<&Order>;
  fn set_order(&mut self, order: Order);
}

macro_rules! impl_unit_of_work_ctx {
  ($($ty:ty),+ $(,)?) => {
    $(
      impl UnitOfWorkCtx for $ty {
        fn stores(&self) -> &Stores {
          &self.stores
        }

        fn unit_of_work(&self) -> Option<UnitOfWorkHandle> {
          self.unit_of_work.clone()
        }

        fn set_unit_of_work(&mut self, uow: Option<UnitOfWorkHandle>) {
          self.unit_of_work = uow;
        }
      }
    )+
  };
}

impl_unit_of_work_ctx!(PlaceOrderCtxData, CancelOrderCtxData, CompleteOrderCtxData);

// --- Orders ---

#[derive(Clone)]
pub struct PlaceOrderCtxData {
  pub stores: Stores,
  pub user_id: i64,
  pub lines: Vec<OrderLine>,
  pub unit_of_work: Option<UnitOfWorkHandle>,
  /// Lines whose stock has been reserved, with the unit price at reservation time.
  pub reserved: Vec<NewOrderItem>,
  pub total_price_cents: i64,
  pub order: Option<Order>,
}

impl PlaceOrderCtxData {
  pub fn new(stores: Stores, user_id: i64, lines: Vec<OrderLine>) -> Self {
    Self {
      stores,
      user_id,
      lines,
      unit_of_work: None,
      reserved: Vec::new(),
      total_price_cents: 0,
      order: None,
    }
  }
}

#[derive(Clone)]
pub struct CancelOrderCtxData {
  pub stores: Stores,
  pub order_id: i64,
  pub requesting_user_id: i64,
  pub restock_on_cancel: bool,
  pub unit_of_work: Option<UnitOfWorkHandle>,
  pub order: Option<Order>,
  pub restocked_units: i64,
}

impl CancelOrderCtxData {
  pub fn new(stores: Stores, order_id: i64, requesting_user_id: i64, restock_on_cancel: bool) -> Self {
    Self {
      stores,
      order_id,
      requesting_user_id,
      restock_on_cancel,
      unit_of_work: None,
      order: None,
      restocked_units: 0,
    }
  }
}

#[derive(Clone)]
pub struct CompleteOrderCtxData {
  pub stores: Stores,
  pub order_id: i64,
  pub unit_of_work: Option<UnitOfWorkHandle>,
  pub order: Option<Order>,
}

impl CompleteOrderCtxData {
  pub fn new(stores: Stores, order_id: i64) -> Self {
    Self {
      stores,
      order_id,
      unit_of_work: None,
      order: None,
    }
  }
}

impl OrderTransitionCtx for CancelOrderCtxData {
  fn order_id(&self) -> i64 {
    self.order_id
  }

  fn target_status(&self) -> OrderStatus {
    OrderStatus::Cancelled
  }

  fn order(&self) -> Option<&Order> {
    self.order.as_ref()
  }

  fn set_order(&mut self, order: Order) {
    self.order = Some(order);
  }
}

impl OrderTransitionCtx for CompleteOrderCtxData {
  fn order_id(&self) -> i64 {
    self.order_id
  }

  fn target_status(&self) -> OrderStatus {
    OrderStatus::Completed
  }

  fn order(&self) -> Option<&Order> {
    self.order.as_ref()
  }

  fn set_order(&mut self, order: Order) {
    self.order = Some(order);
  }
}

// --- Accounts ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub stores: Stores,
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: Option<String>,
  pub created_user: Option<User>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub stores: Stores,
  pub email: String,
  pub password: String,
  pub session_ttl: chrono::Duration,
  pub user: Option<User>,
  pub session: Option<Session>,
}
