// shop/src/state.rs

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::pipelines;
use crate::services::{AuthService, OrderPolicy, OrderService, ProductService};
use crate::store::Stores;
use instashop_flow::FlowRegistry;
use std::sync::Arc;

/// Everything a request handler needs. Cloned into each actix worker.
#[derive(Clone)]
pub struct AppState {
  pub stores: Stores,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub auth: AuthService,
  pub orders: OrderService,
  pub products: ProductService,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Registers every pipeline and wires the services over `stores`.
  pub fn build(config: Arc<AppConfig>, stores: Stores) -> AppResult<Self> {
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows)?;

    let policy = OrderPolicy {
      restock_on_cancel: config.restock_on_cancel,
    };

    Ok(Self {
      auth: AuthService::new(flows.clone(), stores.clone(), config.session_ttl()?),
      orders: OrderService::new(flows.clone(), stores.clone(), policy),
      products: ProductService::new(stores.clone()),
      stores,
      flows,
      config,
    })
  }
}
