// shop/src/pipelines/mod.rs

//! Every multi-step workflow of the shop, expressed as `instashop_flow`
//! pipelines keyed by their context type.

use crate::errors::AppError;
use instashop_flow::{FlowRegistry, FlowResult};

pub mod common_steps;
pub mod contexts;

pub mod cancel_order_pipeline;
pub mod complete_order_pipeline;
pub mod place_order_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers all pipelines with `flows`. Called once at startup.
pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flows)?;
  signin_pipeline::register_signin_pipeline(flows)?;
  place_order_pipeline::register_place_order_pipeline(flows)?;
  cancel_order_pipeline::register_cancel_order_pipeline(flows)?;
  complete_order_pipeline::register_complete_order_pipeline(flows)?;

  tracing::info!("All application pipelines registered.");
  Ok(())
}
