// shop/src/lib.rs

//! Instashop backend: catalog, accounts and the order placement workflow.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use errors::{AppError, OrderError};
pub use state::AppState;
