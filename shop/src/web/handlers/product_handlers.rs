// shop/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::product_service::{CreateProductRequest, UpdateProductRequest};
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use crate::web::responses;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
  #[serde(default = "default_page")]
  pub page: i64,
  #[serde(default = "default_page_size")]
  pub page_size: i64,
}

fn default_page() -> i64 {
  1
}

fn default_page_size() -> i64 {
  10
}

#[instrument(name = "handler::create_products", skip_all, fields(admin_id = admin.0.user_id, count = req_payload.len()))]
pub async fn create_products_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<Vec<CreateProductRequest>>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let products = app_state.products.create_products(req_payload.into_inner()).await?;
  info!(count = products.len(), "Products created through HTTP.");
  Ok(responses::created("Products created successfully", products))
}

#[instrument(name = "handler::list_products", skip(app_state, _admin))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListProductsQuery>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let page = app_state.products.list_products(query.page, query.page_size).await?;

  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Products retrieved successfully",
    "data": page.products,
    "pagination": page.pagination,
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path, _admin), fields(product_id = *path))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = app_state.products.get_product(path.into_inner()).await?;
  Ok(responses::ok("Product retrieved successfully", product))
}

#[instrument(name = "handler::update_product", skip(app_state, path, req_payload, _admin), fields(product_id = *path))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  req_payload: web::Json<UpdateProductRequest>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product = app_state
    .products
    .update_product(path.into_inner(), req_payload.into_inner())
    .await?;
  Ok(responses::ok("Product updated successfully", product))
}

#[instrument(name = "handler::delete_product", skip(app_state, path, _admin), fields(product_id = *path))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  app_state.products.delete_product(product_id).await?;
  Ok(responses::ok("Product deleted successfully", json!({ "id": product_id })))
}
