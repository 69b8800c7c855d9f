// shop/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{auth_handlers, order_handlers, product_handlers, user_handlers};
use actix_web::{web, HttpResponse};
use serde_json::json;

async fn welcome_handler() -> HttpResponse {
  HttpResponse::Ok().body("Welcome to Instashop!")
}

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "status": "ok" }))
}

/// Turns body deserialization failures into the regular error envelope.
pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| {
    AppError::Validation(format!("Invalid request body: {}", err)).into()
  })
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .route("/", web::get().to(welcome_handler))
    .route("/health", web::get().to(health_check_handler))
    .service(
      web::scope("/auth")
        .route("/signup", web::post().to(auth_handlers::signup_handler))
        .route("/login", web::post().to(auth_handlers::login_handler)),
    )
    .service(web::scope("/user").route("/get-details", web::get().to(user_handlers::get_user_details_handler)))
    .service(
      web::scope("/order")
        .route("/place-order", web::post().to(order_handlers::place_order_handler))
        .route("/list-order", web::get().to(order_handlers::list_orders_handler))
        .route("/{order_id}/cancel", web::patch().to(order_handlers::cancel_order_handler))
        .route("/{order_id}/complete", web::patch().to(order_handlers::complete_order_handler)),
    )
    .service(
      web::scope("/product")
        .route("/create-product", web::post().to(product_handlers::create_products_handler))
        .route("/list-products", web::get().to(product_handlers::list_products_handler))
        .route("/{product_id}", web::get().to(product_handlers::get_product_handler))
        .route("/{product_id}", web::patch().to(product_handlers::update_product_handler))
        .route("/{product_id}", web::delete().to(product_handlers::delete_product_handler)),
    );
}
