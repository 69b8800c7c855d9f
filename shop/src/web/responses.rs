// shop/src/web/responses.rs

//! Success envelope shared by every handler: `{success, message, data}`.
//! Errors get their envelope from `AppError`'s `ResponseError` impl.

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

pub fn ok<T: Serialize>(message: &str, data: T) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "success": true,
    "message": message,
    "data": data,
  }))
}

pub fn created<T: Serialize>(message: &str, data: T) -> HttpResponse {
  HttpResponse::Created().json(json!({
    "success": true,
    "message": message,
    "data": data,
  }))
}
