// shop/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::auth_service::SignupInput;
use crate::state::AppState;
use crate::web::responses;

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(default)]
  pub phone_number: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let user = app_state
    .auth
    .signup(SignupInput {
      email: payload.email,
      password: payload.password,
      first_name: payload.first_name,
      last_name: payload.last_name,
      phone_number: payload.phone_number,
    })
    .await?;

  info!(user_id = user.id, "Signup successful.");
  Ok(responses::created("User created successfully", user))
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.auth.login(&req_payload.email, &req_payload.password).await?;

  info!(user_id = session.user_id, "Login successful.");
  Ok(responses::ok(
    "Login successful",
    json!({ "token": session.token, "expires_at": session.expires_at }),
  ))
}
