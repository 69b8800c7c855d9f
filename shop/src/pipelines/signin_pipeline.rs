// shop/src/pipelines/signin_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use chrono::Utc;
use instashop_flow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl};
use tracing::{event, info, instrument, warn, Level};

const BAD_CREDENTIALS: &str = "Invalid email or password.";

pub fn build_signin_pipeline() -> FlowResult<Pipeline<SigninCtxData, AppError>> {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("fetch_user_by_email", false, None),
    ("verify_user_password", false, None),
    ("issue_session_token", false, None),
  ])?;

  signin_p.on("validate_signin_input", validate_signin_input)?;
  signin_p.on("fetch_user_by_email", fetch_user_by_email)?;
  signin_p.on("verify_user_password", verify_user_password)?;
  signin_p.on("issue_session_token", issue_session_token)?;

  Ok(signin_p)
}

pub fn register_signin_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  flows.register_pipeline(build_signin_pipeline()?);
  info!("Sign-in pipeline registered.");
  Ok(())
}

#[instrument(name = "signin::validate_signin_input", skip_all, err(Display))]
async fn validate_signin_input(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  if !guard.email.contains('@') {
    warn!("Invalid email format provided for sign-in.");
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }
  if guard.password.is_empty() {
    return Err(AppError::Validation("Password is required.".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signin::fetch_user_by_email", skip_all, err(Display))]
async fn fetch_user_by_email(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (email, users) = {
    let guard = ctx_data.read();
    (guard.email.clone(), guard.stores.users.clone())
  };

  match users.find_by_email(&email).await? {
    Some(user) => {
      event!(Level::DEBUG, user_id = user.id, "User found for sign-in.");
      ctx_data.write().user = Some(user);
      Ok(PipelineControl::Continue)
    }
    None => {
      warn!(%email, "Sign-in for unknown email.");
      Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
    }
  }
}

#[instrument(name = "signin::verify_user_password", skip_all, err(Display))]
async fn verify_user_password(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (user_id, stored_hash, password) = {
    let guard = ctx_data.read();
    let user = guard
      .user
      .as_ref()
      .ok_or_else(|| AppError::Internal("user missing from sign-in context".to_string()))?;
    (user.id, user.password_hash.clone(), guard.password.clone())
  };

  if auth_service::verify_password(&stored_hash, &password)? {
    Ok(PipelineControl::Continue)
  } else {
    warn!(user_id, "Password mismatch on sign-in.");
    Err(AppError::Auth(BAD_CREDENTIALS.to_string()))
  }
}

#[instrument(name = "signin::issue_session_token", skip_all, err(Display))]
async fn issue_session_token(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (user_id, ttl, sessions) = {
    let guard = ctx_data.read();
    let user_id = guard
      .user
      .as_ref()
      .map(|user| user.id)
      .ok_or_else(|| AppError::Internal("user missing from sign-in context".to_string()))?;
    (user_id, guard.session_ttl, guard.stores.sessions.clone())
  };

  let expires_at = Utc::now()
    .checked_add_signed(ttl)
    .ok_or_else(|| AppError::Internal("session expiry is out of range".to_string()))?;
  let token = auth_service::new_session_token();
  let session = sessions.create(&token, user_id, expires_at).await?;

  info!(user_id, expires_at = %session.expires_at, "Session issued.");
  ctx_data.write().session = Some(session);
  Ok(PipelineControl::Continue)
}
