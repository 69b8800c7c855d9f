// shop/src/pipelines/signup_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::NewUser;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use instashop_flow::{ContextData, FlowRegistry, FlowResult, Pipeline, PipelineControl};
use tracing::{event, info, instrument, warn, Level};

pub fn build_signup_pipeline() -> FlowResult<Pipeline<SignupCtxData, AppError>> {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("create_user", false, None),
  ])?;

  signup_p.on("validate_signup_input", validate_signup_input)?;
  signup_p.on("check_existing_user", check_existing_user)?;
  signup_p.on("create_user", create_user)?;

  Ok(signup_p)
}

pub fn register_signup_pipeline(flows: &FlowRegistry<AppError>) -> FlowResult<()> {
  flows.register_pipeline(build_signup_pipeline()?);
  info!("Sign-up pipeline registered.");
  Ok(())
}

#[instrument(name = "signup::validate_signup_input", skip_all, err(Display))]
async fn validate_signup_input(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();

  event!(Level::DEBUG, email = %guard.email, "Validating signup input.");
  if !guard.email.contains('@') {
    warn!("Invalid email format provided for signup.");
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }
  if guard.password.len() < 8 {
    warn!("Password too short for signup ({} chars).", guard.password.len());
    return Err(AppError::Validation(
      "Password must be at least 8 characters long.".to_string(),
    ));
  }
  if guard.first_name.trim().is_empty() || guard.last_name.trim().is_empty() {
    return Err(AppError::Validation("First and last name are required.".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::check_existing_user", skip_all, err(Display))]
async fn check_existing_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (email, users) = {
    let guard = ctx_data.read();
    (guard.email.clone(), guard.stores.users.clone())
  };

  if users.email_exists(&email).await? {
    warn!(%email, "Signup attempted with an existing email.");
    return Err(AppError::Validation("email already in use".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::create_user", skip_all, err(Display))]
async fn create_user(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (new_user, password, users) = {
    let guard = ctx_data.read();
    let new_user = NewUser {
      email: guard.email.clone(),
      first_name: guard.first_name.trim().to_string(),
      last_name: guard.last_name.trim().to_string(),
      password_hash: String::new(),
      phone_number: guard.phone_number.clone(),
      is_admin: false,
    };
    (new_user, guard.password.clone(), guard.stores.users.clone())
  };

  let password_hash = auth_service::hash_password(&password)?;
  let user = users.create(NewUser { password_hash, ..new_user }).await?;

  info!(user_id = user.id, email = %user.email, "User created.");
  ctx_data.write().created_user = Some(user);
  Ok(PipelineControl::Continue)
}
