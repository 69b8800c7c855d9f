// shop/src/services/auth_service.rs

//! Password hashing, session tokens and the sign-up / sign-in workflows.

use crate::errors::{AppError, Result as AppResult}; // Application-specific error type
use crate::models::{Session, User};
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::store::Stores;
use argon2::{
  password_hash::{
    rand_core::OsRng, // For generating random salts
    PasswordHash,
    PasswordHasher,   // The main trait for hashing
    PasswordVerifier, // The main trait for verifying
    SaltString,
  },
  Argon2,
};
use chrono::Utc;
use instashop_flow::{ContextData, FlowRegistry, PipelineResult};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Hashes a plain-text password into an Argon2 PHC string.
///
/// # Arguments
/// * `password`: The plain-text password to hash.
///
/// # Returns
/// The PHC string, salt included, or `Validation` for an empty password.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty for hashing.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Checks `provided_password` against a stored hash. A mismatch is `Ok(false)`;
/// a malformed stored hash is an internal error.
#[instrument(
  name = "auth_service::verify_password",
  skip(hashed_password_str, provided_password),
  err(Display),
  fields(hash_len = hashed_password_str.len())
)]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other) => {
      error!(error = %other, "Argon2 password verification encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {}", other)))
    }
  }
}

/// A fresh opaque bearer token.
pub fn new_session_token() -> String {
  Uuid::new_v4().simple().to_string()
}

pub struct SignupInput {
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
  pub phone_number: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
  flows: Arc<FlowRegistry<AppError>>,
  stores: Stores,
  session_ttl: chrono::Duration,
}

impl AuthService {
  pub fn new(flows: Arc<FlowRegistry<AppError>>, stores: Stores, session_ttl: chrono::Duration) -> Self {
    Self {
      flows,
      stores,
      session_ttl,
    }
  }

  /// Registers a new account with the `User` role.
  ///
  /// # Arguments
  /// * `input`: Account details. The email is trimmed and lower-cased before use.
  ///
  /// # Returns
  /// The created user. The password is stored only as an Argon2 hash.
  ///
  /// # Errors
  /// `Validation` for a malformed email, a password under eight characters,
  /// missing names or an email that is already registered.
  #[instrument(name = "AuthService::signup", skip_all, fields(email = %input.email), err(Display))]
  pub async fn signup(&self, input: SignupInput) -> AppResult<User> {
    let ctx_data = ContextData::new(SignupCtxData {
      stores: self.stores.clone(),
      email: input.email.trim().to_lowercase(),
      password: input.password,
      first_name: input.first_name,
      last_name: input.last_name,
      phone_number: input.phone_number,
      created_user: None,
    });

    let outcome = self.flows.run(ctx_data.clone()).await?;
    ensure_completed(outcome, "sign-up")?;

    let user = ctx_data.write().created_user.take();
    user.ok_or_else(|| AppError::Internal("sign-up completed without creating a user".to_string()))
  }

  /// Checks the credentials and issues a session token.
  ///
  /// # Arguments
  /// * `email`: The account email, matched case-insensitively.
  /// * `password`: The plain-text password.
  ///
  /// # Returns
  /// A session whose `expires_at` lies one session lifetime ahead.
  ///
  /// # Errors
  /// `Auth` for an unknown email or a wrong password (the message does not
  /// say which), `Internal` when the expiry cannot be represented.
  #[instrument(name = "AuthService::login", skip_all, fields(email = %email), err(Display))]
  pub async fn login(&self, email: &str, password: &str) -> AppResult<Session> {
    let ctx_data = ContextData::new(SigninCtxData {
      stores: self.stores.clone(),
      email: email.trim().to_lowercase(),
      password: password.to_string(),
      session_ttl: self.session_ttl,
      user: None,
      session: None,
    });

    let outcome = self.flows.run(ctx_data.clone()).await?;
    ensure_completed(outcome, "sign-in")?;

    let session = ctx_data.write().session.take();
    session.ok_or_else(|| AppError::Internal("sign-in completed without a session".to_string()))
  }

  /// Resolves a bearer token to its unexpired session.
  #[instrument(name = "AuthService::authenticate", skip_all, err(Display))]
  pub async fn authenticate(&self, token: &str) -> AppResult<Session> {
    let session = self
      .stores
      .sessions
      .find(token)
      .await?
      .ok_or_else(|| AppError::Auth("Invalid or expired session token.".to_string()))?;

    if session.is_expired_at(Utc::now()) {
      warn!(user_id = session.user_id, "Expired session token presented.");
      return Err(AppError::Auth("Invalid or expired session token.".to_string()));
    }
    Ok(session)
  }

  /// Loads the account behind a session. `NotFound` if it was removed.
  pub async fn user_details(&self, user_id: i64) -> AppResult<User> {
    self
      .stores
      .users
      .find_by_id(user_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
  }
}

fn ensure_completed(outcome: PipelineResult, workflow: &str) -> AppResult<()> {
  if outcome.is_completed() {
    info!(workflow, "Workflow completed.");
    Ok(())
  } else {
    warn!(workflow, "Workflow was halted by a step.");
    Err(AppError::Internal(format!("{} was halted by an internal step", workflow)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hashed_password_verifies_and_rejects_others() {
    let hash = hash_password("correct horse").expect("hash");
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password(&hash, "correct horse").expect("verify"));
    assert!(!verify_password(&hash, "wrong horse").expect("verify"));
    assert!(!verify_password(&hash, "").expect("verify"));
  }

  #[test]
  fn same_password_hashes_differently() {
    assert_ne!(hash_password("password1").unwrap(), hash_password("password1").unwrap());
  }

  #[test]
  fn malformed_stored_hash_is_internal() {
    assert!(matches!(verify_password("not-a-hash", "whatever"), Err(AppError::Internal(_))));
  }

  #[test]
  fn empty_password_is_not_hashed() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn session_tokens_are_unique_simple_uuids() {
    let a = new_session_token();
    assert_eq!(a.len(), 32);
    assert_ne!(a, new_session_token());
  }
}
