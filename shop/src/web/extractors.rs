// shop/src/web/extractors.rs

//! Request guards resolving the `Authorization: Bearer <token>` header.

use crate::errors::AppError;
use crate::models::{Role, Session};
use crate::state::AppState;
use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

/// The caller behind a valid, unexpired session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: i64,
  pub email: String,
  pub role: Role,
}

impl From<Session> for AuthenticatedUser {
  fn from(session: Session) -> Self {
    Self {
      user_id: session.user_id,
      role: session.role(),
      email: session.email,
    }
  }
}

fn bearer_token(req: &HttpRequest) -> Result<String, AppError> {
  let value = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::Auth("Authorization header is required.".to_string()))?;

  match value.split_once(' ') {
    Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
      Ok(token.trim().to_string())
    }
    _ => Err(AppError::Auth("Authorization header must be 'Bearer <token>'.".to_string())),
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let token = bearer_token(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();

    Box::pin(async move {
      let token = token.inspect_err(|_| warn!("Request without a usable bearer token."))?;
      let state = state.ok_or_else(|| AppError::Internal("application state not configured".to_string()))?;
      let session = state.auth.authenticate(&token).await?;
      Ok(AuthenticatedUser::from(session))
    })
  }
}

/// An authenticated caller whose role is `Admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let user = AuthenticatedUser::from_request(req, payload);

    Box::pin(async move {
      let user = user.await?;
      if user.role != Role::Admin {
        warn!(user_id = user.user_id, "Admin route refused for non-admin.");
        return Err(AppError::Auth("Administrator access required.".to_string()));
      }
      Ok(AdminUser(user))
    })
  }
}
