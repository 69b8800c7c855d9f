// shop/src/models/session.rs

use super::user::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A bearer token issued at login.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Session {
  pub token: String,
  pub user_id: i64,
  pub email: String,
  pub is_admin: bool,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn role(&self) -> Role {
    Role::from_admin_flag(self.is_admin)
  }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expires_at <= now
  }
}
