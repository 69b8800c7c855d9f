// shop/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: i64,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub phone_number: Option<String>,
  pub is_verified: bool,
  pub is_admin: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl User {
  pub fn role(&self) -> Role {
    Role::from_admin_flag(self.is_admin)
  }
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub password_hash: String,
  pub phone_number: Option<String>,
  pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  User,
}

impl Role {
  pub fn from_admin_flag(is_admin: bool) -> Self {
    if is_admin {
      Role::Admin
    } else {
      Role::User
    }
  }
}
