// shop/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Longest accepted session lifetime: one hundred years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

impl FromStr for LogFormat {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "pretty" | "text" => Ok(LogFormat::Pretty),
      "json" => Ok(LogFormat::Json),
      other => Err(AppError::Config(format!("Invalid LOG_FORMAT '{}': expected 'pretty' or 'json'", other))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs the server on the in-memory store.
  pub database_url: Option<String>,
  pub db_max_connections: u32,
  pub run_migrations: bool,
  pub session_ttl_hours: i64,
  pub restock_on_cancel: bool,
  pub seed_db: bool,
  pub seed_admin_email: Option<String>,
  pub seed_admin_password: Option<String>,
  pub log_format: LogFormat,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: None,
      db_max_connections: 5,
      run_migrations: true,
      session_ttl_hours: 24,
      restock_on_cancel: true,
      seed_db: false,
      seed_admin_email: None,
      seed_admin_password: None,
      log_format: LogFormat::Pretty,
    }
  }
}

impl AppConfig {
  /// Loads `.env` if present, then reads the process environment.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the config from any variable source. Unset variables take their defaults.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let defaults = Self::default();
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());

    fn parsed<T: FromStr>(var_name: &str, raw: Option<String>, default: T) -> Result<T>
    where
      T::Err: std::fmt::Display,
    {
      match raw {
        Some(value) => value
          .trim()
          .parse::<T>()
          .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, value, e))),
        None => Ok(default),
      }
    }

    let session_ttl_hours = parsed("SESSION_TTL_HOURS", get_env("SESSION_TTL_HOURS"), defaults.session_ttl_hours)?;
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&session_ttl_hours) {
      return Err(AppError::Config(format!(
        "SESSION_TTL_HOURS must be between 1 and {}",
        MAX_SESSION_TTL_HOURS
      )));
    }
    let db_max_connections = parsed("DB_MAX_CONNECTIONS", get_env("DB_MAX_CONNECTIONS"), defaults.db_max_connections)?;
    if db_max_connections == 0 {
      return Err(AppError::Config("DB_MAX_CONNECTIONS must be at least 1".to_string()));
    }

    let config = Self {
      server_host: get_env("SERVER_HOST").unwrap_or(defaults.server_host),
      server_port: parsed("SERVER_PORT", get_env("SERVER_PORT"), defaults.server_port)?,
      database_url: get_env("DATABASE_URL"),
      db_max_connections,
      run_migrations: parsed("RUN_MIGRATIONS", get_env("RUN_MIGRATIONS"), defaults.run_migrations)?,
      session_ttl_hours,
      restock_on_cancel: parsed("RESTOCK_ON_CANCEL", get_env("RESTOCK_ON_CANCEL"), defaults.restock_on_cancel)?,
      seed_db: parsed("SEED_DB", get_env("SEED_DB"), defaults.seed_db)?,
      seed_admin_email: get_env("SEED_ADMIN_EMAIL"),
      seed_admin_password: get_env("SEED_ADMIN_PASSWORD"),
      log_format: match get_env("LOG_FORMAT") {
        Some(raw) => raw.parse()?,
        None => defaults.log_format,
      },
    };

    tracing::debug!(
      server_host = %config.server_host,
      server_port = config.server_port,
      persistent = config.database_url.is_some(),
      restock_on_cancel = config.restock_on_cancel,
      "Application configuration loaded."
    );
    Ok(config)
  }

  pub fn server_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }

  pub fn session_ttl(&self) -> Result<chrono::Duration> {
    chrono::Duration::try_hours(self.session_ttl_hours)
      .ok_or_else(|| AppError::Config(format!("SESSION_TTL_HOURS {} is out of range", self.session_ttl_hours)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    AppConfig::from_lookup(|k| map.get(k).cloned())
  }

  #[test]
  fn empty_environment_gives_defaults() {
    let cfg = load(&[]).unwrap();
    assert_eq!(cfg.server_address(), "127.0.0.1:8080");
    assert!(cfg.database_url.is_none());
    assert!(cfg.restock_on_cancel);
    assert_eq!(cfg.session_ttl().unwrap(), chrono::Duration::hours(24));
    assert_eq!(cfg.log_format, LogFormat::Pretty);
  }

  #[test]
  fn values_override_defaults() {
    let cfg = load(&[
      ("SERVER_PORT", "9000"),
      ("DATABASE_URL", "postgres://localhost/shop"),
      ("RESTOCK_ON_CANCEL", "false"),
      ("SESSION_TTL_HOURS", "2"),
      ("LOG_FORMAT", "JSON"),
      ("SEED_DB", "true"),
    ])
    .unwrap();
    assert_eq!(cfg.server_port, 9000);
    assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/shop"));
    assert!(!cfg.restock_on_cancel);
    assert_eq!(cfg.session_ttl_hours, 2);
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert!(cfg.seed_db);
  }

  #[test]
  fn blank_values_count_as_unset() {
    let cfg = load(&[("DATABASE_URL", "  ")]).unwrap();
    assert!(cfg.database_url.is_none());
  }

  #[test]
  fn invalid_values_are_config_errors() {
    for vars in [
      vec![("SERVER_PORT", "eighty")],
      vec![("RESTOCK_ON_CANCEL", "sometimes")],
      vec![("SESSION_TTL_HOURS", "0")],
      vec![("SESSION_TTL_HOURS", "876001")],
      vec![("SESSION_TTL_HOURS", "9223372036854775807")],
      vec![("LOG_FORMAT", "xml")],
    ] {
      assert!(matches!(load(&vars), Err(AppError::Config(_))), "{vars:?}");
    }
  }

  #[test]
  fn longest_session_ttl_is_accepted_and_converts() {
    let cfg = load(&[("SESSION_TTL_HOURS", "876000")]).unwrap();
    assert_eq!(cfg.session_ttl().unwrap(), chrono::Duration::hours(MAX_SESSION_TTL_HOURS));
  }

  #[test]
  fn out_of_range_ttl_set_directly_is_a_config_error() {
    let cfg = AppConfig {
      session_ttl_hours: i64::MAX,
      ..AppConfig::default()
    };
    assert!(matches!(cfg.session_ttl(), Err(AppError::Config(_))));
  }
}
