// shop/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use instashop::config::{AppConfig, LogFormat};
use instashop::services::seed_service;
use instashop::state::AppState;
use instashop::store::Stores;
use instashop::web;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);

  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

async fn connect_stores(config: &AppConfig) -> anyhow::Result<Stores> {
  let Some(database_url) = config.database_url.as_deref() else {
    tracing::warn!("DATABASE_URL not set; using the in-memory store. Data is lost on shutdown.");
    return Ok(Stores::in_memory());
  };

  let pool = PgPoolOptions::new()
    .max_connections(config.db_max_connections)
    .connect(database_url)
    .await
    .context("failed to connect to the database")?;
  tracing::info!("Successfully connected to the database.");

  if config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .context("failed to run database migrations")?;
    tracing::info!("Database migrations applied.");
  }

  Ok(Stores::postgres(pool))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = Arc::new(AppConfig::from_env().context("failed to load configuration")?);
  init_tracing(app_config.log_format);
  tracing::info!("Starting instashop server...");

  let stores = connect_stores(&app_config).await?;

  if app_config.seed_db {
    seed_service::seed(&stores, &app_config)
      .await
      .context("failed to seed the database")?;
  }

  let app_state = AppState::build(app_config.clone(), stores).context("failed to build application state")?;

  let server_address = app_config.server_address();
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(web::json_config())
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("failed to bind {}", server_address))?
  .run()
  .await
  .context("server terminated with an error")
}
