// server/src/main.rs

mod config;
mod errors;
mod services;
mod state;
mod web;


use crate::config::{AppConfig, LogFormat};
use crate::errors::{AppError, Result as AppResult};
use crate::services::{LoggingMailer, PaystackGateway};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use atelier::store::{PgFlagCache, PgStore};
use atelier::{Shop, ShopDeps, ShopError};
use sqlx::PgPool;
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

/// Connects to the database and wires the storefront's collaborators.
async fn build_state(config: Arc<AppConfig>) -> AppResult<AppState> {
  let pool = PgPool::connect(&config.database_url).await?;
  tracing::info!("Successfully connected to the database.");

  let store = PgStore::new(pool.clone());
  if config.run_migrations {
    store.migrate().await?;
  }

  let gateway = PaystackGateway::new(
    &config.paystack_base_url,
    &config.paystack_secret_key,
    config.gateway_timeout,
  )
  .map_err(ShopError::from)?;

  let shop = Shop::new(ShopDeps {
    store: Arc::new(store),
    gateway: Arc::new(gateway),
    cache: Arc::new(PgFlagCache::new(pool)),
    mailer: Arc::new(LoggingMailer::new(config.mail_sender.clone())),
    settings: Arc::new(config.shop_settings()),
  });

  Ok(AppState { shop, config })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      init_tracing(LogFormat::Pretty);
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!(config = ?app_config, "Starting storefront server...");

  let app_state = build_state(app_config.clone()).await.map_err(|e: AppError| {
    tracing::error!(error = %e, "Failed to initialize the storefront.");
    std::io::Error::other(e.to_string())
  })?;

  let server_address = app_config.bind_address();
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
