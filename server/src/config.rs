// server/src/config.rs

use crate::errors::{AppError, Result};
use atelier::ShopSettings;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  pub paystack_base_url: String,
  pub paystack_secret_key: String,
  pub paystack_callback_url: String,
  pub gateway_timeout: Duration,

  pub require_email_verification: bool,
  pub mail_sender: String,

  pub guest_cookie_name: String,
  pub access_cookie_name: String,

  pub run_migrations: bool,
  pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &"[REDACTED]")
      .field("paystack_base_url", &self.paystack_base_url)
      .field("paystack_secret_key", &"[REDACTED]")
      .field("paystack_callback_url", &self.paystack_callback_url)
      .field("gateway_timeout", &self.gateway_timeout)
      .field("require_email_verification", &self.require_email_verification)
      .field("guest_cookie_name", &self.guest_cookie_name)
      .field("access_cookie_name", &self.access_cookie_name)
      .field("run_migrations", &self.run_migrations)
      .field("log_format", &self.log_format)
      .finish_non_exhaustive()
  }
}

fn parse_bool(var_name: &str, raw: &str) -> Result<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    other => Err(AppError::Config(format!("Invalid {} value: '{}'", var_name, other))),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let or_default = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|_| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port = or_default("SERVER_PORT", "8080")
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let paystack_base_url = or_default("PAYSTACK_BASE_URL", "https://api.paystack.co")
      .trim_end_matches('/')
      .to_string();
    let paystack_secret_key = get_env("PAYSTACK_SECRET_KEY")?;
    let paystack_callback_url = get_env("PAYSTACK_CALLBACK_URL")?;
    let gateway_timeout = or_default("GATEWAY_TIMEOUT_SECS", "10")
      .parse::<u64>()
      .map(Duration::from_secs)
      .map_err(|e| AppError::Config(format!("Invalid GATEWAY_TIMEOUT_SECS: {}", e)))?;

    let require_email_verification = parse_bool(
      "REQUIRE_EMAIL_VERIFICATION",
      &or_default("REQUIRE_EMAIL_VERIFICATION", "true"),
    )?;
    let mail_sender = or_default("MAIL_SENDER", "noreply@example.com");

    let guest_cookie_name = or_default("GUEST_COOKIE_NAME", "temporary_user");
    let access_cookie_name = or_default("ACCESS_COOKIE_NAME", "access_token");

    let run_migrations = parse_bool("RUN_MIGRATIONS", &or_default("RUN_MIGRATIONS", "true"))?;
    let log_format = match or_default("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      "pretty" | "text" => LogFormat::Pretty,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT: '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      paystack_base_url,
      paystack_secret_key,
      paystack_callback_url,
      gateway_timeout,
      require_email_verification,
      mail_sender,
      guest_cookie_name,
      access_cookie_name,
      run_migrations,
      log_format,
    })
  }

  pub fn shop_settings(&self) -> ShopSettings {
    ShopSettings {
      require_email_verification: self.require_email_verification,
      callback_url: self.paystack_callback_url.clone(),
      ..ShopSettings::default()
    }
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}
