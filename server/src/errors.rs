// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use atelier::{GatewayError, ShopError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Shop(#[from] ShopError),

  /// Malformed request that never reached the storefront (bad JSON, bad path segment).
  #[error("{0}")]
  BadRequest(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  fn code(&self) -> &'static str {
    match self {
      AppError::Shop(e) => e.code(),
      AppError::BadRequest(_) => "validation_error",
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => "internal_error",
    }
  }

  /// Message safe to show the client. Internal detail stays in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Shop(ShopError::Storage { .. }) | AppError::Shop(ShopError::Workflow { .. }) => {
        "An internal error occurred".to_string()
      }
      AppError::Shop(ShopError::Gateway(GatewayError::Rejected { message, .. })) => {
        format!("Payment provider rejected the request: {}", message)
      }
      AppError::Shop(ShopError::Gateway(_)) => "Payment provider is unavailable".to_string(),
      AppError::Shop(ShopError::Mail(_)) => "Failed to send email".to_string(),
      AppError::Shop(e) => e.to_string(),
      AppError::BadRequest(m) => m.clone(),
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => "An internal error occurred".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Shop(e) => match e {
        ShopError::Validation(_)
        | ShopError::InvalidQuantity(_)
        | ShopError::IdentityMissing
        | ShopError::PaymentDeclined(_) => StatusCode::BAD_REQUEST,
        ShopError::ProductNotFound(_)
        | ShopError::CartNotFound
        | ShopError::CartItemNotFound(_)
        | ShopError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        ShopError::EmailNotVerified => StatusCode::FORBIDDEN,
        ShopError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        ShopError::Conflict(_) => StatusCode::CONFLICT,
        ShopError::Gateway(GatewayError::Rejected { .. }) => StatusCode::BAD_REQUEST,
        ShopError::Gateway(_) => StatusCode::BAD_GATEWAY,
        ShopError::Mail(_) | ShopError::Storage { .. } | ShopError::Workflow { .. } => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = ?self, "Responding with server error");
    } else {
      tracing::warn!(application_error = %self, code = self.code(), "Responding with client error");
    }
    HttpResponse::build(status).json(json!({ "error": self.public_message(), "code": self.code() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
