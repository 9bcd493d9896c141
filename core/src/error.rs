// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;

/// Every failure the storefront flows can report.
///
/// The variants follow the request boundary's needs: each one knows its
/// stable [`code`](ShopError::code) so clients can match on it without
/// parsing messages.
#[derive(Debug, Error)]
pub enum ShopError {
  #[error("{0}")]
  Validation(String),

  #[error("Quantity must be at least 1 (got {0})")]
  InvalidQuantity(i64),

  #[error("Product {0} not found")]
  ProductNotFound(Uuid),

  #[error("Cart not found")]
  CartNotFound,

  #[error("Cart item for product {0} not found")]
  CartItemNotFound(Uuid),

  #[error("Order not found for reference '{0}'")]
  OrderNotFound(String),

  #[error("No shopper identity was supplied")]
  IdentityMissing,

  #[error("Email not verified")]
  EmailNotVerified,

  #[error("{0}")]
  RateLimited(String),

  #[error("Payment was not successful (gateway status '{0}')")]
  PaymentDeclined(String),

  #[error("Payment gateway error: {0}")]
  Gateway(#[from] GatewayError),

  #[error("Mail delivery failed: {0}")]
  Mail(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Storage failure: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },

  #[error("Workflow misconfigured at step '{step_name}': {message}")]
  Workflow { step_name: String, message: String },
}

impl ShopError {
  /// Machine-checkable key surfaced alongside the message.
  pub fn code(&self) -> &'static str {
    match self {
      ShopError::Validation(_) => "validation_error",
      ShopError::InvalidQuantity(_) => "invalid_quantity",
      ShopError::ProductNotFound(_) => "product_not_found",
      ShopError::CartNotFound => "cart_not_found",
      ShopError::CartItemNotFound(_) => "cart_item_not_found",
      ShopError::OrderNotFound(_) => "order_not_found",
      ShopError::IdentityMissing => "identity_missing",
      ShopError::EmailNotVerified => "email_not_verified",
      ShopError::RateLimited(_) => "rate_limited",
      ShopError::PaymentDeclined(_) => "payment_declined",
      ShopError::Gateway(_) => "external_service_error",
      ShopError::Mail(_) => "external_service_error",
      ShopError::Conflict(_) => "conflict",
      ShopError::Storage { .. } => "internal_error",
      ShopError::Workflow { .. } => "internal_error",
    }
  }

  pub fn storage(source: impl Into<AnyhowError>) -> Self {
    ShopError::Storage { source: source.into() }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    ShopError::Validation(message.into())
  }

  /// A merged or requested quantity that no longer fits the stored integer.
  pub fn quantity_too_large() -> Self {
    ShopError::validation("Quantity is too large")
  }
}

pub type ShopResult<T, E = ShopError> = std::result::Result<T, E>;
