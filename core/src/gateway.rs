// core/src/gateway.rs

//! The external payment provider as seen by checkout and reconciliation.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Body of a payment-initialization call. `amount` is in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentInit {
  pub email: String,
  pub amount: i64,
  pub reference: String,
  pub callback_url: String,
}

/// Hosted payment page the shopper is redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSession {
  pub authorization_url: String,
  pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayTransaction {
  /// Provider-assigned transaction id.
  pub id: String,
  pub status: String,
  pub reference: String,
}

impl GatewayTransaction {
  pub fn is_success(&self) -> bool {
    self.status == "success"
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
  #[error("gateway unreachable: {0}")]
  Transport(String),

  #[error("gateway rejected the request with status {status}: {message}")]
  Rejected { status: u16, message: String },

  #[error("unexpected gateway response: {0}")]
  Malformed(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn initialize(&self, request: &PaymentInit) -> Result<PaymentSession, GatewayError>;

  async fn verify(&self, reference: &str) -> Result<GatewayTransaction, GatewayError>;
}
