// core/src/mail.rs

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  pub to: String,
  pub subject: String,
  pub html_body: String,
}

/// Outbound email delivery. Failures are reported as plain messages.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, mail: OutgoingMail) -> Result<(), String>;
}
