// server/src/services/mailer.rs

use async_trait::async_trait;
use atelier::{Mailer, OutgoingMail};
use tracing::{info, instrument, warn};

/// Mailer that records outgoing mail in the logs instead of handing it to a provider.
#[derive(Debug, Clone)]
pub struct LoggingMailer {
  sender: String,
}

impl LoggingMailer {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }
}

#[async_trait]
impl Mailer for LoggingMailer {
  #[instrument(name = "LoggingMailer::send", skip(self, mail), fields(to = %mail.to, subject = %mail.subject))]
  async fn send(&self, mail: OutgoingMail) -> Result<(), String> {
    if !mail.to.contains('@') {
      warn!("Refusing to send mail to an address without '@'.");
      return Err(format!("invalid recipient '{}'", mail.to));
    }

    let message_id = format!("local-{}", uuid::Uuid::new_v4());
    let preview: String = mail.html_body.chars().take(50).collect();
    info!(from = %self.sender, %message_id, body_preview = %preview, "Mail handed off.");
    Ok(())
  }
}
