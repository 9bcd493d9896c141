// core/src/verification.rs

//! One-time email codes gating checkout.

use crate::cache::FlagCache;
use crate::error::{ShopError, ShopResult};
use crate::mail::{Mailer, OutgoingMail};
use crate::settings::ShopSettings;
use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub fn code_key(email: &str) -> String {
  format!("verification_code:{}", email)
}

pub fn cooldown_key(email: &str) -> String {
  format!("verification_cooldown:{}", email)
}

pub fn verified_key(email: &str) -> String {
  format!("email_verified:{}", email)
}

/// Six digits, 100000..=999999, from the OS generator.
pub fn generate_code() -> String {
  (100_000 + OsRng.next_u32() % 900_000).to_string()
}

fn verification_mail(to: &str, code: &str) -> OutgoingMail {
  OutgoingMail {
    to: to.to_string(),
    subject: "Your Atelier verification code".to_string(),
    html_body: format!(
      "<div style=\"font-family:Arial,sans-serif;max-width:500px;margin:auto;padding:20px;\">\
       <h2>Atelier</h2>\
       <p>Your verification code is: <strong style=\"font-size:24px;\">{}</strong></p>\
       <p>If you didn't request this, please ignore this email.</p>\
       </div>",
      code
    ),
  }
}

/// A submitted code as clients send it: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CodeInput {
  Number(i64),
  Text(String),
}

impl Default for CodeInput {
  fn default() -> Self {
    CodeInput::Text(String::new())
  }
}

impl std::fmt::Display for CodeInput {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CodeInput::Number(n) => write!(f, "{}", n),
      CodeInput::Text(s) => f.write_str(s),
    }
  }
}

#[derive(Clone)]
pub struct EmailVerification {
  cache: Arc<dyn FlagCache>,
  mailer: Arc<dyn Mailer>,
  settings: Arc<ShopSettings>,
}

impl EmailVerification {
  pub fn new(cache: Arc<dyn FlagCache>, mailer: Arc<dyn Mailer>, settings: Arc<ShopSettings>) -> Self {
    Self { cache, mailer, settings }
  }

  #[instrument(name = "EmailVerification::send_code", skip(self, email))]
  pub async fn send_code(&self, email: &str) -> ShopResult<()> {
    let email = email.trim();
    if email.is_empty() {
      return Err(ShopError::validation("Email is required"));
    }
    if self.cache.contains(&cooldown_key(email)).await? {
      return Err(ShopError::RateLimited("Try again after 1 minute.".to_string()));
    }

    let code = generate_code();
    self
      .cache
      .set(&code_key(email), &code, self.settings.verification_code_ttl)
      .await?;
    self
      .cache
      .set(&cooldown_key(email), "1", self.settings.verification_cooldown)
      .await?;

    if let Err(reason) = self.mailer.send(verification_mail(email, &code)).await {
      error!(%reason, "Verification email could not be delivered.");
      // Let the shopper retry straight away; the stored code stays valid.
      self.cache.delete(&cooldown_key(email)).await?;
      return Err(ShopError::Mail(reason));
    }
    info!("Verification code sent.");
    Ok(())
  }

  #[instrument(name = "EmailVerification::verify_code", skip_all)]
  pub async fn verify_code(&self, email: &str, code: &str) -> ShopResult<()> {
    let (email, code) = (email.trim(), code.trim());
    if email.is_empty() || code.is_empty() {
      return Err(ShopError::validation("Missing fields"));
    }

    match self.cache.get(&code_key(email)).await? {
      Some(saved) if saved == code => {
        self
          .cache
          .set(&verified_key(email), "1", self.settings.verified_email_ttl)
          .await?;
        self.cache.delete(&code_key(email)).await?;
        info!("Email verified.");
        Ok(())
      }
      _ => Err(ShopError::validation("Invalid verification code")),
    }
  }

}
