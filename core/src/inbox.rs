// core/src/inbox.rs

use crate::error::{ShopError, ShopResult};
use crate::models::{CustomerMessage, NewCustomerMessage};
use crate::store::ShopStore;
use std::sync::Arc;
use tracing::{info, instrument};

pub const MAX_NAME_CHARS: usize = 30;
pub const MAX_EMAIL_CHARS: usize = 30;

/// Checks a contact-form submission, returning the cleaned message.
pub fn validate_message(message: NewCustomerMessage) -> ShopResult<NewCustomerMessage> {
  let name = message.name.trim().to_string();
  let email = message.email.trim().to_string();
  let body = message.message.trim().to_string();

  let name_len = name.chars().count();
  if name_len == 0 || name_len > MAX_NAME_CHARS {
    return Err(ShopError::validation(format!(
      "Name must be between 1 and {} characters",
      MAX_NAME_CHARS
    )));
  }
  let email_len = email.chars().count();
  if !(3..=MAX_EMAIL_CHARS).contains(&email_len) || !email.contains('@') {
    return Err(ShopError::validation("Enter a valid email address"));
  }
  if body.is_empty() {
    return Err(ShopError::validation("Message cannot be empty"));
  }

  Ok(NewCustomerMessage {
    name,
    email,
    message: body,
  })
}

#[derive(Clone)]
pub struct Inbox {
  store: Arc<dyn ShopStore>,
}

impl Inbox {
  pub fn new(store: Arc<dyn ShopStore>) -> Self {
    Self { store }
  }

  #[instrument(name = "Inbox::submit", skip_all)]
  pub async fn submit(&self, message: NewCustomerMessage) -> ShopResult<CustomerMessage> {
    let message = validate_message(message)?;
    let stored = self.store.save_message(message).await?;
    info!(message_id = %stored.id, "Customer message stored.");
    Ok(stored)
  }
}
