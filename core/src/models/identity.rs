// core/src/models/identity.rs

use crate::error::{ShopError, ShopResult};
use uuid::Uuid;

pub type UserId = Uuid;

/// Longest anonymous identifier a cart can be keyed by.
pub const MAX_GUEST_ID_CHARS: usize = 100;

/// Who a cart belongs to: exactly one of a signed-in user or an anonymous identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CartOwner {
  User(UserId),
  Guest(String),
}

impl std::fmt::Display for CartOwner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      CartOwner::User(id) => write!(f, "user:{}", id),
      CartOwner::Guest(guest) => write!(f, "guest:{}", guest),
    }
  }
}

/// The raw identity a request carries. Both parts may be present; the user wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentitySignal {
  pub user: Option<UserId>,
  pub guest: Option<String>,
}

impl IdentitySignal {
  pub fn anonymous() -> Self {
    Self::default()
  }

  pub fn for_user(user: UserId) -> Self {
    Self {
      user: Some(user),
      guest: None,
    }
  }

  pub fn for_guest(guest: impl Into<String>) -> Self {
    Self {
      user: None,
      guest: Some(guest.into()),
    }
  }

  /// Reduces the signal to a single owner. Blank guest identifiers count as absent;
  /// overlong ones are rejected.
  pub fn owner(&self) -> ShopResult<Option<CartOwner>> {
    if let Some(user) = self.user {
      return Ok(Some(CartOwner::User(user)));
    }
    let guest = match self.guest.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
      Some(guest) => guest,
      None => return Ok(None),
    };
    if guest.chars().count() > MAX_GUEST_ID_CHARS {
      return Err(ShopError::validation(format!(
        "Guest identifier must be at most {} characters",
        MAX_GUEST_ID_CHARS
      )));
    }
    Ok(Some(CartOwner::Guest(guest.to_string())))
  }

  pub fn require_owner(&self) -> ShopResult<CartOwner> {
    self.owner()?.ok_or(ShopError::IdentityMissing)
  }
}
