// core/src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::identity::{CartOwner, UserId};
use super::product::Product;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Cart {
  pub id: Uuid,
  pub user_id: Option<UserId>,
  pub guest_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Cart {
  pub fn new(owner: &CartOwner) -> Self {
    let (user_id, guest_id) = match owner {
      CartOwner::User(id) => (Some(*id), None),
      CartOwner::Guest(guest) => (None, Some(guest.clone())),
    };
    Self {
      id: Uuid::new_v4(),
      user_id,
      guest_id,
      created_at: Utc::now(),
    }
  }

  pub fn owned_by(&self, owner: &CartOwner) -> bool {
    match owner {
      CartOwner::User(id) => self.user_id == Some(*id),
      CartOwner::Guest(guest) => self.guest_id.as_deref() == Some(guest.as_str()),
    }
  }
}

/// One (cart, product) row. Unique per cart; quantity is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CartItem {
  pub id: Uuid,
  pub cart_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
}

/// A cart item with the product as it currently is in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
  pub id: Uuid,
  pub product: Product,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemQuantity {
  pub id: Uuid,
  pub quantity: i32,
}

impl From<&CartItem> for CartItemQuantity {
  fn from(item: &CartItem) -> Self {
    Self {
      id: item.id,
      quantity: item.quantity,
    }
  }
}
