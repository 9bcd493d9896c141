// core/src/cart.rs

//! Cart resolution and line-item mutations.

use crate::error::{ShopError, ShopResult};
use crate::models::{Cart, CartItem, CartItemQuantity, CartLine, CartOwner, IdentitySignal, UserId};
use crate::store::ShopStore;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// A quantity as clients send it: a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
  Whole(i64),
  Fractional(f64),
  Text(String),
}

impl Default for QuantityInput {
  fn default() -> Self {
    QuantityInput::Whole(1)
  }
}

impl From<i64> for QuantityInput {
  fn from(value: i64) -> Self {
    QuantityInput::Whole(value)
  }
}

impl QuantityInput {
  /// The integer value, or `Validation` when the input is not a whole number.
  pub fn value(&self) -> ShopResult<i64> {
    match self {
      QuantityInput::Whole(n) => Ok(*n),
      QuantityInput::Fractional(f) if f.fract() == 0.0 && f.is_finite() => Ok(*f as i64),
      QuantityInput::Fractional(f) => Err(ShopError::validation(format!("Quantity must be a whole number, got {}", f))),
      QuantityInput::Text(s) => s
        .trim()
        .parse::<i64>()
        .map_err(|_| ShopError::validation(format!("Quantity must be a whole number, got '{}'", s))),
    }
  }
}

fn stored_quantity(quantity: i64) -> ShopResult<i32> {
  i32::try_from(quantity).map_err(|_| ShopError::quantity_too_large())
}

/// Maps a request's identity to exactly one cart.
#[derive(Clone)]
pub struct CartResolver {
  store: Arc<dyn ShopStore>,
}

impl CartResolver {
  pub fn new(store: Arc<dyn ShopStore>) -> Self {
    Self { store }
  }

  /// Get-or-create. Fails with `IdentityMissing` when the signal carries nothing usable.
  #[instrument(name = "CartResolver::resolve", skip(self))]
  pub async fn resolve(&self, identity: &IdentitySignal) -> ShopResult<Cart> {
    let owner = identity.require_owner()?;
    self.store.get_or_create_cart(&owner).await
  }

  /// Lookup only; never creates. No identity resolves to no cart.
  #[instrument(name = "CartResolver::find", skip(self))]
  pub async fn find(&self, identity: &IdentitySignal) -> ShopResult<Option<Cart>> {
    match identity.owner()? {
      Some(owner) => self.store.find_cart(&owner).await,
      None => Ok(None),
    }
  }
}

#[derive(Clone)]
pub struct CartService {
  store: Arc<dyn ShopStore>,
  resolver: CartResolver,
}

impl CartService {
  pub fn new(store: Arc<dyn ShopStore>) -> Self {
    Self {
      resolver: CartResolver::new(store.clone()),
      store,
    }
  }

  pub fn resolver(&self) -> &CartResolver {
    &self.resolver
  }

  /// Every item in the shopper's cart, with products as they currently are.
  #[instrument(name = "CartService::list", skip(self))]
  pub async fn list(&self, identity: &IdentitySignal) -> ShopResult<Vec<CartLine>> {
    let cart = self.resolver.resolve(identity).await?;
    self.lines_for(cart.id).await
  }

  /// Merge-add: an existing line grows by `quantity`, otherwise a new line is created.
  #[instrument(name = "CartService::add", skip(self))]
  pub async fn add(&self, identity: &IdentitySignal, product_id: Uuid, quantity: &QuantityInput) -> ShopResult<CartItem> {
    let quantity = quantity.value()?;
    if quantity < 1 {
      return Err(ShopError::validation("Quantity must be at least 1"));
    }
    let quantity = stored_quantity(quantity)?;

    let cart = self.resolver.resolve(identity).await?;
    if self.store.find_product(product_id).await?.is_none() {
      return Err(ShopError::ProductNotFound(product_id));
    }
    let item = self.store.add_cart_item(cart.id, product_id, quantity).await?;
    info!(cart_id = %cart.id, %product_id, quantity = item.quantity, "Cart item added.");
    Ok(item)
  }

  /// Replaces the stored quantity. Rejects `quantity < 1` before touching the store.
  #[instrument(name = "CartService::update", skip(self))]
  pub async fn update(
    &self,
    identity: &IdentitySignal,
    product_id: Uuid,
    quantity: &QuantityInput,
  ) -> ShopResult<CartItem> {
    let quantity = quantity.value()?;
    if quantity < 1 {
      return Err(ShopError::InvalidQuantity(quantity));
    }
    let quantity = stored_quantity(quantity)?;

    let cart = self.resolver.resolve(identity).await?;
    if self.store.find_product(product_id).await?.is_none() {
      return Err(ShopError::ProductNotFound(product_id));
    }
    let item = self
      .store
      .set_cart_item_quantity(cart.id, product_id, quantity)
      .await?
      .ok_or(ShopError::CartItemNotFound(product_id))?;
    info!(cart_id = %cart.id, %product_id, quantity, "Cart item quantity updated.");
    Ok(item)
  }

  /// Idempotent. Returns what is left in the cart either way.
  #[instrument(name = "CartService::remove", skip(self))]
  pub async fn remove(&self, identity: &IdentitySignal, product_id: Uuid) -> ShopResult<Vec<CartLine>> {
    let cart = self.resolver.resolve(identity).await?;
    if self.store.remove_cart_item(cart.id, product_id).await? {
      info!(cart_id = %cart.id, %product_id, "Cart item removed.");
    }
    self.lines_for(cart.id).await
  }

  /// Peek at one line without creating anything. Any missing piece reads as `None`.
  #[instrument(name = "CartService::item", skip(self))]
  pub async fn item(&self, identity: &IdentitySignal, product_id: Uuid) -> ShopResult<Option<CartItemQuantity>> {
    let Some(cart) = self.resolver.find(identity).await? else {
      return Ok(None);
    };
    if self.store.find_product(product_id).await?.is_none() {
      return Ok(None);
    }
    Ok(
      self
        .store
        .find_cart_item(cart.id, product_id)
        .await?
        .as_ref()
        .map(CartItemQuantity::from),
    )
  }

  /// Folds the guest's cart into the user's after sign-in and deletes the guest cart.
  #[instrument(name = "CartService::merge_guest_cart", skip(self))]
  pub async fn merge_guest_cart(&self, user: UserId, guest: &str) -> ShopResult<Vec<CartLine>> {
    let guest_owner = IdentitySignal::for_guest(guest).require_owner()?;
    let guest_cart = self.store.find_cart(&guest_owner).await?.ok_or(ShopError::CartNotFound)?;
    let user_cart = self.store.get_or_create_cart(&CartOwner::User(user)).await?;

    let merged = self.store.absorb_cart(guest_cart.id, user_cart.id).await?;
    info!(
      from = %guest_cart.id,
      into = %user_cart.id,
      items = merged.len(),
      "Guest cart merged into user cart."
    );
    self.lines_for(user_cart.id).await
  }

  async fn lines_for(&self, cart_id: Uuid) -> ShopResult<Vec<CartLine>> {
    let items = self.store.cart_items(cart_id).await?;
    if items.is_empty() {
      return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = self
      .store
      .products_by_ids(&ids)
      .await?
      .into_iter()
      .map(|p| (p.id, p))
      .collect();

    Ok(
      items
        .into_iter()
        .filter_map(|item| {
          products.get(&item.product_id).map(|product| CartLine {
            id: item.id,
            product: product.clone(),
            quantity: item.quantity,
          })
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quantity_accepts_numbers_and_numeric_strings() {
    assert_eq!(QuantityInput::Whole(3).value().unwrap(), 3);
    assert_eq!(QuantityInput::Text(" 4 ".into()).value().unwrap(), 4);
    assert_eq!(QuantityInput::Fractional(2.0).value().unwrap(), 2);
    assert_eq!(QuantityInput::default().value().unwrap(), 1);
  }

  #[test]
  fn quantity_rejects_garbage() {
    assert!(matches!(QuantityInput::Text("two".into()).value(), Err(ShopError::Validation(_))));
    assert!(matches!(QuantityInput::Fractional(1.5).value(), Err(ShopError::Validation(_))));
  }
}
