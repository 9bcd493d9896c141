// core/src/store/mod.rs

//! Persistence seams. Each trait is object-safe and shared behind `Arc<dyn _>`.

use crate::error::ShopResult;
use crate::models::{
  Cart, CartItem, CartOwner, CustomerMessage, NewCustomerMessage, NewOrder, NewOrderItem, Order, OrderItemView,
  OrderStatus, Product, UserId,
};
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgFlagCache, PgStore};

#[async_trait]
pub trait CatalogStore: Send + Sync {
  async fn list_products(&self) -> ShopResult<Vec<Product>>;

  async fn find_product(&self, id: Uuid) -> ShopResult<Option<Product>>;

  /// Products for the given ids, in no particular order. Unknown ids are left out.
  async fn products_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<Product>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn find_cart(&self, owner: &CartOwner) -> ShopResult<Option<Cart>>;

  /// Returns the owner's cart, creating it if needed. Concurrent callers for
  /// the same owner must all observe the same cart.
  async fn get_or_create_cart(&self, owner: &CartOwner) -> ShopResult<Cart>;

  /// Deletes the owner's cart and its items. `false` when there was none.
  async fn delete_cart(&self, owner: &CartOwner) -> ShopResult<bool>;

  async fn cart_items(&self, cart_id: Uuid) -> ShopResult<Vec<CartItem>>;

  async fn find_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<Option<CartItem>>;

  /// Adds `quantity` to the existing row or inserts a new one.
  async fn add_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> ShopResult<CartItem>;

  /// Replaces the stored quantity. `None` when the row does not exist.
  async fn set_cart_item_quantity(&self, cart_id: Uuid, product_id: Uuid, quantity: i32)
    -> ShopResult<Option<CartItem>>;

  async fn remove_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<bool>;

  /// Moves every item of `from` into `into` with merge-add semantics, then deletes `from`.
  async fn absorb_cart(&self, from: Uuid, into: Uuid) -> ShopResult<Vec<CartItem>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Persists the order and all of its items atomically.
  /// A duplicate `tx_ref` fails with `ShopError::Conflict` and writes nothing.
  async fn insert_order(&self, order: NewOrder, items: &[NewOrderItem]) -> ShopResult<Order>;

  async fn find_order_by_reference(&self, tx_ref: &str) -> ShopResult<Option<Order>>;

  async fn update_order_status(
    &self,
    order_id: Uuid,
    status: OrderStatus,
    transaction_id: Option<&str>,
  ) -> ShopResult<Order>;

  /// Newest first.
  async fn orders_for_email(&self, email: &str) -> ShopResult<Vec<Order>>;

  async fn order_items(&self, order_id: Uuid) -> ShopResult<Vec<OrderItemView>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
  async fn save_message(&self, message: NewCustomerMessage) -> ShopResult<CustomerMessage>;
}

/// Maps an access token to the signed-in user. Token issuance happens elsewhere.
#[async_trait]
pub trait UserDirectory: Send + Sync {
  async fn user_for_token(&self, token: &str) -> ShopResult<Option<UserId>>;
}

/// Everything the storefront needs from persistence.
pub trait ShopStore: CatalogStore + CartStore + OrderStore + MessageStore + UserDirectory {}

impl<T> ShopStore for T where T: CatalogStore + CartStore + OrderStore + MessageStore + UserDirectory {}
