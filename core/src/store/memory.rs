// core/src/store/memory.rs

//! A single-mutex in-memory store. Every trait method runs under one lock,
//! which gives the same all-or-nothing behavior the database gets from
//! transactions and unique constraints.

use super::{CartStore, CatalogStore, MessageStore, OrderStore, UserDirectory};
use crate::error::{ShopError, ShopResult};
use crate::models::{
  Cart, CartItem, CartOwner, CustomerMessage, NewCustomerMessage, NewOrder, NewOrderItem, Order, OrderItem,
  OrderItemView, OrderStatus, Product, UserId,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct MemoryState {
  products: HashMap<Uuid, Product>,
  carts: HashMap<Uuid, Cart>,
  cart_items: Vec<CartItem>,
  orders: HashMap<Uuid, Order>,
  order_items: Vec<OrderItem>,
  messages: Vec<CustomerMessage>,
  tokens: HashMap<String, UserId>,
}

impl MemoryState {
  fn cart_for(&self, owner: &CartOwner) -> Option<&Cart> {
    self.carts.values().find(|c| c.owned_by(owner))
  }

  fn merge_item(&mut self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> ShopResult<CartItem> {
    merge_into(&mut self.cart_items, cart_id, product_id, quantity)
  }
}

/// Adds onto an existing (cart, product) line or appends a new one.
fn merge_into(items: &mut Vec<CartItem>, cart_id: Uuid, product_id: Uuid, quantity: i32) -> ShopResult<CartItem> {
  if let Some(item) = items
    .iter_mut()
    .find(|i| i.cart_id == cart_id && i.product_id == product_id)
  {
    item.quantity = item
      .quantity
      .checked_add(quantity)
      .ok_or_else(ShopError::quantity_too_large)?;
    return Ok(item.clone());
  }
  let item = CartItem {
    id: Uuid::new_v4(),
    cart_id,
    product_id,
    quantity,
  };
  items.push(item.clone());
  Ok(item)
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
  state: Mutex<MemoryState>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
    let store = Self::new();
    for product in products {
      store.insert_product(product);
    }
    store
  }

  pub fn insert_product(&self, product: Product) {
    self.state.lock().products.insert(product.id, product);
  }

  pub fn remove_product(&self, product_id: Uuid) {
    let mut state = self.state.lock();
    state.products.remove(&product_id);
    state.cart_items.retain(|i| i.product_id != product_id);
    for item in state.order_items.iter_mut().filter(|i| i.product_id == Some(product_id)) {
      item.product_id = None;
    }
  }

  pub fn register_token(&self, token: impl Into<String>, user: UserId) {
    self.state.lock().tokens.insert(token.into(), user);
  }

  pub fn order_count(&self) -> usize {
    self.state.lock().orders.len()
  }

  pub fn order_item_count(&self) -> usize {
    self.state.lock().order_items.len()
  }

  pub fn cart_count(&self) -> usize {
    self.state.lock().carts.len()
  }

  pub fn messages(&self) -> Vec<CustomerMessage> {
    self.state.lock().messages.clone()
  }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
  async fn list_products(&self) -> ShopResult<Vec<Product>> {
    let mut products: Vec<Product> = self.state.lock().products.values().cloned().collect();
    products.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(products)
  }

  async fn find_product(&self, id: Uuid) -> ShopResult<Option<Product>> {
    Ok(self.state.lock().products.get(&id).cloned())
  }

  async fn products_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<Product>> {
    let state = self.state.lock();
    Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
  }
}

#[async_trait]
impl CartStore for InMemoryStore {
  async fn find_cart(&self, owner: &CartOwner) -> ShopResult<Option<Cart>> {
    Ok(self.state.lock().cart_for(owner).cloned())
  }

  async fn get_or_create_cart(&self, owner: &CartOwner) -> ShopResult<Cart> {
    let mut state = self.state.lock();
    if let Some(cart) = state.cart_for(owner) {
      return Ok(cart.clone());
    }
    let cart = Cart::new(owner);
    debug!(cart_id = %cart.id, %owner, "Created cart.");
    state.carts.insert(cart.id, cart.clone());
    Ok(cart)
  }

  async fn delete_cart(&self, owner: &CartOwner) -> ShopResult<bool> {
    let mut state = self.state.lock();
    let Some(cart_id) = state.cart_for(owner).map(|c| c.id) else {
      return Ok(false);
    };
    state.carts.remove(&cart_id);
    state.cart_items.retain(|i| i.cart_id != cart_id);
    Ok(true)
  }

  async fn cart_items(&self, cart_id: Uuid) -> ShopResult<Vec<CartItem>> {
    Ok(
      self
        .state
        .lock()
        .cart_items
        .iter()
        .filter(|i| i.cart_id == cart_id)
        .cloned()
        .collect(),
    )
  }

  async fn find_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<Option<CartItem>> {
    Ok(
      self
        .state
        .lock()
        .cart_items
        .iter()
        .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        .cloned(),
    )
  }

  async fn add_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> ShopResult<CartItem> {
    let mut state = self.state.lock();
    if !state.products.contains_key(&product_id) {
      return Err(ShopError::ProductNotFound(product_id));
    }
    if !state.carts.contains_key(&cart_id) {
      return Err(ShopError::CartNotFound);
    }
    state.merge_item(cart_id, product_id, quantity)
  }

  async fn set_cart_item_quantity(
    &self,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
  ) -> ShopResult<Option<CartItem>> {
    let mut state = self.state.lock();
    Ok(
      state
        .cart_items
        .iter_mut()
        .find(|i| i.cart_id == cart_id && i.product_id == product_id)
        .map(|item| {
          item.quantity = quantity;
          item.clone()
        }),
    )
  }

  async fn remove_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<bool> {
    let mut state = self.state.lock();
    let before = state.cart_items.len();
    state
      .cart_items
      .retain(|i| !(i.cart_id == cart_id && i.product_id == product_id));
    Ok(state.cart_items.len() != before)
  }

  async fn absorb_cart(&self, from: Uuid, into: Uuid) -> ShopResult<Vec<CartItem>> {
    let mut state = self.state.lock();
    if from == into || !state.carts.contains_key(&from) || !state.carts.contains_key(&into) {
      return Err(ShopError::CartNotFound);
    }
    // Staged on a copy so an overflowing line leaves both carts untouched.
    let (moving, mut staged): (Vec<CartItem>, Vec<CartItem>) =
      state.cart_items.iter().cloned().partition(|i| i.cart_id == from);
    for item in moving {
      merge_into(&mut staged, into, item.product_id, item.quantity)?;
    }
    state.cart_items = staged;
    state.carts.remove(&from);
    Ok(state.cart_items.iter().filter(|i| i.cart_id == into).cloned().collect())
  }
}

#[async_trait]
impl OrderStore for InMemoryStore {
  async fn insert_order(&self, order: NewOrder, items: &[NewOrderItem]) -> ShopResult<Order> {
    let mut state = self.state.lock();
    if state.orders.values().any(|o| o.tx_ref == order.tx_ref) {
      return Err(ShopError::Conflict(format!(
        "transaction reference '{}' already exists",
        order.tx_ref
      )));
    }
    if let Some(missing) = items.iter().find(|i| !state.products.contains_key(&i.product_id)) {
      return Err(ShopError::ProductNotFound(missing.product_id));
    }

    let stored = Order {
      id: Uuid::new_v4(),
      customer_name: order.customer_name,
      customer_email: order.customer_email,
      customer_phone: order.customer_phone,
      amount: order.amount,
      tx_ref: order.tx_ref,
      transaction_id: None,
      status: OrderStatus::Pending,
      created_at: Utc::now(),
    };
    for item in items {
      state.order_items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id: stored.id,
        product_id: Some(item.product_id),
        quantity: item.quantity,
      });
    }
    state.orders.insert(stored.id, stored.clone());
    Ok(stored)
  }

  async fn find_order_by_reference(&self, tx_ref: &str) -> ShopResult<Option<Order>> {
    Ok(self.state.lock().orders.values().find(|o| o.tx_ref == tx_ref).cloned())
  }

  async fn update_order_status(
    &self,
    order_id: Uuid,
    status: OrderStatus,
    transaction_id: Option<&str>,
  ) -> ShopResult<Order> {
    let mut state = self.state.lock();
    let order = state
      .orders
      .get_mut(&order_id)
      .ok_or_else(|| ShopError::OrderNotFound(order_id.to_string()))?;
    if !order.status.can_become(status) {
      return Err(ShopError::Conflict(format!(
        "order {} cannot move from {} to {}",
        order_id, order.status, status
      )));
    }
    order.status = status;
    if let Some(txn) = transaction_id {
      order.transaction_id = Some(txn.to_string());
    }
    Ok(order.clone())
  }

  async fn orders_for_email(&self, email: &str) -> ShopResult<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .state
      .lock()
      .orders
      .values()
      .filter(|o| o.customer_email == email)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(orders)
  }

  async fn order_items(&self, order_id: Uuid) -> ShopResult<Vec<OrderItemView>> {
    let state = self.state.lock();
    Ok(
      state
        .order_items
        .iter()
        .filter(|i| i.order_id == order_id)
        .map(|i| OrderItemView {
          product_id: i.product_id,
          product_name: i
            .product_id
            .and_then(|id| state.products.get(&id))
            .map(|p| p.name.clone()),
          quantity: i.quantity,
        })
        .collect(),
    )
  }
}

#[async_trait]
impl MessageStore for InMemoryStore {
  async fn save_message(&self, message: NewCustomerMessage) -> ShopResult<CustomerMessage> {
    let stored = CustomerMessage {
      id: Uuid::new_v4(),
      name: message.name,
      email: message.email,
      message: message.message,
      created_at: Utc::now(),
    };
    self.state.lock().messages.push(stored.clone());
    Ok(stored)
  }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
  async fn user_for_token(&self, token: &str) -> ShopResult<Option<UserId>> {
    Ok(self.state.lock().tokens.get(token).copied())
  }
}
