// core/src/orders.rs

use crate::error::{ShopError, ShopResult};
use crate::models::OrderWithItems;
use crate::store::ShopStore;
use std::sync::Arc;
use tracing::instrument;

/// Guest order lookup by email. Unauthenticated by design of the storefront.
#[derive(Clone)]
pub struct OrderLookup {
  store: Arc<dyn ShopStore>,
}

impl OrderLookup {
  pub fn new(store: Arc<dyn ShopStore>) -> Self {
    Self { store }
  }

  /// Newest first, each with its items.
  #[instrument(name = "OrderLookup::orders_for_email", skip_all)]
  pub async fn orders_for_email(&self, email: &str) -> ShopResult<Vec<OrderWithItems>> {
    let email = email.trim();
    if email.is_empty() {
      return Err(ShopError::validation("Email is required"));
    }

    let orders = self.store.orders_for_email(email).await?;
    let mut result = Vec::with_capacity(orders.len());
    for order in orders {
      let items = self.store.order_items(order.id).await?;
      result.push(OrderWithItems { order, items });
    }
    Ok(result)
  }
}
