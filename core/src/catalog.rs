// core/src/catalog.rs

use crate::error::{ShopError, ShopResult};
use crate::models::Product;
use crate::store::ShopStore;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read-only view over the product catalog.
#[derive(Clone)]
pub struct Catalog {
  store: Arc<dyn ShopStore>,
}

impl Catalog {
  pub fn new(store: Arc<dyn ShopStore>) -> Self {
    Self { store }
  }

  #[instrument(name = "Catalog::list_products", skip(self))]
  pub async fn list_products(&self) -> ShopResult<Vec<Product>> {
    self.store.list_products().await
  }

  #[instrument(name = "Catalog::product", skip(self))]
  pub async fn product(&self, id: Uuid) -> ShopResult<Product> {
    self.store.find_product(id).await?.ok_or(ShopError::ProductNotFound(id))
  }
}
