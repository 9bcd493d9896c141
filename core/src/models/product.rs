// core/src/models/product.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "product_category"))]
pub enum Category {
  Kids,
  Women,
  Men,
}

/// A catalog entry. Read-only from the cart and checkout flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub category: Category,
  pub price: Decimal,
  /// Pre-discount price shown struck through next to `price`.
  pub original_price: Option<Decimal>,
  pub stock: i32,
  #[cfg_attr(feature = "postgres", sqlx(skip))]
  #[serde(default)]
  pub images: Vec<ProductImage>,
}

impl Product {
  pub fn line_total(&self, quantity: i32) -> Decimal {
    self.price * Decimal::from(quantity)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ProductImage {
  pub id: Uuid,
  #[serde(skip_serializing)]
  pub product_id: Uuid,
  pub image_url: String,
  pub thumbnail_url: Option<String>,
  pub alt_text: Option<String>,
  pub position: i32,
}
