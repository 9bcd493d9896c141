// core/src/models/order.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "order_status"))]
pub enum OrderStatus {
  Pending,
  Paid,
  Failed,
}

impl OrderStatus {
  /// Pending moves to Paid or Failed; both are terminal.
  /// Re-applying the current terminal state is allowed and changes nothing.
  pub fn can_become(self, next: OrderStatus) -> bool {
    matches!(
      (self, next),
      (OrderStatus::Pending, OrderStatus::Paid)
        | (OrderStatus::Pending, OrderStatus::Failed)
        | (OrderStatus::Paid, OrderStatus::Paid)
        | (OrderStatus::Failed, OrderStatus::Failed)
    )
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::Paid => "Paid",
      OrderStatus::Failed => "Failed",
    };
    f.write_str(label)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
  pub id: Uuid,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub amount: Decimal,
  pub tx_ref: String,
  pub transaction_id: Option<String>,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// Snapshot of a purchased line. The price is read through the product, the
/// amount actually charged lives on `Order::amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Option<Uuid>,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: String,
  pub amount: Decimal,
  pub tx_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderItemView {
  pub product_id: Option<Uuid>,
  pub product_name: Option<String>,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItemView>,
}
