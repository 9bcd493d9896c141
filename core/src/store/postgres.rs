// core/src/store/postgres.rs

//! PostgreSQL implementations of the store traits and the flag cache.
//! All queries are runtime-checked (`query_as` + `bind`).

use super::{CartStore, CatalogStore, MessageStore, OrderStore, UserDirectory};
use crate::cache::{expiry_from_now, FlagCache};
use crate::error::{ShopError, ShopResult};
use crate::models::{
  Cart, CartItem, CartOwner, CustomerMessage, NewCustomerMessage, NewOrder, NewOrderItem, Order, OrderItemView,
  OrderStatus, Product, ProductImage, UserId,
};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const PRODUCT_COLUMNS: &str = "id, name, description, category, price, original_price, stock";
const CART_COLUMNS: &str = "id, user_id, guest_id, created_at";
const CART_ITEM_COLUMNS: &str = "id, cart_id, product_id, quantity";
const ORDER_COLUMNS: &str =
  "id, customer_name, customer_email, customer_phone, amount, tx_ref, transaction_id, status, created_at";

fn db_err(e: sqlx::Error) -> ShopError {
  error!(error = %e, "Database operation failed.");
  ShopError::storage(e)
}

fn violated_constraint(e: &sqlx::Error) -> Option<String> {
  match e {
    sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
      db.constraint().map(str::to_string)
    }
    _ => None,
  }
}

/// SQLSTATE 22003: an integer column would overflow.
fn is_numeric_overflow(e: &sqlx::Error) -> bool {
  matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("22003"))
}

fn owner_columns(owner: &CartOwner) -> (Option<Uuid>, Option<&str>) {
  match owner {
    CartOwner::User(id) => (Some(*id), None),
    CartOwner::Guest(guest) => (None, Some(guest.as_str())),
  }
}

#[derive(Debug, Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  #[instrument(name = "PgStore::migrate", skip(self), err(Display))]
  pub async fn migrate(&self) -> ShopResult<()> {
    MIGRATOR.run(&self.pool).await.map_err(ShopError::storage)?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn attach_images(&self, mut products: Vec<Product>) -> ShopResult<Vec<Product>> {
    if products.is_empty() {
      return Ok(products);
    }
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let images: Vec<ProductImage> = sqlx::query_as(
      "SELECT id, product_id, image_url, thumbnail_url, alt_text, position FROM product_images \
       WHERE product_id = ANY($1) ORDER BY position ASC, id ASC",
    )
    .bind(&ids)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)?;

    for image in images {
      if let Some(product) = products.iter_mut().find(|p| p.id == image.product_id) {
        product.images.push(image);
      }
    }
    Ok(products)
  }
}

#[async_trait]
impl CatalogStore for PgStore {
  #[instrument(skip(self))]
  async fn list_products(&self) -> ShopResult<Vec<Product>> {
    let products: Vec<Product> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC"))
      .fetch_all(&self.pool)
      .await
      .map_err(db_err)?;
    self.attach_images(products).await
  }

  #[instrument(skip(self))]
  async fn find_product(&self, id: Uuid) -> ShopResult<Option<Product>> {
    let product: Option<Product> = sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)?;
    match product {
      Some(product) => Ok(self.attach_images(vec![product]).await?.pop()),
      None => Ok(None),
    }
  }

  #[instrument(skip(self), fields(count = ids.len()))]
  async fn products_by_ids(&self, ids: &[Uuid]) -> ShopResult<Vec<Product>> {
    let products: Vec<Product> =
      sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
    self.attach_images(products).await
  }
}

#[async_trait]
impl CartStore for PgStore {
  #[instrument(skip(self), fields(%owner))]
  async fn find_cart(&self, owner: &CartOwner) -> ShopResult<Option<Cart>> {
    let sql = match owner {
      CartOwner::User(_) => format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1"),
      CartOwner::Guest(_) => format!("SELECT {CART_COLUMNS} FROM carts WHERE guest_id = $1"),
    };
    let query = sqlx::query_as::<_, Cart>(&sql);
    let query = match owner {
      CartOwner::User(id) => query.bind(*id),
      CartOwner::Guest(guest) => query.bind(guest.as_str()),
    };
    query.fetch_optional(&self.pool).await.map_err(db_err)
  }

  #[instrument(skip(self), fields(%owner))]
  async fn get_or_create_cart(&self, owner: &CartOwner) -> ShopResult<Cart> {
    let (user_id, guest_id) = owner_columns(owner);
    // A concurrent first request may win the insert; the unique constraint
    // turns our insert into a no-op and we read the winner's row.
    let inserted: Option<Cart> = sqlx::query_as(&format!(
      "INSERT INTO carts (id, user_id, guest_id, created_at) VALUES ($1, $2, $3, NOW()) \
       ON CONFLICT DO NOTHING RETURNING {CART_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(guest_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)?;

    match inserted {
      Some(cart) => {
        info!(cart_id = %cart.id, "Created cart.");
        Ok(cart)
      }
      None => self
        .find_cart(owner)
        .await?
        .ok_or_else(|| ShopError::storage(anyhow::anyhow!("cart for {} vanished after conflicting insert", owner))),
    }
  }

  #[instrument(skip(self), fields(%owner))]
  async fn delete_cart(&self, owner: &CartOwner) -> ShopResult<bool> {
    let (user_id, guest_id) = owner_columns(owner);
    let result = match owner {
      CartOwner::User(_) => sqlx::query("DELETE FROM carts WHERE user_id = $1").bind(user_id),
      CartOwner::Guest(_) => sqlx::query("DELETE FROM carts WHERE guest_id = $1").bind(guest_id),
    }
    .execute(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(skip(self))]
  async fn cart_items(&self, cart_id: Uuid) -> ShopResult<Vec<CartItem>> {
    sqlx::query_as(&format!(
      "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY added_at ASC, id ASC"
    ))
    .bind(cart_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)
  }

  #[instrument(skip(self))]
  async fn find_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<Option<CartItem>> {
    sqlx::query_as(&format!(
      "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 AND product_id = $2"
    ))
    .bind(cart_id)
    .bind(product_id)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)
  }

  #[instrument(skip(self))]
  async fn add_cart_item(&self, cart_id: Uuid, product_id: Uuid, quantity: i32) -> ShopResult<CartItem> {
    sqlx::query_as(&format!(
      "INSERT INTO cart_items (id, cart_id, product_id, quantity, added_at) VALUES ($1, $2, $3, $4, NOW()) \
       ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
       RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| match violated_constraint(&e).as_deref() {
      Some("cart_items_product_id_fkey") => ShopError::ProductNotFound(product_id),
      Some("cart_items_cart_id_fkey") => ShopError::CartNotFound,
      _ if is_numeric_overflow(&e) => ShopError::quantity_too_large(),
      _ => db_err(e),
    })
  }

  #[instrument(skip(self))]
  async fn set_cart_item_quantity(
    &self,
    cart_id: Uuid,
    product_id: Uuid,
    quantity: i32,
  ) -> ShopResult<Option<CartItem>> {
    sqlx::query_as(&format!(
      "UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_id = $2 RETURNING {CART_ITEM_COLUMNS}"
    ))
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await
    .map_err(db_err)
  }

  #[instrument(skip(self))]
  async fn remove_cart_item(&self, cart_id: Uuid, product_id: Uuid) -> ShopResult<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
      .bind(cart_id)
      .bind(product_id)
      .execute(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(skip(self))]
  async fn absorb_cart(&self, from: Uuid, into: Uuid) -> ShopResult<Vec<CartItem>> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;

    let locked: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM carts WHERE id = ANY($1) FOR UPDATE")
      .bind(vec![from, into])
      .fetch_all(&mut *tx)
      .await
      .map_err(db_err)?;
    if from == into || locked.len() != 2 {
      return Err(ShopError::CartNotFound);
    }

    sqlx::query(
      "INSERT INTO cart_items (id, cart_id, product_id, quantity, added_at) \
       SELECT gen_random_uuid(), $2, product_id, quantity, added_at FROM cart_items WHERE cart_id = $1 \
       ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(from)
    .bind(into)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
      if is_numeric_overflow(&e) {
        ShopError::quantity_too_large()
      } else {
        db_err(e)
      }
    })?;

    sqlx::query("DELETE FROM carts WHERE id = $1")
      .bind(from)
      .execute(&mut *tx)
      .await
      .map_err(db_err)?;

    let items: Vec<CartItem> = sqlx::query_as(&format!(
      "SELECT {CART_ITEM_COLUMNS} FROM cart_items WHERE cart_id = $1 ORDER BY added_at ASC, id ASC"
    ))
    .bind(into)
    .fetch_all(&mut *tx)
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;
    Ok(items)
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(skip(self, order, items), fields(tx_ref = %order.tx_ref, lines = items.len()))]
  async fn insert_order(&self, order: NewOrder, items: &[NewOrderItem]) -> ShopResult<Order> {
    let tx_ref = order.tx_ref.clone();
    // Dropping `tx` on any early return rolls everything back.
    let mut tx = self.pool.begin().await.map_err(db_err)?;

    let created: Order = sqlx::query_as(&format!(
      "INSERT INTO orders (id, customer_name, customer_email, customer_phone, amount, tx_ref, status, created_at) \
       VALUES ($1, $2, $3, $4, 0, $5, $6, NOW()) RETURNING {ORDER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(&order.tx_ref)
    .bind(OrderStatus::Pending)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| match violated_constraint(&e).as_deref() {
      Some("orders_tx_ref_key") => {
        warn!(%tx_ref, "Transaction reference collision.");
        ShopError::Conflict(format!("transaction reference '{}' already exists", tx_ref))
      }
      _ => db_err(e),
    })?;

    for (line_no, item) in items.iter().enumerate() {
      sqlx::query("INSERT INTO order_items (id, order_id, product_id, quantity, line_no) VALUES ($1, $2, $3, $4, $5)")
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(line_no as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| match violated_constraint(&e).as_deref() {
          Some("order_items_product_id_fkey") => ShopError::ProductNotFound(item.product_id),
          _ => db_err(e),
        })?;
    }

    let finalized: Order = sqlx::query_as(&format!(
      "UPDATE orders SET amount = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(created.id)
    .bind(order.amount)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;
    Ok(finalized)
  }

  #[instrument(skip(self))]
  async fn find_order_by_reference(&self, tx_ref: &str) -> ShopResult<Option<Order>> {
    sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE tx_ref = $1"))
      .bind(tx_ref)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)
  }

  #[instrument(skip(self))]
  async fn update_order_status(
    &self,
    order_id: Uuid,
    status: OrderStatus,
    transaction_id: Option<&str>,
  ) -> ShopResult<Order> {
    let mut tx = self.pool.begin().await.map_err(db_err)?;

    let current: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await
      .map_err(db_err)?;
    let current = current.ok_or_else(|| ShopError::OrderNotFound(order_id.to_string()))?;
    if !current.can_become(status) {
      return Err(ShopError::Conflict(format!(
        "order {} cannot move from {} to {}",
        order_id, current, status
      )));
    }

    let updated: Order = sqlx::query_as(&format!(
      "UPDATE orders SET status = $2, transaction_id = COALESCE($3, transaction_id) WHERE id = $1 \
       RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order_id)
    .bind(status)
    .bind(transaction_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    tx.commit().await.map_err(db_err)?;
    Ok(updated)
  }

  #[instrument(skip(self, email))]
  async fn orders_for_email(&self, email: &str) -> ShopResult<Vec<Order>> {
    sqlx::query_as(&format!(
      "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_email = $1 ORDER BY created_at DESC"
    ))
    .bind(email)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)
  }

  #[instrument(skip(self))]
  async fn order_items(&self, order_id: Uuid) -> ShopResult<Vec<OrderItemView>> {
    sqlx::query_as(
      "SELECT oi.product_id, p.name AS product_name, oi.quantity FROM order_items oi \
       LEFT JOIN products p ON p.id = oi.product_id WHERE oi.order_id = $1 ORDER BY oi.line_no ASC",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await
    .map_err(db_err)
  }
}

#[async_trait]
impl MessageStore for PgStore {
  #[instrument(skip(self, message))]
  async fn save_message(&self, message: NewCustomerMessage) -> ShopResult<CustomerMessage> {
    sqlx::query_as(
      "INSERT INTO customer_messages (id, name, email, message, created_at) VALUES ($1, $2, $3, $4, NOW()) \
       RETURNING id, name, email, message, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(&message.name)
    .bind(&message.email)
    .bind(&message.message)
    .fetch_one(&self.pool)
    .await
    .map_err(db_err)
  }
}

#[async_trait]
impl UserDirectory for PgStore {
  #[instrument(skip_all)]
  async fn user_for_token(&self, token: &str) -> ShopResult<Option<UserId>> {
    sqlx::query_scalar("SELECT user_id FROM access_tokens WHERE token = $1 AND expires_at > NOW()")
      .bind(token)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)
  }
}

/// Flag cache shared by every server instance through the `cache_entries` table.
#[derive(Debug, Clone)]
pub struct PgFlagCache {
  pool: PgPool,
}

impl PgFlagCache {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl FlagCache for PgFlagCache {
  #[instrument(skip(self, value))]
  async fn set(&self, key: &str, value: &str, ttl: Duration) -> ShopResult<()> {
    sqlx::query(
      "INSERT INTO cache_entries (key, value, expires_at) VALUES ($1, $2, $3) \
       ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
    )
    .bind(key)
    .bind(value)
    .bind(expiry_from_now(ttl))
    .execute(&self.pool)
    .await
    .map_err(db_err)?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn get(&self, key: &str) -> ShopResult<Option<String>> {
    sqlx::query_scalar("SELECT value FROM cache_entries WHERE key = $1 AND expires_at > NOW()")
      .bind(key)
      .fetch_optional(&self.pool)
      .await
      .map_err(db_err)
  }

  #[instrument(skip(self))]
  async fn delete(&self, key: &str) -> ShopResult<()> {
    sqlx::query("DELETE FROM cache_entries WHERE key = $1")
      .bind(key)
      .execute(&self.pool)
      .await
      .map_err(db_err)?;
    Ok(())
  }
}
