// tests/pg_store_tests.rs
//! Runs against a live PostgreSQL server named by `TEST_DATABASE_URL`. Each
//! test gets a throwaway database with migrations applied; without the
//! variable the tests log and return.
#![cfg(feature = "postgres")]

mod common;

use atelier::models::{CartOwner, NewOrder, NewOrderItem, OrderStatus};
use atelier::store::postgres::MIGRATOR;
use atelier::store::{CartStore, OrderStore, PgFlagCache, PgStore};
use atelier::{FlagCache, ShopError};
use common::{setup_tracing, PRODUCT_A, PRODUCT_B, MISSING_PRODUCT};
use rust_decimal::Decimal;
use serial_test::serial;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgConnection, PgPool};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

struct TestDb {
  admin: PgConnectOptions,
  name: String,
  pool: PgPool,
}

impl TestDb {
  async fn create() -> Option<Self> {
    setup_tracing();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
      tracing::warn!("TEST_DATABASE_URL is not set; skipping PostgreSQL store test.");
      return None;
    };
    let admin = PgConnectOptions::from_str(&url).expect("TEST_DATABASE_URL is not a valid connection string");
    let name = format!("atelier_test_{}", Uuid::new_v4().simple());

    let mut conn = PgConnection::connect_with(&admin).await.expect("connect to admin database");
    sqlx::query(&format!("CREATE DATABASE {}", name))
      .execute(&mut conn)
      .await
      .expect("create test database");
    conn.close().await.ok();

    let pool = PgPoolOptions::new()
      .max_connections(8)
      .connect_with(admin.clone().database(&name))
      .await
      .expect("connect to test database");
    MIGRATOR.run(&pool).await.expect("apply migrations");

    for (id, name, price) in [
      (PRODUCT_A, "Ankara Dress", Decimal::new(1000, 2)),
      (PRODUCT_B, "Beaded Bag", Decimal::new(500, 2)),
    ] {
      sqlx::query("INSERT INTO products (id, name, category, price, stock) VALUES ($1, $2, 'Women', $3, 10)")
        .bind(id)
        .bind(name)
        .bind(price)
        .execute(&pool)
        .await
        .expect("seed product");
    }

    Some(Self { admin, name, pool })
  }

  fn store(&self) -> PgStore {
    PgStore::new(self.pool.clone())
  }

  async fn user(&self) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email) VALUES ($1, $2)")
      .bind(id)
      .bind(format!("{}@example.com", id.simple()))
      .execute(&self.pool)
      .await
      .expect("seed user");
    id
  }

  async fn count(&self, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
      .fetch_one(&self.pool)
      .await
      .expect("count rows")
  }

  async fn drop_db(self) {
    self.pool.close().await;
    let mut conn = PgConnection::connect_with(&self.admin).await.expect("connect to admin database");
    sqlx::query(&format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.name))
      .execute(&mut conn)
      .await
      .expect("drop test database");
    conn.close().await.ok();
  }
}

fn new_order(tx_ref: &str, amount: Decimal) -> NewOrder {
  NewOrder {
    customer_name: "Ada Obi".to_string(),
    customer_email: "ada@example.com".to_string(),
    customer_phone: "08030000000".to_string(),
    amount,
    tx_ref: tx_ref.to_string(),
  }
}

fn line(product_id: Uuid, quantity: i32) -> NewOrderItem {
  NewOrderItem { product_id, quantity }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_get_or_create_yields_one_cart() {
  let Some(db) = TestDb::create().await else { return };
  let store = Arc::new(db.store());
  let owner = CartOwner::Guest("guest-race".to_string());

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let store = store.clone();
      let owner = owner.clone();
      tokio::spawn(async move { store.get_or_create_cart(&owner).await })
    })
    .collect();
  let mut ids = Vec::new();
  for task in tasks {
    ids.push(task.await.unwrap().unwrap().id);
  }
  ids.dedup();

  assert_eq!(ids.len(), 1);
  assert_eq!(db.count("carts").await, 1);
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn duplicate_tx_ref_is_a_conflict_and_keeps_the_first_order() {
  let Some(db) = TestDb::create().await else { return };
  let store = db.store();

  let first = store
    .insert_order(new_order("tx-dup", Decimal::new(1000, 2)), &[line(PRODUCT_A, 1)])
    .await
    .unwrap();
  assert_eq!(first.amount, Decimal::new(1000, 2));

  let err = store
    .insert_order(new_order("tx-dup", Decimal::new(1500, 2)), &[line(PRODUCT_B, 3)])
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Conflict(_)));
  assert_eq!(db.count("orders").await, 1);
  assert_eq!(db.count("order_items").await, 1);

  let kept = store.find_order_by_reference("tx-dup").await.unwrap().unwrap();
  assert_eq!(kept.id, first.id);
  assert_eq!(kept.amount, Decimal::new(1000, 2));
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn order_with_unknown_product_rolls_back() {
  let Some(db) = TestDb::create().await else { return };
  let store = db.store();

  let err = store
    .insert_order(
      new_order("tx-rollback", Decimal::new(2000, 2)),
      &[line(PRODUCT_A, 1), line(MISSING_PRODUCT, 1)],
    )
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::ProductNotFound(id) if id == MISSING_PRODUCT));
  assert_eq!(db.count("orders").await, 0);
  assert_eq!(db.count("order_items").await, 0);
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn absorb_cart_merges_and_deletes_the_source() {
  let Some(db) = TestDb::create().await else { return };
  let store = db.store();
  let user = db.user().await;

  let guest_cart = store.get_or_create_cart(&CartOwner::Guest("guest-1".into())).await.unwrap();
  let user_cart = store.get_or_create_cart(&CartOwner::User(user)).await.unwrap();
  store.add_cart_item(guest_cart.id, PRODUCT_A, 2).await.unwrap();
  store.add_cart_item(guest_cart.id, PRODUCT_B, 1).await.unwrap();
  store.add_cart_item(user_cart.id, PRODUCT_A, 3).await.unwrap();

  let merged = store.absorb_cart(guest_cart.id, user_cart.id).await.unwrap();
  let quantity_of = |id| merged.iter().find(|i| i.product_id == id).map(|i| i.quantity);
  assert_eq!(merged.len(), 2);
  assert_eq!(quantity_of(PRODUCT_A), Some(5));
  assert_eq!(quantity_of(PRODUCT_B), Some(1));
  assert!(merged.iter().all(|i| i.cart_id == user_cart.id));
  assert_eq!(db.count("carts").await, 1);

  let err = store.absorb_cart(guest_cart.id, user_cart.id).await.unwrap_err();
  assert!(matches!(err, ShopError::CartNotFound));
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn overflowing_absorb_rolls_back() {
  let Some(db) = TestDb::create().await else { return };
  let store = db.store();
  let user = db.user().await;

  let guest_cart = store.get_or_create_cart(&CartOwner::Guest("guest-1".into())).await.unwrap();
  let user_cart = store.get_or_create_cart(&CartOwner::User(user)).await.unwrap();
  store.add_cart_item(guest_cart.id, PRODUCT_A, 1).await.unwrap();
  store.add_cart_item(guest_cart.id, PRODUCT_B, 4).await.unwrap();
  store.add_cart_item(user_cart.id, PRODUCT_A, i32::MAX).await.unwrap();

  let err = store.absorb_cart(guest_cart.id, user_cart.id).await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m == "Quantity is too large"));

  assert_eq!(db.count("carts").await, 2);
  assert_eq!(store.cart_items(guest_cart.id).await.unwrap().len(), 2);
  let user_items = store.cart_items(user_cart.id).await.unwrap();
  assert_eq!(user_items.len(), 1);
  assert_eq!(user_items[0].quantity, i32::MAX);
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn add_past_the_quantity_ceiling_is_a_validation_error() {
  let Some(db) = TestDb::create().await else { return };
  let store = db.store();

  let cart = store.get_or_create_cart(&CartOwner::Guest("guest-1".into())).await.unwrap();
  store.add_cart_item(cart.id, PRODUCT_A, i32::MAX).await.unwrap();
  let err = store.add_cart_item(cart.id, PRODUCT_A, 1).await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m == "Quantity is too large"));

  let item = store.find_cart_item(cart.id, PRODUCT_A).await.unwrap().unwrap();
  assert_eq!(item.quantity, i32::MAX);

  let err = store.add_cart_item(cart.id, MISSING_PRODUCT, 1).await.unwrap_err();
  assert!(matches!(err, ShopError::ProductNotFound(id) if id == MISSING_PRODUCT));
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn order_status_follows_the_transition_rules() {
  let Some(db) = TestDb::create().await else { return };
  let store = db.store();

  let order = store
    .insert_order(new_order("tx-status", Decimal::new(500, 2)), &[line(PRODUCT_B, 1)])
    .await
    .unwrap();
  assert_eq!(order.status, OrderStatus::Pending);

  let paid = store
    .update_order_status(order.id, OrderStatus::Paid, Some("4099260516"))
    .await
    .unwrap();
  assert_eq!(paid.status, OrderStatus::Paid);
  assert_eq!(paid.transaction_id.as_deref(), Some("4099260516"));

  let again = store.update_order_status(order.id, OrderStatus::Paid, None).await.unwrap();
  assert_eq!(again.status, OrderStatus::Paid);
  assert_eq!(again.transaction_id.as_deref(), Some("4099260516"));

  let err = store
    .update_order_status(order.id, OrderStatus::Failed, None)
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Conflict(_)));

  let err = store
    .update_order_status(Uuid::new_v4(), OrderStatus::Paid, None)
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::OrderNotFound(_)));
  db.drop_db().await;
}

#[tokio::test]
#[serial]
async fn flag_cache_round_trips() {
  let Some(db) = TestDb::create().await else { return };
  let cache = PgFlagCache::new(db.pool.clone());

  cache.set("email_verified:ada@example.com", "1", Duration::from_secs(900)).await.unwrap();
  assert_eq!(
    cache.get("email_verified:ada@example.com").await.unwrap().as_deref(),
    Some("1")
  );
  cache.delete("email_verified:ada@example.com").await.unwrap();
  assert!(!cache.contains("email_verified:ada@example.com").await.unwrap());
  db.drop_db().await;
}
