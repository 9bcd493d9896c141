// tests/lookup_and_inbox_tests.rs
mod common;

use atelier::models::NewCustomerMessage;
use atelier::ShopError;
use common::*;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn orders_for_email_are_newest_first_with_items() {
  setup_tracing();
  let h = harness();

  let older = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap();
  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  let newer = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_B, 2), (PRODUCT_A, 1)]))
    .await
    .unwrap();
  h.shop
    .checkout(checkout_request("someone@else.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap();

  let orders = h.shop.orders().orders_for_email("ada@example.com").await.unwrap();
  assert_eq!(orders.len(), 2);
  assert_eq!(orders[0].order.id, newer.order.id);
  assert_eq!(orders[1].order.id, older.order.id);

  let names: Vec<_> = orders[0].items.iter().map(|i| i.product_name.clone()).collect();
  assert_eq!(names, vec![Some("Beaded Bag".to_string()), Some("Ankara Dress".to_string())]);
}

#[tokio::test]
#[serial]
async fn deleted_product_keeps_order_item_without_name() {
  setup_tracing();
  let h = harness();
  h.shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_B, 1)]))
    .await
    .unwrap();

  h.store.remove_product(PRODUCT_B);
  let orders = h.shop.orders().orders_for_email("ada@example.com").await.unwrap();
  assert_eq!(orders[0].items.len(), 1);
  assert_eq!(orders[0].items[0].product_id, None);
  assert_eq!(orders[0].items[0].product_name, None);
}

#[tokio::test]
#[serial]
async fn order_lookup_requires_email() {
  setup_tracing();
  let h = harness();
  let err = h.shop.orders().orders_for_email(" ").await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m == "Email is required"));
  assert!(h.shop.orders().orders_for_email("nobody@example.com").await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn inbox_stores_valid_messages_only() {
  setup_tracing();
  let h = harness();

  let stored = h
    .shop
    .inbox()
    .submit(NewCustomerMessage {
      name: "Ada".into(),
      email: "ada@example.com".into(),
      message: "Do you ship to Abuja?".into(),
    })
    .await
    .unwrap();
  assert_eq!(stored.name, "Ada");

  let err = h
    .shop
    .inbox()
    .submit(NewCustomerMessage {
      name: "Ada".into(),
      email: "a-very-long-address-indeed@example.com".into(),
      message: "hi".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Validation(_)));

  let messages = h.store.messages();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0].id, stored.id);
}

#[tokio::test]
#[serial]
async fn catalog_lists_by_name_and_reports_missing_product() {
  setup_tracing();
  let h = harness();

  let products = h.shop.catalog().list_products().await.unwrap();
  let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
  assert_eq!(names, vec!["Ankara Dress", "Beaded Bag"]);

  assert_eq!(h.shop.catalog().product(PRODUCT_A).await.unwrap().id, PRODUCT_A);
  let err = h.shop.catalog().product(MISSING_PRODUCT).await.unwrap_err();
  assert!(matches!(err, ShopError::ProductNotFound(_)));
}
