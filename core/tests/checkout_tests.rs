// tests/checkout_tests.rs
mod common;

use atelier::models::OrderStatus;
use atelier::{CheckoutRequest, FlagCache, GatewayError, ShopError, ShopSettings};
use common::*;
use rust_decimal::Decimal;
use serial_test::serial;
use std::time::Duration;

#[tokio::test]
#[serial]
async fn checkout_totals_lines_and_creates_items() {
  setup_tracing();
  let h = harness();

  let receipt = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 2), (PRODUCT_B, 1)]))
    .await
    .unwrap();

  assert_eq!(receipt.order.amount, Decimal::new(2500, 2));
  assert_eq!(receipt.order.status, OrderStatus::Pending);
  assert!(receipt.order.tx_ref.starts_with("tx-"));
  assert_eq!(receipt.payment_link, format!("https://pay.test/{}", receipt.order.tx_ref));
  assert_eq!(h.store.order_count(), 1);
  assert_eq!(h.store.order_item_count(), 2);

  let init = h.gateway.init_requests.lock().clone();
  assert_eq!(init.len(), 1);
  assert_eq!(init[0].amount, 2500);
  assert_eq!(init[0].email, "ada@example.com");
  assert_eq!(init[0].reference, receipt.order.tx_ref);
  assert_eq!(init[0].callback_url, "https://shop.test/payment/callback");
}

#[tokio::test]
#[serial]
async fn unknown_product_leaves_no_rows_behind() {
  setup_tracing();
  let h = harness();

  let err = h
    .shop
    .checkout(checkout_request(
      "ada@example.com",
      &[(PRODUCT_A, 1), (MISSING_PRODUCT, 1), (PRODUCT_B, 2)],
    ))
    .await
    .unwrap_err();

  assert!(matches!(err, ShopError::ProductNotFound(id) if id == MISSING_PRODUCT));
  assert_eq!(h.store.order_count(), 0);
  assert_eq!(h.store.order_item_count(), 0);
  assert!(h.gateway.init_requests.lock().is_empty());
}

#[tokio::test]
#[serial]
async fn colliding_tx_ref_fails_and_keeps_first_order() {
  setup_tracing();
  let settings = test_settings().with_tx_ref_generator(|| "tx-0000000000".to_string());
  let h = harness_with(settings, FakeGateway::approving());

  let first = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap();
  let err = h
    .shop
    .checkout(checkout_request("bola@example.com", &[(PRODUCT_B, 3)]))
    .await
    .unwrap_err();

  assert!(matches!(err, ShopError::Conflict(_)));
  assert_eq!(h.store.order_count(), 1);
  assert_eq!(h.store.order_item_count(), 1);

  let orders = h.shop.orders().orders_for_email("ada@example.com").await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].order.id, first.order.id);
  assert_eq!(orders[0].order.amount, Decimal::new(1000, 2));
}

#[tokio::test]
#[serial]
async fn gateway_failure_marks_order_failed() {
  setup_tracing();
  let gateway = FakeGateway::approving().failing_initialize(GatewayError::Transport("timed out".into()));
  let h = harness_with(test_settings(), gateway);

  let err = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Gateway(GatewayError::Transport(_))));
  assert_eq!(err.code(), "external_service_error");

  let orders = h.shop.orders().orders_for_email("ada@example.com").await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].order.status, OrderStatus::Failed);
  assert_eq!(orders[0].items.len(), 1);
}

#[tokio::test]
#[serial]
async fn missing_details_and_empty_cart_are_rejected() {
  setup_tracing();
  let h = harness();

  let mut request = checkout_request("ada@example.com", &[(PRODUCT_A, 1)]);
  request.customer_phone = Some("   ".into());
  let err = h.shop.checkout(request).await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m == "Missing customer details"));

  let err = h
    .shop
    .checkout(checkout_request("ada@example.com", &[]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m == "Cart is empty"));

  let err = h.shop.checkout(CheckoutRequest::default()).await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(_)));

  let err = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 0)]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Validation(_)));
  assert_eq!(h.store.order_count(), 0);
}

#[tokio::test]
#[serial]
async fn verification_required_blocks_unverified_email() {
  setup_tracing();
  let settings = ShopSettings {
    require_email_verification: true,
    ..test_settings()
  };
  let h = harness_with(settings, FakeGateway::approving());

  let err = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::EmailNotVerified));
  assert_eq!(h.store.order_count(), 0);

  h.cache
    .set("email_verified:ada@example.com", "1", Duration::from_secs(900))
    .await
    .unwrap();
  let receipt = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap();
  assert_eq!(receipt.order.amount, Decimal::new(1000, 2));
}

#[tokio::test]
#[serial]
async fn fractional_total_is_truncated_for_gateway() {
  setup_tracing();
  let h = harness();
  h.store.insert_product(product(PRODUCT_A, "Ankara Dress", Decimal::new(10_999, 3)));

  let receipt = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap();
  assert_eq!(receipt.order.amount, Decimal::new(10_999, 3));
  assert_eq!(h.gateway.init_requests.lock()[0].amount, 1099);
}

#[tokio::test]
#[serial]
async fn mismatched_session_reference_marks_order_failed() {
  setup_tracing();
  let h = harness_with(test_settings(), FakeGateway::approving().echoing_reference("tx-someone-else"));

  let err = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 1)]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Gateway(GatewayError::Malformed(_))));

  let orders = h.shop.orders().orders_for_email("ada@example.com").await.unwrap();
  assert_eq!(orders.len(), 1);
  assert_eq!(orders[0].order.status, OrderStatus::Failed);
}

#[tokio::test]
#[serial]
async fn customer_fields_longer_than_their_columns_are_rejected() {
  setup_tracing();
  let h = harness();

  let mut request = checkout_request("ada@example.com", &[(PRODUCT_A, 1)]);
  request.customer_name = Some("A".repeat(256));
  let err = h.shop.checkout(request).await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m.starts_with("Customer name")));

  let long_email = format!("{}@example.com", "a".repeat(250));
  let err = h
    .shop
    .checkout(checkout_request(&long_email, &[(PRODUCT_A, 1)]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m.starts_with("Customer email")));

  let mut request = checkout_request("ada@example.com", &[(PRODUCT_A, 1)]);
  request.customer_phone = Some("0".repeat(21));
  let err = h.shop.checkout(request).await.unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m.starts_with("Customer phone")));

  let mut request = checkout_request("ada@example.com", &[(PRODUCT_A, 1)]);
  request.customer_name = Some("é".repeat(255));
  assert!(h.shop.checkout(request).await.is_ok());

  assert_eq!(h.store.order_count(), 1);
}

#[tokio::test]
#[serial]
async fn total_beyond_the_amount_column_is_rejected() {
  setup_tracing();
  let h = harness();

  let err = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_A, 10_000_000)]))
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Validation(ref m) if m == "Order total is too large"));
  assert_eq!(h.store.order_count(), 0);
  assert!(h.gateway.init_requests.lock().is_empty());

  h.store.insert_product(product(PRODUCT_B, "Beaded Bag", Decimal::new(9_999_999_999, 2)));
  let receipt = h
    .shop
    .checkout(checkout_request("ada@example.com", &[(PRODUCT_B, 1)]))
    .await
    .unwrap();
  assert_eq!(receipt.order.amount, Decimal::new(9_999_999_999, 2));
}
