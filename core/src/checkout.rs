// core/src/checkout.rs

//! Checkout: turns the shopper's line items into a Pending order and a
//! hosted payment page.

use crate::cart::QuantityInput;
use crate::error::{ShopError, ShopResult};
use crate::gateway::{GatewayError, PaymentInit};
use crate::models::{NewOrder, NewOrderItem, Order, OrderStatus};
use crate::shop::ShopDeps;
use crate::verification::verified_key;
use crate::workflow::{ContextData, Pipeline, SkipCondition};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
  #[serde(default)]
  pub customer_name: Option<String>,
  #[serde(default)]
  pub customer_email: Option<String>,
  #[serde(default)]
  pub customer_phone: Option<String>,
  #[serde(default)]
  pub cart: Vec<CheckoutLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLine {
  pub product: ProductRef,
  #[serde(default)]
  pub quantity: QuantityInput,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProductRef {
  pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
  pub name: String,
  pub email: String,
  pub phone: String,
}

/// What a successful checkout hands back to the shopper.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
  pub order: Order,
  pub payment_link: String,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub deps: ShopDeps,
  pub request: CheckoutRequest,
  pub customer: Option<CustomerDetails>,
  pub lines: Vec<NewOrderItem>,
  pub total: Decimal,
  pub order: Option<Order>,
  pub payment_link: Option<String>,
}

impl CheckoutCtxData {
  pub fn new(deps: ShopDeps, request: CheckoutRequest) -> Self {
    Self {
      deps,
      request,
      customer: None,
      lines: Vec::new(),
      total: Decimal::ZERO,
      order: None,
      payment_link: None,
    }
  }
}

pub const MAX_CUSTOMER_NAME_CHARS: usize = 255;
pub const MAX_CUSTOMER_EMAIL_CHARS: usize = 254;
pub const MAX_CUSTOMER_PHONE_CHARS: usize = 20;

/// Largest order total the orders table can hold, 99,999,999.99.
pub fn max_order_total() -> Decimal {
  Decimal::new(9_999_999_999, 2)
}

fn required(field: &Option<String>) -> Option<String> {
  field.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn check_length(label: &str, value: &str, max: usize) -> ShopResult<()> {
  if value.chars().count() > max {
    return Err(ShopError::validation(format!(
      "{} must be at most {} characters",
      label, max
    )));
  }
  Ok(())
}

fn missing_state(step_name: &str, what: &str) -> ShopError {
  ShopError::Workflow {
    step_name: step_name.to_string(),
    message: format!("{} was not set by an earlier step", what),
  }
}

/// Total in the gateway's minor currency unit, truncated toward zero.
pub fn minor_units(total: Decimal) -> ShopResult<i64> {
  (total * Decimal::ONE_HUNDRED)
    .trunc()
    .to_i64()
    .ok_or_else(|| ShopError::validation("Order total is out of range"))
}

pub fn build_checkout_pipeline() -> Pipeline<CheckoutCtxData> {
  let verification_disabled: SkipCondition<CheckoutCtxData> =
    Arc::new(|ctx: ContextData<CheckoutCtxData>| !ctx.read().deps.settings.require_email_verification);

  let mut p = Pipeline::new(
    "checkout",
    &[
      ("validate_checkout_request", None),
      ("ensure_email_verified", Some(verification_disabled)),
      ("price_line_items", None),
      ("persist_order", None),
      ("initialize_payment", None),
    ],
  );

  p.on_root("validate_checkout_request", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let mut guard = ctx_data.write();
      let customer = match (
        required(&guard.request.customer_name),
        required(&guard.request.customer_email),
        required(&guard.request.customer_phone),
      ) {
        (Some(name), Some(email), Some(phone)) => CustomerDetails { name, email, phone },
        _ => return Err(ShopError::validation("Missing customer details")),
      };
      check_length("Customer name", &customer.name, MAX_CUSTOMER_NAME_CHARS)?;
      check_length("Customer email", &customer.email, MAX_CUSTOMER_EMAIL_CHARS)?;
      check_length("Customer phone", &customer.phone, MAX_CUSTOMER_PHONE_CHARS)?;
      if guard.request.cart.is_empty() {
        return Err(ShopError::validation("Cart is empty"));
      }

      let mut lines = Vec::with_capacity(guard.request.cart.len());
      for line in &guard.request.cart {
        let quantity = line.quantity.value()?;
        if quantity < 1 {
          return Err(ShopError::validation("Quantity must be at least 1"));
        }
        let quantity = i32::try_from(quantity).map_err(|_| ShopError::quantity_too_large())?;
        lines.push(NewOrderItem {
          product_id: line.product.id,
          quantity,
        });
      }

      guard.customer = Some(customer);
      guard.lines = lines;
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("ensure_email_verified", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (cache, email) = {
        let guard = ctx_data.read();
        let email = guard
          .customer
          .as_ref()
          .map(|c| c.email.clone())
          .ok_or_else(|| missing_state("ensure_email_verified", "customer"))?;
        (guard.deps.cache.clone(), email)
      };
      if !cache.contains(&verified_key(&email)).await? {
        warn!("Checkout attempted with an unverified email.");
        return Err(ShopError::EmailNotVerified);
      }
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("price_line_items", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, lines) = {
        let guard = ctx_data.read();
        (guard.deps.store.clone(), guard.lines.clone())
      };
      let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
      let products: HashMap<Uuid, Decimal> = store
        .products_by_ids(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p.price))
        .collect();

      let mut total = Decimal::ZERO;
      for line in &lines {
        let price = products
          .get(&line.product_id)
          .ok_or(ShopError::ProductNotFound(line.product_id))?;
        total = price
          .checked_mul(Decimal::from(line.quantity))
          .and_then(|subtotal| total.checked_add(subtotal))
          .filter(|sum| *sum <= max_order_total())
          .ok_or_else(|| ShopError::validation("Order total is too large"))?;
      }

      ctx_data.write().total = total;
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("persist_order", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (store, new_order, lines) = {
        let guard = ctx_data.read();
        let customer = guard
          .customer
          .clone()
          .ok_or_else(|| missing_state("persist_order", "customer"))?;
        let new_order = NewOrder {
          customer_name: customer.name,
          customer_email: customer.email,
          customer_phone: customer.phone,
          amount: guard.total,
          tx_ref: guard.deps.settings.next_tx_ref(),
        };
        (guard.deps.store.clone(), new_order, guard.lines.clone())
      };

      let order = store.insert_order(new_order, &lines).await?;
      info!(order_id = %order.id, tx_ref = %order.tx_ref, amount = %order.amount, "Order created.");
      ctx_data.write().order = Some(order);
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("initialize_payment", |ctx_data: ContextData<CheckoutCtxData>| {
    Box::pin(async move {
      let (deps, order) = {
        let guard = ctx_data.read();
        let order = guard
          .order
          .clone()
          .ok_or_else(|| missing_state("initialize_payment", "order"))?;
        (guard.deps.clone(), order)
      };

      let request = PaymentInit {
        email: order.customer_email.clone(),
        amount: minor_units(order.amount)?,
        reference: order.tx_ref.clone(),
        callback_url: deps.settings.callback_url.clone(),
      };

      let outcome = deps.gateway.initialize(&request).await.and_then(|session| {
        if session.reference == order.tx_ref {
          Ok(session)
        } else {
          Err(GatewayError::Malformed(format!(
            "initialized reference '{}' does not match '{}'",
            session.reference, order.tx_ref
          )))
        }
      });

      match outcome {
        Ok(session) => {
          info!(tx_ref = %order.tx_ref, "Payment initialized.");
          ctx_data.write().payment_link = Some(session.authorization_url);
          Ok::<_, ShopError>(())
        }
        Err(gateway_err) => {
          error!(tx_ref = %order.tx_ref, error = %gateway_err, "Payment initialization failed.");
          match deps.store.update_order_status(order.id, OrderStatus::Failed, None).await {
            Ok(failed) => ctx_data.write().order = Some(failed),
            Err(e) => error!(order_id = %order.id, error = %e, "Could not mark order as Failed."),
          }
          Err(ShopError::Gateway(gateway_err))
        }
      }
    })
  });

  p
}
