// server/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use atelier::CheckoutRequest;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::identity::ShopperIdentity;

#[instrument(
  name = "handler::init_payment",
  skip(app_state, payload),
  fields(lines = payload.cart.len())
)]
pub async fn init_payment_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let receipt = app_state.shop.checkout(payload.into_inner()).await?;
  info!(order_id = %receipt.order.id, tx_ref = %receipt.order.tx_ref, "Checkout started.");
  Ok(HttpResponse::Ok().json(json!({ "payment_link": receipt.payment_link })))
}

#[instrument(name = "handler::verify_payment", skip(app_state, identity, path), fields(reference = %path.as_str()))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let confirmation = app_state.shop.verify_payment(path.trim(), &identity.0).await?;
  info!(order_id = %confirmation.order.id, transaction_id = %confirmation.transaction_id, "Payment reconciled.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Payment successful" })))
}
