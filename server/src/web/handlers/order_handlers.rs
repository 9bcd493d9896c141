// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct CheckOrdersPayload {
  #[serde(default)]
  pub email: String,
}

#[instrument(name = "handler::check_orders", skip(app_state, payload))]
pub async fn check_orders_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckOrdersPayload>,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.shop.orders().orders_for_email(&payload.email).await?;
  Ok(HttpResponse::Ok().json(orders))
}
