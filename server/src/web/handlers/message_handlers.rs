// server/src/web/handlers/message_handlers.rs

use actix_web::{web, HttpResponse};
use atelier::models::NewCustomerMessage;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[instrument(name = "handler::customer_message", skip(app_state, payload))]
pub async fn customer_message_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewCustomerMessage>,
) -> Result<HttpResponse, AppError> {
  let stored = app_state.shop.inbox().submit(payload.into_inner()).await?;
  info!(message_id = %stored.id, "Customer message stored.");
  Ok(HttpResponse::Created().json(json!({ "message": "Message sent successfully" })))
}
