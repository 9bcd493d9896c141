// server/src/web/handlers/verification_handlers.rs

use actix_web::{web, HttpResponse};
use atelier::CodeInput;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct SendCodePayload {
  #[serde(default)]
  pub email: String,
}

#[derive(Deserialize, Debug)]
pub struct VerifyCodePayload {
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub verification_code: CodeInput,
}

#[instrument(name = "handler::send_verification_code", skip(app_state, payload))]
pub async fn send_code_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SendCodePayload>,
) -> Result<HttpResponse, AppError> {
  app_state.shop.verification().send_code(payload.email.trim()).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "verification code sent." })))
}

#[instrument(name = "handler::verify_verification_code", skip(app_state, payload))]
pub async fn verify_code_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<VerifyCodePayload>,
) -> Result<HttpResponse, AppError> {
  app_state
    .shop
    .verification()
    .verify_code(payload.email.trim(), &payload.verification_code.to_string())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Email verified" })))
}
