// server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use atelier::{QuantityInput, ShopError};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::identity::ShopperIdentity;

#[derive(Deserialize, Debug)]
pub struct CartItemPayload {
  #[serde(rename = "productId")]
  pub product_id: Option<Uuid>,
  #[serde(default)]
  pub quantity: QuantityInput,
}

impl CartItemPayload {
  fn product_id(&self) -> Result<Uuid, AppError> {
    self
      .product_id
      .ok_or_else(|| AppError::BadRequest("productId is required".to_string()))
  }
}

#[derive(Deserialize, Debug)]
pub struct ProductQuery {
  #[serde(rename = "productId")]
  pub product_id: Uuid,
}

#[instrument(name = "handler::list_cart", skip(app_state, identity))]
pub async fn list_cart_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
) -> Result<HttpResponse, AppError> {
  let lines = app_state.shop.cart().list(&identity.0).await?;
  Ok(HttpResponse::Ok().json(lines))
}

#[instrument(name = "handler::add_to_cart", skip(app_state, identity, payload))]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
  payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse, AppError> {
  let product_id = payload.product_id()?;
  let item = app_state
    .shop
    .cart()
    .add(&identity.0, product_id, &payload.quantity)
    .await?;

  info!(%product_id, quantity = item.quantity, "Cart item added.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Cart item added successfully",
    "item": item,
  })))
}

#[instrument(name = "handler::update_cart_item", skip(app_state, identity, payload))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
  payload: web::Json<CartItemPayload>,
) -> Result<HttpResponse, AppError> {
  let product_id = payload.product_id()?;
  let item = app_state
    .shop
    .cart()
    .update(&identity.0, product_id, &payload.quantity)
    .await?;

  Ok(HttpResponse::Ok().json(json!({
    "message": "Cart item quantity updated",
    "item": item,
  })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, identity, query), fields(product_id = %query.product_id))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
  query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
  let items = app_state.shop.cart().remove(&identity.0, query.product_id).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Item deleted successfully",
    "items": items,
  })))
}

/// Quantity of one product in the shopper's cart, or `{}` when there is none.
#[instrument(name = "handler::cart_item", skip(app_state, identity, path), fields(product_id = %path.as_ref()))]
pub async fn cart_item_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  match app_state.shop.cart().item(&identity.0, path.into_inner()).await? {
    Some(item) => Ok(HttpResponse::Ok().json(item)),
    None => Ok(HttpResponse::Ok().json(json!({}))),
  }
}

#[instrument(name = "handler::merge_cart", skip(app_state, identity))]
pub async fn merge_cart_handler(
  app_state: web::Data<AppState>,
  identity: ShopperIdentity,
) -> Result<HttpResponse, AppError> {
  let Some(user) = identity.0.user else {
    warn!("Cart merge attempted without a signed-in user.");
    return Err(ShopError::validation("User must be logged in to merge cart").into());
  };
  let Some(guest) = identity.0.guest.as_deref() else {
    return Err(ShopError::validation("No temporary cart found").into());
  };

  let lines = app_state.shop.cart().merge_guest_cart(user, guest).await?;
  info!(%user, lines = lines.len(), "Guest cart merged.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Cart merged successfully",
    "items": lines,
  })))
}
