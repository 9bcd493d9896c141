// server/src/web/routes.rs

use actix_web::{error, web, HttpRequest, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{
  cart_handlers, checkout_handlers, message_handlers, order_handlers, product_handlers, verification_handlers,
};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> error::Error {
  AppError::BadRequest(format!("Invalid request body: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> error::Error {
  AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> error::Error {
  AppError::BadRequest(format!("Invalid path parameter: {}", err)).into()
}

/// Mounts the storefront API under `/api`. Request-parsing failures render
/// through `AppError` like every other error.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(json_error))
    .app_data(web::QueryConfig::default().error_handler(query_error))
    .app_data(web::PathConfig::default().error_handler(path_error))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        // Catalog
        .route("/products/", web::get().to(product_handlers::list_products_handler))
        .route("/product/{product_id}/", web::get().to(product_handlers::get_product_handler))
        // Cart; `merge/` is registered ahead of the `{productId}` pattern.
        .route("/cart/merge/", web::post().to(cart_handlers::merge_cart_handler))
        .service(
          web::resource("/cart/")
            .route(web::get().to(cart_handlers::list_cart_handler))
            .route(web::post().to(cart_handlers::add_to_cart_handler))
            .route(web::put().to(cart_handlers::update_cart_item_handler))
            .route(web::delete().to(cart_handlers::remove_cart_item_handler)),
        )
        .route("/cart/{product_id}/", web::get().to(cart_handlers::cart_item_handler))
        // Checkout and payment reconciliation
        .route("/init-payment/", web::post().to(checkout_handlers::init_payment_handler))
        .route("/verify-payment/{reference}", web::get().to(checkout_handlers::verify_payment_handler))
        // Guest order lookup, inbox, email verification
        .route("/check-orders", web::post().to(order_handlers::check_orders_handler))
        .route("/customer-message/", web::post().to(message_handlers::customer_message_handler))
        .route("/send-verification-code/", web::post().to(verification_handlers::send_code_handler))
        .route("/verify-verification-code/", web::post().to(verification_handlers::verify_code_handler)),
    );
}
