// server/src/web/identity.rs

use crate::errors::AppError;
use crate::state::AppState;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use atelier::models::IdentitySignal;
use atelier::store::UserDirectory;
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

/// The shopper behind a request: the user resolved from the access-token
/// cookie, the guest identifier cookie, or neither.
///
/// Extraction never fails on a missing identity; the flows that need one
/// reject it themselves.
#[derive(Debug, Clone)]
pub struct ShopperIdentity(pub IdentitySignal);

impl FromRequest for ShopperIdentity {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let Some(state) = state else {
      return Box::pin(async { Err(AppError::Internal("Application state is not configured".to_string())) });
    };

    let guest = req
      .cookie(&state.config.guest_cookie_name)
      .map(|c| c.value().to_string())
      .filter(|v| !v.trim().is_empty());
    let token = req
      .cookie(&state.config.access_cookie_name)
      .map(|c| c.value().to_string())
      .filter(|v| !v.trim().is_empty());

    Box::pin(async move {
      let user = match token {
        Some(token) => {
          let user = state.shop.deps().store.user_for_token(&token).await?;
          if user.is_none() {
            warn!("Access token cookie did not match a live session; treating request as anonymous.");
          }
          user
        }
        None => None,
      };
      debug!(has_user = user.is_some(), has_guest = guest.is_some(), "Resolved shopper identity.");
      Ok(ShopperIdentity(IdentitySignal { user, guest }))
    })
  }
}
