// core/src/shop.rs

//! The storefront facade: one value wiring the store, gateway, cache and
//! mailer into every flow. Cheap to clone.

use crate::cache::FlagCache;
use crate::cart::CartService;
use crate::catalog::Catalog;
use crate::checkout::{build_checkout_pipeline, CheckoutCtxData, CheckoutReceipt, CheckoutRequest};
use crate::error::{ShopError, ShopResult};
use crate::gateway::PaymentGateway;
use crate::inbox::Inbox;
use crate::mail::Mailer;
use crate::models::IdentitySignal;
use crate::orders::OrderLookup;
use crate::payments::{build_reconcile_pipeline, PaymentConfirmation, ReconcileCtxData};
use crate::settings::ShopSettings;
use crate::store::ShopStore;
use crate::verification::EmailVerification;
use crate::workflow::{ContextData, Pipeline};
use std::sync::Arc;
use tracing::{info, instrument};

/// Collaborators every pipeline context carries.
#[derive(Clone)]
pub struct ShopDeps {
  pub store: Arc<dyn ShopStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub cache: Arc<dyn FlagCache>,
  pub mailer: Arc<dyn Mailer>,
  pub settings: Arc<ShopSettings>,
}

#[derive(Clone)]
pub struct Shop {
  deps: ShopDeps,
  catalog: Catalog,
  cart: CartService,
  verification: EmailVerification,
  orders: OrderLookup,
  inbox: Inbox,
  checkout_pipeline: Arc<Pipeline<CheckoutCtxData>>,
  reconcile_pipeline: Arc<Pipeline<ReconcileCtxData>>,
}

impl Shop {
  pub fn new(deps: ShopDeps) -> Self {
    info!(
      require_email_verification = deps.settings.require_email_verification,
      "Building storefront services."
    );
    Self {
      catalog: Catalog::new(deps.store.clone()),
      cart: CartService::new(deps.store.clone()),
      verification: EmailVerification::new(deps.cache.clone(), deps.mailer.clone(), deps.settings.clone()),
      orders: OrderLookup::new(deps.store.clone()),
      inbox: Inbox::new(deps.store.clone()),
      checkout_pipeline: Arc::new(build_checkout_pipeline()),
      reconcile_pipeline: Arc::new(build_reconcile_pipeline()),
      deps,
    }
  }

  pub fn deps(&self) -> &ShopDeps {
    &self.deps
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub fn cart(&self) -> &CartService {
    &self.cart
  }

  pub fn verification(&self) -> &EmailVerification {
    &self.verification
  }

  pub fn orders(&self) -> &OrderLookup {
    &self.orders
  }

  pub fn inbox(&self) -> &Inbox {
    &self.inbox
  }

  /// Creates a Pending order for the request and returns the hosted payment link.
  #[instrument(name = "Shop::checkout", skip_all)]
  pub async fn checkout(&self, request: CheckoutRequest) -> ShopResult<CheckoutReceipt> {
    let ctx_data = ContextData::new(CheckoutCtxData::new(self.deps.clone(), request));
    self.checkout_pipeline.run(ctx_data.clone()).await?;

    let guard = ctx_data.read();
    match (&guard.order, &guard.payment_link) {
      (Some(order), Some(link)) => Ok(CheckoutReceipt {
        order: order.clone(),
        payment_link: link.clone(),
      }),
      _ => Err(ShopError::Workflow {
        step_name: "checkout".to_string(),
        message: "run finished without a payment link".to_string(),
      }),
    }
  }

  /// Confirms `reference` with the gateway, marks its order Paid and clears the
  /// requester's cart.
  #[instrument(name = "Shop::verify_payment", skip(self, identity))]
  pub async fn verify_payment(&self, reference: &str, identity: &IdentitySignal) -> ShopResult<PaymentConfirmation> {
    let reference = reference.trim();
    if reference.is_empty() {
      return Err(ShopError::validation("No reference provided"));
    }
    let owner = identity.require_owner()?;

    let ctx_data = ContextData::new(ReconcileCtxData::new(self.deps.clone(), reference.to_string(), owner));
    self.reconcile_pipeline.run(ctx_data.clone()).await?;
    let confirmation = ctx_data.read().confirmation();
    confirmation
  }
}
