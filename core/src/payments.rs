// core/src/payments.rs

//! Payment reconciliation: confirms a reference with the gateway, settles the
//! order and clears the shopper's cart.

use crate::error::{ShopError, ShopResult};
use crate::gateway::{GatewayError, GatewayTransaction};
use crate::models::{CartOwner, Order, OrderStatus};
use crate::shop::ShopDeps;
use crate::verification::verified_key;
use crate::workflow::{ContextData, Pipeline};
use tracing::{info, warn};

#[derive(Clone)]
pub struct ReconcileCtxData {
  pub deps: ShopDeps,
  pub reference: String,
  pub owner: CartOwner,
  pub transaction: Option<GatewayTransaction>,
  pub order: Option<Order>,
}

impl ReconcileCtxData {
  pub fn new(deps: ShopDeps, reference: String, owner: CartOwner) -> Self {
    Self {
      deps,
      reference,
      owner,
      transaction: None,
      order: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentConfirmation {
  pub order: Order,
  pub transaction_id: String,
}

impl ReconcileCtxData {
  pub(crate) fn confirmation(&self) -> ShopResult<PaymentConfirmation> {
    match (&self.order, &self.transaction) {
      (Some(order), Some(txn)) => Ok(PaymentConfirmation {
        order: order.clone(),
        transaction_id: txn.id.clone(),
      }),
      _ => Err(ShopError::Workflow {
        step_name: "reconcile".to_string(),
        message: "run completed without a settled order".to_string(),
      }),
    }
  }
}

pub fn build_reconcile_pipeline() -> Pipeline<ReconcileCtxData> {
  let mut p = Pipeline::new(
    "reconcile_payment",
    &[
      ("verify_with_gateway", None),
      ("mark_order_paid", None),
      ("clear_verified_email", None),
      ("clear_shopper_cart", None),
    ],
  );

  p.on_root("verify_with_gateway", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (gateway, reference) = {
        let guard = ctx_data.read();
        (guard.deps.gateway.clone(), guard.reference.clone())
      };
      let transaction = gateway.verify(&reference).await?;
      if transaction.reference != reference {
        warn!(%reference, returned = %transaction.reference, "Gateway verified a different reference.");
        return Err(ShopError::Gateway(GatewayError::Malformed(format!(
          "verified reference '{}' does not match '{}'",
          transaction.reference, reference
        ))));
      }
      if !transaction.is_success() {
        warn!(%reference, status = %transaction.status, "Gateway reports payment not successful.");
        return Err(ShopError::PaymentDeclined(transaction.status));
      }
      ctx_data.write().transaction = Some(transaction);
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("mark_order_paid", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (store, reference, transaction_id) = {
        let guard = ctx_data.read();
        let transaction_id = guard.transaction.as_ref().map(|t| t.id.clone()).ok_or_else(|| ShopError::Workflow {
          step_name: "mark_order_paid".to_string(),
          message: "transaction was not set by an earlier step".to_string(),
        })?;
        (guard.deps.store.clone(), guard.reference.clone(), transaction_id)
      };

      let order = store
        .find_order_by_reference(&reference)
        .await?
        .ok_or_else(|| ShopError::OrderNotFound(reference.clone()))?;
      let paid = store
        .update_order_status(order.id, OrderStatus::Paid, Some(&transaction_id))
        .await?;
      info!(order_id = %paid.id, %reference, %transaction_id, "Order marked Paid.");
      ctx_data.write().order = Some(paid);
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("clear_verified_email", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (cache, email) = {
        let guard = ctx_data.read();
        (guard.deps.cache.clone(), guard.order.as_ref().map(|o| o.customer_email.clone()))
      };
      if let Some(email) = email {
        cache.delete(&verified_key(&email)).await?;
      }
      Ok::<_, ShopError>(())
    })
  });

  p.on_root("clear_shopper_cart", |ctx_data: ContextData<ReconcileCtxData>| {
    Box::pin(async move {
      let (store, owner) = {
        let guard = ctx_data.read();
        (guard.deps.store.clone(), guard.owner.clone())
      };
      if !store.delete_cart(&owner).await? {
        warn!(%owner, "Paid order had no cart left to clear.");
        return Err(ShopError::CartNotFound);
      }
      info!(%owner, "Shopper cart cleared after payment.");
      Ok::<_, ShopError>(())
    })
  });

  p
}
