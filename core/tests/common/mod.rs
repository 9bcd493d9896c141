// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use atelier::models::{Category, Product};
use atelier::{
  CheckoutLine, CheckoutRequest, GatewayError, GatewayTransaction, InMemoryStore, Mailer, MemoryFlagCache,
  OutgoingMail, PaymentGateway, PaymentInit, PaymentSession, ProductRef, QuantityInput, Shop, ShopDeps, ShopSettings,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Catalog fixtures ---
pub const PRODUCT_A: Uuid = Uuid::from_u128(0xA);
pub const PRODUCT_B: Uuid = Uuid::from_u128(0xB);
pub const MISSING_PRODUCT: Uuid = Uuid::from_u128(0xDEAD);

pub fn product(id: Uuid, name: &str, price: Decimal) -> Product {
  Product {
    id,
    name: name.to_string(),
    description: Some(format!("{} description", name)),
    category: Category::Women,
    price,
    original_price: None,
    stock: 10,
    images: Vec::new(),
  }
}

/// Product A at 10.00, product B at 5.00.
pub fn seeded_store() -> InMemoryStore {
  InMemoryStore::with_products([
    product(PRODUCT_A, "Ankara Dress", Decimal::new(1000, 2)),
    product(PRODUCT_B, "Beaded Bag", Decimal::new(500, 2)),
  ])
}

pub fn checkout_request(email: &str, lines: &[(Uuid, i64)]) -> CheckoutRequest {
  CheckoutRequest {
    customer_name: Some("Ada Obi".to_string()),
    customer_email: Some(email.to_string()),
    customer_phone: Some("08030000000".to_string()),
    cart: lines
      .iter()
      .map(|(id, qty)| CheckoutLine {
        product: ProductRef { id: *id },
        quantity: QuantityInput::Whole(*qty),
      })
      .collect(),
  }
}

// --- Scripted payment gateway ---
#[derive(Debug)]
pub struct FakeGateway {
  pub init_requests: Mutex<Vec<PaymentInit>>,
  pub init_failure: Mutex<Option<GatewayError>>,
  pub verify_outcome: Mutex<Result<String, GatewayError>>,
  pub verify_calls: AtomicUsize,
  /// Reference the provider echoes back instead of the requested one.
  pub echoed_reference: Mutex<Option<String>>,
}

impl FakeGateway {
  /// Initializes every payment and reports every verification as "success".
  pub fn approving() -> Self {
    Self {
      init_requests: Mutex::new(Vec::new()),
      init_failure: Mutex::new(None),
      verify_outcome: Mutex::new(Ok("success".to_string())),
      verify_calls: AtomicUsize::new(0),
      echoed_reference: Mutex::new(None),
    }
  }

  pub fn failing_initialize(self, err: GatewayError) -> Self {
    *self.init_failure.lock() = Some(err);
    self
  }

  pub fn echoing_reference(self, reference: &str) -> Self {
    *self.echoed_reference.lock() = Some(reference.to_string());
    self
  }

  fn echo(&self, requested: &str) -> String {
    self.echoed_reference.lock().clone().unwrap_or_else(|| requested.to_string())
  }

  pub fn verifying_as(self, status: &str) -> Self {
    *self.verify_outcome.lock() = Ok(status.to_string());
    self
  }

  pub fn failing_verify(self, err: GatewayError) -> Self {
    *self.verify_outcome.lock() = Err(err);
    self
  }

  pub fn verify_call_count(&self) -> usize {
    self.verify_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn initialize(&self, request: &PaymentInit) -> Result<PaymentSession, GatewayError> {
    self.init_requests.lock().push(request.clone());
    if let Some(err) = self.init_failure.lock().clone() {
      return Err(err);
    }
    Ok(PaymentSession {
      authorization_url: format!("https://pay.test/{}", request.reference),
      reference: self.echo(&request.reference),
    })
  }

  async fn verify(&self, reference: &str) -> Result<GatewayTransaction, GatewayError> {
    self.verify_calls.fetch_add(1, Ordering::SeqCst);
    let status = self.verify_outcome.lock().clone()?;
    Ok(GatewayTransaction {
      id: format!("txn-{}", reference),
      status,
      reference: self.echo(reference),
    })
  }
}

// --- Recording mailer ---
#[derive(Debug, Default)]
pub struct RecordingMailer {
  pub sent: Mutex<Vec<OutgoingMail>>,
  pub fail: AtomicBool,
}

impl RecordingMailer {
  pub fn last_code_for(&self, email: &str) -> Option<String> {
    self
      .sent
      .lock()
      .iter()
      .rev()
      .find(|m| m.to == email)
      .and_then(|m| six_digit_run(&m.html_body))
  }
}

fn six_digit_run(text: &str) -> Option<String> {
  let mut run = String::new();
  for c in text.chars().chain(std::iter::once(' ')) {
    if c.is_ascii_digit() {
      run.push(c);
    } else {
      if run.len() == 6 {
        return Some(run);
      }
      run.clear();
    }
  }
  None
}

#[async_trait]
impl Mailer for RecordingMailer {
  async fn send(&self, mail: OutgoingMail) -> Result<(), String> {
    if self.fail.load(Ordering::SeqCst) {
      return Err("smtp connection refused".to_string());
    }
    self.sent.lock().push(mail);
    Ok(())
  }
}

// --- Wiring ---
pub struct Harness {
  pub shop: Shop,
  pub store: Arc<InMemoryStore>,
  pub gateway: Arc<FakeGateway>,
  pub cache: Arc<MemoryFlagCache>,
  pub mailer: Arc<RecordingMailer>,
}

pub fn test_settings() -> ShopSettings {
  ShopSettings {
    require_email_verification: false,
    callback_url: "https://shop.test/payment/callback".to_string(),
    ..ShopSettings::default()
  }
}

pub fn harness() -> Harness {
  harness_with(test_settings(), FakeGateway::approving())
}

pub fn harness_with(settings: ShopSettings, gateway: FakeGateway) -> Harness {
  let store = Arc::new(seeded_store());
  let gateway = Arc::new(gateway);
  let cache = Arc::new(MemoryFlagCache::new());
  let mailer = Arc::new(RecordingMailer::default());
  let shop = Shop::new(ShopDeps {
    store: store.clone(),
    gateway: gateway.clone(),
    cache: cache.clone(),
    mailer: mailer.clone(),
    settings: Arc::new(settings),
  });
  Harness {
    shop,
    store,
    gateway,
    cache,
    mailer,
  }
}

pub fn qty(n: i64) -> QuantityInput {
  QuantityInput::Whole(n)
}
