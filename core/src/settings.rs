// core/src/settings.rs

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub type TxRefGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Runtime knobs for the storefront flows. The server fills these from its
/// environment; tests construct them directly.
#[derive(Clone)]
pub struct ShopSettings {
  /// Checkout refuses emails without a live verified flag when set.
  pub require_email_verification: bool,
  /// Where the gateway sends the shopper after the hosted payment page.
  pub callback_url: String,
  pub verification_code_ttl: Duration,
  pub verification_cooldown: Duration,
  pub verified_email_ttl: Duration,
  pub tx_ref_generator: TxRefGenerator,
}

impl ShopSettings {
  pub fn next_tx_ref(&self) -> String {
    (self.tx_ref_generator)()
  }

  pub fn with_tx_ref_generator(mut self, generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
    self.tx_ref_generator = Arc::new(generator);
    self
  }
}

impl Default for ShopSettings {
  fn default() -> Self {
    Self {
      require_email_verification: true,
      callback_url: String::new(),
      verification_code_ttl: Duration::from_secs(300),
      verification_cooldown: Duration::from_secs(60),
      verified_email_ttl: Duration::from_secs(900),
      tx_ref_generator: Arc::new(new_tx_ref),
    }
  }
}

impl std::fmt::Debug for ShopSettings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ShopSettings")
      .field("require_email_verification", &self.require_email_verification)
      .field("callback_url", &self.callback_url)
      .field("verification_code_ttl", &self.verification_code_ttl)
      .field("verification_cooldown", &self.verification_cooldown)
      .field("verified_email_ttl", &self.verified_email_ttl)
      .finish_non_exhaustive()
  }
}

/// `tx-` followed by ten random hex characters.
pub fn new_tx_ref() -> String {
  let hex = Uuid::new_v4().simple().to_string();
  format!("tx-{}", &hex[..10])
}
