// server/src/services/paystack.rs

//! Paystack client behind the storefront's `PaymentGateway` seam.

use async_trait::async_trait;
use atelier::{GatewayError, GatewayTransaction, PaymentGateway, PaymentInit, PaymentSession};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
  status: bool,
  #[serde(default)]
  message: String,
  data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
  authorization_url: String,
  reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
  id: serde_json::Value,
  status: String,
  reference: String,
}

#[derive(Debug, Clone)]
pub struct PaystackGateway {
  base_url: Url,
  http: Client,
}

impl PaystackGateway {
  pub fn new(base_url: &str, secret_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
    let base_url = Url::parse(base_url)
      .map_err(|e| GatewayError::Malformed(format!("invalid base URL '{}': {}", base_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(GatewayError::Malformed(format!("base URL '{}' cannot carry a path", base_url)));
    }

    let mut headers = HeaderMap::new();
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", secret_key))
      .map_err(|e| GatewayError::Malformed(format!("invalid secret key header: {}", e)))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    let http = Client::builder()
      .timeout(timeout)
      .default_headers(headers)
      .build()
      .map_err(|e| GatewayError::Transport(format!("could not build HTTP client: {}", e)))?;

    Ok(Self { base_url, http })
  }

  /// Appends each segment to the base path, percent-encoding as needed.
  fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| GatewayError::Malformed("base URL cannot carry a path".to_string()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let envelope: Result<Envelope<T>, _> = response.json().await;

    match envelope {
      Ok(Envelope {
        status: true,
        data: Some(data),
        ..
      }) if status.is_success() => Ok(data),
      Ok(envelope) => Err(GatewayError::Rejected {
        status: status.as_u16(),
        message: envelope.message,
      }),
      Err(_) if !status.is_success() => Err(GatewayError::Rejected {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("unknown error").to_string(),
      }),
      Err(e) => Err(GatewayError::Malformed(e.to_string())),
    }
  }
}

fn transport(e: reqwest::Error) -> GatewayError {
  if e.is_timeout() {
    GatewayError::Transport("request timed out".to_string())
  } else {
    GatewayError::Transport(e.to_string())
  }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
  #[instrument(name = "paystack::initialize", skip(self, request), fields(reference = %request.reference, amount = request.amount))]
  async fn initialize(&self, request: &PaymentInit) -> Result<PaymentSession, GatewayError> {
    let url = self.endpoint(&["transaction", "initialize"])?;
    let response = self.http.post(url).json(request).send().await.map_err(transport)?;
    let data: InitializeData = Self::read_envelope(response).await.inspect_err(|e| {
      warn!(error = %e, "Paystack initialization failed.");
    })?;

    info!("Paystack transaction initialized.");
    Ok(PaymentSession {
      authorization_url: data.authorization_url,
      reference: data.reference,
    })
  }

  #[instrument(name = "paystack::verify", skip(self))]
  async fn verify(&self, reference: &str) -> Result<GatewayTransaction, GatewayError> {
    let url = self.endpoint(&["transaction", "verify", reference])?;
    let response = self.http.get(url).send().await.map_err(transport)?;
    let data: VerifyData = Self::read_envelope(response).await.inspect_err(|e| {
      warn!(error = %e, "Paystack verification failed.");
    })?;

    let id = match data.id {
      serde_json::Value::String(s) => s,
      other => other.to_string(),
    };
    Ok(GatewayTransaction {
      id,
      status: data.status,
      reference: data.reference,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn envelope_accepts_numeric_transaction_ids() {
    let body = r#"{"status":true,"message":"Verification successful","data":{"id":4099260516,"status":"success","reference":"tx-abc"}}"#;
    let parsed: Envelope<VerifyData> = serde_json::from_str(body).unwrap();
    let data = parsed.data.unwrap();
    assert_eq!(data.id.to_string(), "4099260516");
    assert_eq!(data.status, "success");
  }

  #[test]
  fn verify_reference_is_a_single_encoded_segment() {
    let gateway = PaystackGateway::new("https://api.paystack.co/", "sk_test", Duration::from_secs(1)).unwrap();
    let url = gateway.endpoint(&["transaction", "verify", "tx?a#b/../c"]).unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.paystack.co/transaction/verify/tx%3Fa%23b%2F..%2Fc"
    );
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
  }

  #[test]
  fn endpoint_keeps_a_base_path_prefix() {
    let gateway = PaystackGateway::new("http://127.0.0.1:9000/paystack", "sk_test", Duration::from_secs(1)).unwrap();
    let url = gateway.endpoint(&["transaction", "initialize"]).unwrap();
    assert_eq!(url.as_str(), "http://127.0.0.1:9000/paystack/transaction/initialize");
  }

  #[test]
  fn rejects_unparsable_base_url() {
    let err = PaystackGateway::new("not a url", "sk_test", Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)));
  }

  #[test]
  fn rejects_unprintable_secret() {
    let err = PaystackGateway::new("https://api.paystack.co", "bad\nkey", Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, GatewayError::Malformed(_)));
  }
}
