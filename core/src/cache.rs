// core/src/cache.rs

//! Short-lived keyed flags (verification codes, cooldowns, verified emails).

use crate::error::ShopResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// A key-value store whose entries expire. An entry is visible while
/// `now < expires_at`, so a zero TTL writes an already-expired entry.
#[async_trait]
pub trait FlagCache: Send + Sync {
  async fn set(&self, key: &str, value: &str, ttl: Duration) -> ShopResult<()>;

  async fn get(&self, key: &str) -> ShopResult<Option<String>>;

  async fn delete(&self, key: &str) -> ShopResult<()>;

  async fn contains(&self, key: &str) -> ShopResult<bool> {
    Ok(self.get(key).await?.is_some())
  }
}

pub fn expiry_from_now(ttl: Duration) -> DateTime<Utc> {
  let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
  Utc::now().checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Process-local cache, for tests and single-instance runs.
#[derive(Debug, Default)]
pub struct MemoryFlagCache {
  entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryFlagCache {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl FlagCache for MemoryFlagCache {
  async fn set(&self, key: &str, value: &str, ttl: Duration) -> ShopResult<()> {
    self
      .entries
      .lock()
      .insert(key.to_string(), (value.to_string(), expiry_from_now(ttl)));
    Ok(())
  }

  async fn get(&self, key: &str) -> ShopResult<Option<String>> {
    let mut entries = self.entries.lock();
    match entries.get(key) {
      Some((value, expires_at)) if Utc::now() < *expires_at => Ok(Some(value.clone())),
      Some(_) => {
        entries.remove(key);
        Ok(None)
      }
      None => Ok(None),
    }
  }

  async fn delete(&self, key: &str) -> ShopResult<()> {
    self.entries.lock().remove(key);
    Ok(())
  }
}
