// server/src/state.rs

use crate::config::AppConfig;
use atelier::Shop;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub shop: Shop,
  pub config: Arc<AppConfig>,
}
