//! HTTP server wiring for Tripshare.
//!
//! Mounts the JSON API from `tripshare-api` under `/api` and adds request
//! tracing. The binary in `main.rs` loads [`ServerConfig`] and opens the
//! SQLite store.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tripshare_core::store::TripStore;
use tripshare_store_sqlite::StoreOptions;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TRIPSHARE_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                     String,
  #[serde(default = "default_port")]
  pub port:                     u16,
  #[serde(default = "default_store_path")]
  pub store_path:               PathBuf,
  /// Attempts per transaction before a conflicting write is reported as
  /// unavailable.
  #[serde(default = "default_max_attempts")]
  pub max_transaction_attempts: u32,
  #[serde(default = "default_retry_backoff_ms")]
  pub retry_backoff_ms:         u64,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/tripshare/tripshare.db") }

fn default_max_attempts() -> u32 { StoreOptions::default().max_attempts }

fn default_retry_backoff_ms() -> u64 { 20 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      max_attempts: self.max_transaction_attempts,
      retry_backoff: Duration::from_millis(self.retry_backoff_ms),
      ..StoreOptions::default()
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level [`Router`]: the API under `/api`, traced.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: TripStore + 'static,
{
  Router::new()
    .nest("/api", tripshare_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
