//! Server composition for tally.
//!
//! Wires the REST/WebSocket API to the engine and layers request tracing on
//! top. Binding, config loading, and process lifecycle live in `main`.

pub mod backend;

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use serde::Deserialize;
use tally_core::{resolver::AttributeResolver, store::ScanStore};
use tally_engine::Engine;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 4000 }
fn default_store_path() -> PathBuf { PathBuf::from("tally.db") }
fn default_freshness_secs() -> u64 { 30 }

/// Runtime server configuration, deserialised from `config.toml` with
/// `TALLY_`-prefixed environment overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:           String,
  #[serde(default = "default_port")]
  pub port:           u16,
  #[serde(default = "default_store_path")]
  pub store_path:     PathBuf,
  /// Base URL of the garment master-data backend. Absent means scans carry
  /// their own attributes inline or ingest with degraded ones.
  #[serde(default)]
  pub backend_url:    Option<String>,
  /// Allow garments to re-enter tracking after `DONE`.
  #[serde(default)]
  pub allow_reentry:  bool,
  /// How long a storage outage may last before reads are marked stale.
  #[serde(default = "default_freshness_secs")]
  pub freshness_secs: u64,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router for `engine`.
pub fn router<S, R>(engine: Arc<Engine<S, R>>) -> Router
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  tally_api::api_router(engine).layer(TraceLayer::new_for_http())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn from_toml(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn config_defaults_apply() {
    let cfg = from_toml("");
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 4000);
    assert_eq!(cfg.store_path, PathBuf::from("tally.db"));
    assert!(cfg.backend_url.is_none());
    assert!(!cfg.allow_reentry);
    assert_eq!(cfg.freshness_secs, 30);
  }

  #[test]
  fn config_file_overrides_defaults() {
    let cfg = from_toml(
      r#"
        host = "127.0.0.1"
        port = 9100
        store_path = "/var/lib/tally/scans.db"
        backend_url = "http://erp.internal:8080"
        allow_reentry = true
        freshness_secs = 5
      "#,
    );
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.backend_url.as_deref(), Some("http://erp.internal:8080"));
    assert!(cfg.allow_reentry);
    assert_eq!(cfg.freshness_secs, 5);
  }
}
