//! Async HTTP client wrapping the tally JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::Deserialize;
use tally_core::snapshot::TagSummary;

/// `GET /card` response.
#[derive(Debug, Deserialize)]
pub struct Summary {
  pub waiting:  usize,
  pub progress: usize,
  pub done:     usize,
  pub stale:    bool,
}

/// `GET /card/{stage}` response.
#[derive(Debug, Deserialize)]
pub struct StageList {
  pub count: usize,
  pub data:  Vec<TagSummary>,
  pub stale: bool,
}

/// Async HTTP client for the tally JSON REST API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{path}", self.base_url.trim_end_matches('/'))
  }

  /// `GET /card`
  pub async fn summary(&self) -> Result<Summary> {
    let resp = self
      .client
      .get(self.url("/card"))
      .send()
      .await
      .context("GET /card failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET /card → {}", resp.status()));
    }
    resp.json().await.context("deserialising summary")
  }

  /// `GET /card/{stage}` where `stage` is `waiting`, `progress`, or `done`.
  pub async fn stage_list(&self, stage: &str) -> Result<StageList> {
    let path = format!("/card/{stage}");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;

    if !resp.status().is_success() {
      return Err(anyhow!("GET {path} → {}", resp.status()));
    }
    resp.json().await.context("deserialising stage list")
  }

  /// `POST /scan`
  pub async fn scan(&self, body: serde_json::Value) -> Result<serde_json::Value> {
    let resp = self
      .client
      .post(self.url("/scan"))
      .json(&body)
      .send()
      .await
      .context("POST /scan failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("POST /scan → {}", resp.status()));
    }
    resp.json().await.context("deserialising scan report")
  }
}
