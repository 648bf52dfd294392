//! Attribute resolution against the backend system of record.
//!
//! The backend is only ever asked for one tag's master data at scan time —
//! it plays no part in snapshot reconstruction.

use std::time::Duration;

use reqwest::Client;
use tally_core::{resolver::AttributeResolver, tag::GarmentAttributes};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("backend returned {0}")]
  Status(reqwest::StatusCode),

  #[error("no backend configured")]
  NotConfigured,
}

/// Resolver backed by the garment master-data HTTP API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based. With no
/// `base_url` every lookup fails, which the engine turns into degraded
/// attributes; deployments whose scan sources post attributes inline run
/// fine without a backend.
#[derive(Clone)]
pub struct BackendResolver {
  client:   Client,
  base_url: Option<String>,
}

impl BackendResolver {
  pub fn new(base_url: Option<String>) -> Result<Self, ResolveError> {
    let client = Client::builder().timeout(Duration::from_secs(5)).build()?;
    Ok(Self { client, base_url })
  }
}

impl AttributeResolver for BackendResolver {
  type Error = ResolveError;

  async fn resolve(
    &self,
    tag_id: &str,
  ) -> Result<GarmentAttributes, ResolveError> {
    let Some(base) = &self.base_url else {
      return Err(ResolveError::NotConfigured);
    };

    let url = format!("{}/garments/{tag_id}", base.trim_end_matches('/'));
    let resp = self.client.get(url).send().await?;
    if !resp.status().is_success() {
      return Err(ResolveError::Status(resp.status()));
    }
    Ok(resp.json().await?)
  }
}
