//! JSON REST + WebSocket API for the tally scan-state tracker.
//!
//! Exposes an axum [`Router`] backed by a [`tally_engine::Engine`]. Auth,
//! TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(tally_api::api_router(engine.clone()))
//! ```

pub mod cards;
pub mod error;
pub mod scans;
pub mod ws;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::{resolver::AttributeResolver, store::ScanStore};
use tally_engine::Engine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, R>(engine: Arc<Engine<S, R>>) -> Router<()>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  Router::new()
    // Dashboard cards
    .route("/card", get(cards::summary::<S, R>))
    .route("/card/waiting", get(cards::waiting::<S, R>))
    .route("/card/progress", get(cards::progress::<S, R>))
    .route("/card/done", get(cards::done::<S, R>))
    // Scan ingestion
    .route("/scan", post(scans::ingest::<S, R>))
    // Push channel
    .route("/ws", get(ws::upgrade::<S, R>))
    .with_state(engine)
}

// ─── Integration tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use std::{convert::Infallible, sync::Arc, time::Duration};

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use tally_core::{
    resolver::AttributeResolver, tag::GarmentAttributes,
    transition::ReentryPolicy,
  };
  use tally_engine::Engine;
  use tally_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  struct StaticResolver;

  impl AttributeResolver for StaticResolver {
    type Error = Infallible;

    async fn resolve(
      &self,
      tag_id: &str,
    ) -> Result<GarmentAttributes, Infallible> {
      Ok(GarmentAttributes {
        wo: Some(format!("WO-{tag_id}")),
        buyer: Some("ACME".into()),
        ..GarmentAttributes::default()
      })
    }
  }

  async fn setup() -> Router {
    let store = SqliteStore::open_in_memory(ReentryPolicy::Reject)
      .await
      .expect("in-memory store");
    let engine = Engine::new(
      Arc::new(store),
      Arc::new(StaticResolver),
      Duration::from_secs(30),
    );
    api_router(Arc::new(engine))
  }

  async fn get_json(router: &Router, uri: &str) -> serde_json::Value {
    let resp = router
      .clone()
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  async fn post_scan(
    router: &Router,
    body: serde_json::Value,
  ) -> (StatusCode, serde_json::Value) {
    let resp = router
      .clone()
      .oneshot(
        Request::builder()
          .method("POST")
          .uri("/scan")
          .header(header::CONTENT_TYPE, "application/json")
          .body(Body::from(body.to_string()))
          .unwrap(),
      )
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      serde_json::Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
  }

  #[tokio::test]
  async fn summary_starts_empty() {
    let router = setup().await;
    let body = get_json(&router, "/card").await;
    assert_eq!(body["waiting"], 0);
    assert_eq!(body["progress"], 0);
    assert_eq!(body["done"], 0);
    assert_eq!(body["stale"], false);
  }

  #[tokio::test]
  async fn scan_then_cards_reflect_it() {
    let router = setup().await;

    let (status, report) = post_scan(
      &router,
      serde_json::json!({ "tag_id": "A1", "stage": "WAITING" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["outcome"], "transitioned");
    assert_eq!(report["stage"], "WAITING");

    let summary = get_json(&router, "/card").await;
    assert_eq!(summary["waiting"], 1);

    let waiting = get_json(&router, "/card/waiting").await;
    assert_eq!(waiting["count"], 1);
    assert_eq!(waiting["data"][0]["tag_id"], "A1");
    // Attributes resolved at scan time are denormalized into the list.
    assert_eq!(waiting["data"][0]["wo"], "WO-A1");
  }

  #[tokio::test]
  async fn full_walk_lands_in_done() {
    let router = setup().await;

    for stage in ["WAITING", "IN_PROGRESS", "DONE"] {
      let (status, _) = post_scan(
        &router,
        serde_json::json!({ "tag_id": "A1", "stage": stage }),
      )
      .await;
      assert_eq!(status, StatusCode::OK);
    }

    let done = get_json(&router, "/card/done").await;
    assert_eq!(done["count"], 1);
    assert_eq!(done["data"].as_array().unwrap().len(), 1);

    let progress = get_json(&router, "/card/progress").await;
    assert_eq!(progress["count"], 0);
  }

  #[tokio::test]
  async fn rejected_scan_is_reported_not_errored() {
    let router = setup().await;

    post_scan(
      &router,
      serde_json::json!({ "tag_id": "A2", "stage": "DONE" }),
    )
    .await;
    let (status, report) = post_scan(
      &router,
      serde_json::json!({ "tag_id": "A2", "stage": "WAITING" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["outcome"], "rejected");
    assert_eq!(report["reason"], "terminal");
    assert_eq!(report["stage"], "DONE");
  }

  #[tokio::test]
  async fn unknown_stage_is_a_client_error() {
    let router = setup().await;
    let (status, _) = post_scan(
      &router,
      serde_json::json!({ "tag_id": "A1", "stage": "SHIPPED" }),
    )
    .await;
    assert!(status.is_client_error(), "got {status}");
  }

  #[tokio::test]
  async fn empty_tag_id_is_rejected() {
    let router = setup().await;
    let (status, body) = post_scan(
      &router,
      serde_json::json!({ "tag_id": "", "stage": "WAITING" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn inline_attributes_flow_through_to_the_card() {
    let router = setup().await;

    post_scan(
      &router,
      serde_json::json!({
        "tag_id": "B7",
        "stage": "IN_PROGRESS",
        "attributes": { "wo": "WO-OVERRIDE", "color": "indigo" },
      }),
    )
    .await;

    let progress = get_json(&router, "/card/progress").await;
    assert_eq!(progress["data"][0]["wo"], "WO-OVERRIDE");
    assert_eq!(progress["data"][0]["color"], "indigo");
  }
}
