//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Rejected transitions are not errors — they serialize as ordinary ingest
/// reports. This type covers malformed requests and storage outages only.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The Scan Store is unreachable; the scan source should retry.
  #[error("storage unavailable: {0}")]
  Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match &self {
      ApiError::BadRequest(m) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": m })),
      )
        .into_response(),
      ApiError::Unavailable(e) => (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": e.to_string(), "retryable": true })),
      )
        .into_response(),
    }
  }
}
