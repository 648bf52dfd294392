//! Handler for `POST /scan` — the ingest surface readers and the backend
//! bridge post to.

use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_core::{
  event::ScanEvent, resolver::AttributeResolver, stage::Stage,
  store::ScanStore, tag::GarmentAttributes,
};
use tally_engine::{Engine, IngestReport};

use crate::error::ApiError;

/// JSON body accepted by `POST /scan`.
#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub tag_id:      String,
  pub stage:       Stage,
  /// Defaults to the server clock for readers that don't timestamp.
  pub observed_at: Option<DateTime<Utc>>,
  /// Reader or location identifier.
  pub source:      Option<String>,
  /// Inline garment data from sources that already hold it; when present,
  /// the system-of-record lookup is skipped.
  pub attributes:  Option<GarmentAttributes>,
}

/// `POST /scan`
///
/// A rejected transition is a 200 with `"outcome": "rejected"` — only a
/// storage outage turns into an error (503, retryable).
pub async fn ingest<S, R>(
  State(engine): State<Arc<Engine<S, R>>>,
  Json(body): Json<ScanBody>,
) -> Result<Json<IngestReport>, ApiError>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  if body.tag_id.is_empty() {
    return Err(ApiError::BadRequest("tag_id must not be empty".to_string()));
  }

  let observed_at = body.observed_at.unwrap_or_else(Utc::now);
  let mut event = ScanEvent::new(body.tag_id, body.stage, observed_at);
  if let Some(source) = body.source {
    event = event.with_source(source);
  }

  let report = engine
    .ingest(event, body.attributes)
    .await
    .map_err(|e| ApiError::Unavailable(Box::new(e)))?;
  Ok(Json(report))
}
