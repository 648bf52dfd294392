//! Handlers for the dashboard's `/card` endpoints — the Query Façade.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/card` | Counts for all three stages |
//! | `GET`  | `/card/waiting` | Membership list, stage = WAITING |
//! | `GET`  | `/card/progress` | Membership list, stage = IN_PROGRESS |
//! | `GET`  | `/card/done` | Membership list, stage = DONE |
//!
//! All four are pure reads of the Aggregator's snapshot — nothing here
//! recomputes against the store or the backend system of record.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tally_core::{
  resolver::AttributeResolver, snapshot::TagSummary, stage::Stage,
  store::ScanStore,
};
use tally_engine::Engine;

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryBody {
  pub waiting:  usize,
  pub progress: usize,
  pub done:     usize,
  /// True when these counts are a last-good snapshot older than the
  /// freshness threshold (storage outage in effect).
  pub stale:    bool,
}

/// `GET /card`
pub async fn summary<S, R>(
  State(engine): State<Arc<Engine<S, R>>>,
) -> Json<SummaryBody>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  let view = engine.summary();
  Json(SummaryBody {
    waiting:  view.counts.waiting,
    progress: view.counts.progress,
    done:     view.counts.done,
    stale:    view.stale,
  })
}

// ─── Stage lists ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StageBody {
  pub count: usize,
  pub data:  Vec<TagSummary>,
  pub stale: bool,
}

fn stage_body<S, R>(engine: &Engine<S, R>, stage: Stage) -> Json<StageBody>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  let view = engine.stage_view(stage);
  Json(StageBody {
    count: view.snapshot.count,
    data:  view.snapshot.items,
    stale: view.stale,
  })
}

/// `GET /card/waiting`
pub async fn waiting<S, R>(
  State(engine): State<Arc<Engine<S, R>>>,
) -> Json<StageBody>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  stage_body(&engine, Stage::Waiting)
}

/// `GET /card/progress`
pub async fn progress<S, R>(
  State(engine): State<Arc<Engine<S, R>>>,
) -> Json<StageBody>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  stage_body(&engine, Stage::InProgress)
}

/// `GET /card/done`
pub async fn done<S, R>(
  State(engine): State<Arc<Engine<S, R>>>,
) -> Json<StageBody>
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  stage_body(&engine, Stage::Done)
}
