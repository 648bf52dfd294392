//! The `ScanStore` trait and upsert outcome types.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-engine`, `tally-api`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  event::ScanEvent,
  stage::Stage,
  tag::{GarmentAttributes, TagRecord},
  transition::RejectReason,
};

// ─── Outcome types ───────────────────────────────────────────────────────────

/// How an upsert changed (or declined to change) a tag record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  /// The record was created or its stage advanced.
  /// `previous` is `None` on a first-ever scan.
  Transitioned { previous: Option<Stage> },
  /// Same-stage duplicate; `attributes` and `last_seen_at` refreshed.
  Refreshed,
  /// Nothing changed; the rejection was recorded.
  Rejected(RejectReason),
}

/// Result of [`ScanStore::upsert`].
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
  pub applied: Applied,
  /// The record after the upsert — unchanged when the scan was rejected.
  pub record:  TagRecord,
}

/// A recorded rejection, read back for diagnostics.
#[derive(Debug, Clone)]
pub struct RejectionRecord {
  pub tag_id:          String,
  pub requested_stage: Stage,
  pub observed_at:     DateTime<Utc>,
  pub source:          Option<String>,
  pub reason:          RejectReason,
  pub recorded_at:     DateTime<Utc>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the durable Scan Store.
///
/// [`ScanStore::upsert`] is the only mutation path. Acceptance is delegated
/// to the stage state machine and applied atomically per `tag_id`:
/// concurrent upserts for one tag are serialized, upserts for different tags
/// proceed in parallel.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ScanStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Latest known record for a tag. `None` means untracked.
  fn get<'a>(
    &'a self,
    tag_id: &'a str,
  ) -> impl Future<Output = Result<Option<TagRecord>, Self::Error>> + Send + 'a;

  /// Validate `event` against the current record and apply its effect.
  ///
  /// `attributes` is the resolved garment metadata to stamp onto the
  /// record; `None` means resolution failed, in which case the last known
  /// values are kept and flagged as degraded.
  ///
  /// A refused transition is reported as [`Applied::Rejected`], never as an
  /// error. `Err` is reserved for storage failure and is retryable — the
  /// record is left unchanged and no aggregate or notification side effects
  /// may be applied by the caller.
  fn upsert(
    &self,
    event: ScanEvent,
    attributes: Option<GarmentAttributes>,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Every tracked record. Used once at process start to rebuild the
  /// aggregate snapshot; never called on the hot path.
  fn load_all(
    &self,
  ) -> impl Future<Output = Result<Vec<TagRecord>, Self::Error>> + Send + '_;

  /// Recorded rejections for a tag, oldest first.
  fn rejections_for<'a>(
    &'a self,
    tag_id: &'a str,
  ) -> impl Future<Output = Result<Vec<RejectionRecord>, Self::Error>> + Send + 'a;
}
