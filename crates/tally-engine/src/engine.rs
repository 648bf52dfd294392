//! [`Engine`] — the ingest pipeline tying the Scan Store, Aggregator, and
//! Subscription Hub together.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tally_core::{
  event::ScanEvent,
  resolver::AttributeResolver,
  snapshot::{StageCounts, StageSnapshot},
  stage::Stage,
  store::{Applied, ScanStore},
  tag::GarmentAttributes,
  transition::RejectReason,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::Aggregator,
  hub::{Notification, SubscriptionHub},
};

// ─── Views ───────────────────────────────────────────────────────────────────

/// Per-stage counts plus the staleness marking for REST reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SummaryView {
  pub counts: StageCounts,
  /// True when a storage outage older than the freshness threshold is in
  /// effect; the counts are the last good snapshot.
  pub stale:  bool,
}

/// One stage's membership plus the staleness marking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageView {
  pub snapshot: StageSnapshot,
  pub stale:    bool,
}

// ─── Ingest report ───────────────────────────────────────────────────────────

/// What an ingested scan did, reported back to the scan source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestReport {
  Transitioned {
    tag_id:         String,
    previous_stage: Option<Stage>,
    stage:          Stage,
  },
  Refreshed {
    tag_id: String,
    stage:  Stage,
  },
  Rejected {
    tag_id: String,
    /// The stage the record stayed in.
    stage:  Stage,
    reason: RejectReason,
  },
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The scan-state engine: single owner of the aggregate view and the
/// subscription hub, constructed at process start and injected everywhere.
pub struct Engine<S, R> {
  store:          Arc<S>,
  resolver:       Arc<R>,
  aggregator:     Aggregator,
  hub:            SubscriptionHub,
  freshness:      chrono::Duration,
  degraded_since: RwLock<Option<DateTime<Utc>>>,
}

impl<S, R> Engine<S, R>
where
  S: ScanStore,
  R: AttributeResolver,
{
  /// `freshness` is how long a storage outage may last before REST reads are
  /// marked stale.
  pub fn new(store: Arc<S>, resolver: Arc<R>, freshness: Duration) -> Self {
    Self {
      store,
      resolver,
      aggregator: Aggregator::new(),
      hub: SubscriptionHub::new(),
      freshness: chrono::Duration::from_std(freshness)
        .unwrap_or_else(|_| chrono::Duration::seconds(30)),
      degraded_since: RwLock::new(None),
    }
  }

  /// Rebuild the aggregate view from the store. Returns the number of
  /// records loaded.
  pub async fn bootstrap(&self) -> Result<usize> {
    let records = self
      .store
      .load_all()
      .await
      .map_err(|e| Error::Storage(Box::new(e)))?;
    self.aggregator.rebuild(&records);
    Ok(records.len())
  }

  // ── Ingest path ───────────────────────────────────────────────────────

  /// Ingest one scan event.
  ///
  /// `inline_attributes` short-circuits the system-of-record lookup when
  /// the scan source already carries garment data. A failed lookup degrades
  /// the attributes instead of failing the scan. Only a storage failure is
  /// an error, and it is retryable.
  pub async fn ingest(
    &self,
    event: ScanEvent,
    inline_attributes: Option<GarmentAttributes>,
  ) -> Result<IngestReport> {
    let attributes = match inline_attributes {
      Some(attrs) => Some(attrs),
      None => match self.resolver.resolve(&event.tag_id).await {
        Ok(attrs) => Some(attrs),
        Err(e) => {
          tracing::warn!(
            tag_id = %event.tag_id,
            error = %e,
            "attribute lookup failed; keeping last known values"
          );
          None
        }
      },
    };

    let outcome = match self.store.upsert(event, attributes).await {
      Ok(outcome) => {
        *self.degraded_since.write() = None;
        outcome
      }
      Err(e) => {
        self
          .degraded_since
          .write()
          .get_or_insert_with(Utc::now);
        return Err(Error::Storage(Box::new(e)));
      }
    };

    let record = &outcome.record;
    match outcome.applied {
      Applied::Transitioned { previous } => {
        self.aggregator.apply_transition(record, previous);
        // A first-ever scan admits the tag without a stage change; only an
        // actual change fans out as a transition.
        if let Some(previous_stage) = previous {
          self.hub.publish(&Notification::Transition {
            tag_id:         record.tag_id.clone(),
            previous_stage,
            new_stage:      record.stage,
            attributes:     record.attributes.clone(),
          });
        }
        Ok(IngestReport::Transitioned {
          tag_id:         record.tag_id.clone(),
          previous_stage: previous,
          stage:          record.stage,
        })
      }

      Applied::Refreshed => {
        self.aggregator.apply_refresh(record);
        self.hub.publish(&Notification::AttributesRefreshed {
          tag_id:     record.tag_id.clone(),
          stage:      record.stage,
          attributes: record.attributes.clone(),
        });
        Ok(IngestReport::Refreshed {
          tag_id: record.tag_id.clone(),
          stage:  record.stage,
        })
      }

      Applied::Rejected(reason) => {
        tracing::debug!(
          tag_id = %record.tag_id,
          reason = reason.as_str(),
          stage = %record.stage,
          "scan rejected"
        );
        Ok(IngestReport::Rejected {
          tag_id: record.tag_id.clone(),
          stage:  record.stage,
          reason,
        })
      }
    }
  }

  // ── Query façade ──────────────────────────────────────────────────────

  /// Counts for all stages — a pure read of the aggregate snapshot.
  pub fn summary(&self) -> SummaryView {
    SummaryView {
      counts: self.aggregator.counts(),
      stale:  self.is_stale(),
    }
  }

  /// One stage's membership — a pure read of the aggregate snapshot.
  pub fn stage_view(&self, stage: Stage) -> StageView {
    StageView {
      snapshot: self.aggregator.snapshot(stage),
      stale:    self.is_stale(),
    }
  }

  fn is_stale(&self) -> bool {
    self
      .degraded_since
      .read()
      .is_some_and(|since| Utc::now() - since > self.freshness)
  }

  // ── Subscriptions ─────────────────────────────────────────────────────

  pub fn subscribe(
    &self,
    filter: Option<Stage>,
  ) -> (Uuid, mpsc::Receiver<Notification>) {
    self.hub.subscribe(filter)
  }

  pub fn unsubscribe(&self, id: Uuid) { self.hub.unsubscribe(id); }

  pub fn subscriber_count(&self) -> usize { self.hub.subscriber_count() }
}
