//! The stage state machine.
//!
//! [`decide`] is a pure function over the current record and an incoming
//! scan. The Scan Store applies its verdict under the per-tag critical
//! section, so concurrent scans of one tag are ordered by arrival and the
//! table below resolves conflicts deterministically.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, event::ScanEvent, stage::Stage, tag::TagRecord,
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// What a deployment does with scans for a tag already in `DONE`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReentryPolicy {
  /// `DONE` is terminal; further transition requests are rejected.
  #[default]
  Reject,
  /// A finished garment may re-enter tracking at any stage.
  Allow,
}

// ─── Rejection ───────────────────────────────────────────────────────────────

/// Why a scan was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
  /// The requested stage is earlier in the flow than the current one.
  Regression,
  /// The tag is in `DONE` and re-entry is disabled.
  Terminal,
  /// `observed_at` is older than the record's `stage_entered_at`.
  Stale,
}

impl RejectReason {
  /// The database name for this reason.
  pub fn as_str(self) -> &'static str {
    match self {
      RejectReason::Regression => "regression",
      RejectReason::Terminal => "terminal",
      RejectReason::Stale => "stale",
    }
  }

  /// Parse a database name produced by [`RejectReason::as_str`].
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "regression" => Ok(RejectReason::Regression),
      "terminal" => Ok(RejectReason::Terminal),
      "stale" => Ok(RejectReason::Stale),
      other => Err(Error::UnknownRejectReason(other.to_string())),
    }
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

/// The state machine's verdict on a scan event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  /// Create the record or advance its stage; a stage-change notification
  /// follows.
  Transition,
  /// Same-stage duplicate: refresh `attributes` and `last_seen_at` only.
  Refresh,
  /// Leave the record untouched and record the rejection.
  Reject(RejectReason),
}

/// Apply the transition table to `current` and `event`.
///
/// A first-ever scan enters tracking at whichever stage it declares. Equal
/// timestamps are not stale — the event processed later wins, so ties
/// resolve last-writer-wins at the serialization point.
pub fn decide(
  current: Option<&TagRecord>,
  event: &ScanEvent,
  policy: ReentryPolicy,
) -> Decision {
  let Some(record) = current else {
    return Decision::Transition;
  };

  if event.observed_at < record.stage_entered_at {
    return Decision::Reject(RejectReason::Stale);
  }

  if event.requested_stage == record.stage {
    return Decision::Refresh;
  }

  if record.stage.is_terminal() {
    return match policy {
      ReentryPolicy::Reject => Decision::Reject(RejectReason::Terminal),
      ReentryPolicy::Allow => Decision::Transition,
    };
  }

  match (record.stage, event.requested_stage) {
    // WAITING may skip straight to DONE (fast-path garments).
    (Stage::Waiting, Stage::InProgress | Stage::Done) => Decision::Transition,
    (Stage::InProgress, Stage::Done) => Decision::Transition,
    _ => Decision::Reject(RejectReason::Regression),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
