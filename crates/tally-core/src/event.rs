//! Scan events — the input to the stage state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A raw scan observation from a reader or the backend bridge.
///
/// Never persisted on its own; only its accepted effect on a
/// [`TagRecord`](crate::tag::TagRecord) survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
  pub tag_id:          String,
  pub requested_stage: Stage,
  /// When the reader observed the tag.
  pub observed_at:     DateTime<Utc>,
  /// Reader or location identifier, when the source reports one.
  pub source:          Option<String>,
}

impl ScanEvent {
  /// Convenience constructor with no source attribution.
  pub fn new(
    tag_id: impl Into<String>,
    requested_stage: Stage,
    observed_at: DateTime<Utc>,
  ) -> Self {
    Self {
      tag_id: tag_id.into(),
      requested_stage,
      observed_at,
      source: None,
    }
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }
}
