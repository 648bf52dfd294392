//! Snapshot read-model types — the Aggregator's externally visible view.
//!
//! These are computed copies, never stored. The dashboard renders them
//! directly, so [`TagSummary`] carries the denormalized attributes needed to
//! draw a list row without further lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tag::TagRecord;

/// Per-stage counts for the dashboard's summary card.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct StageCounts {
  pub waiting:  usize,
  pub progress: usize,
  pub done:     usize,
}

/// One flattened row of a stage's membership list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
  pub tag_id:           String,
  pub wo:               Option<String>,
  pub style:            Option<String>,
  pub buyer:            Option<String>,
  pub item:             Option<String>,
  pub color:            Option<String>,
  pub size:             Option<String>,
  pub stage_entered_at: DateTime<Utc>,
}

impl From<&TagRecord> for TagSummary {
  fn from(record: &TagRecord) -> Self {
    Self {
      tag_id:           record.tag_id.clone(),
      wo:               record.attributes.wo.clone(),
      style:            record.attributes.style.clone(),
      buyer:            record.attributes.buyer.clone(),
      item:             record.attributes.item.clone(),
      color:            record.attributes.color.clone(),
      size:             record.attributes.size.clone(),
      stage_entered_at: record.stage_entered_at,
    }
  }
}

/// A consistent point-in-time copy of one stage's membership.
///
/// `count == items.len()` always; the two are carried separately only
/// because the dashboard's card endpoints serialize them separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSnapshot {
  pub count: usize,
  pub items: Vec<TagSummary>,
}
