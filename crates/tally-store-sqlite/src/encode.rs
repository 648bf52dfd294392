//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Attributes are stored as
//! compact JSON. Stage and rejection-reason names reuse the wire codecs on
//! the core types.

use chrono::{DateTime, Utc};
use tally_core::{
  stage::Stage,
  store::RejectionRecord,
  tag::{GarmentAttributes, TagRecord},
  transition::RejectReason,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── GarmentAttributes ───────────────────────────────────────────────────────

pub fn encode_attributes(a: &GarmentAttributes) -> Result<String> {
  Ok(serde_json::to_string(a)?)
}

pub fn decode_attributes(s: &str) -> Result<GarmentAttributes> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `tags` row.
pub struct RawTagRecord {
  pub tag_id:           String,
  pub stage:            String,
  pub stage_entered_at: String,
  pub last_seen_at:     String,
  pub attributes_json:  String,
}

impl RawTagRecord {
  pub fn into_record(self) -> Result<TagRecord> {
    Ok(TagRecord {
      tag_id:           self.tag_id,
      stage:            Stage::parse(&self.stage)?,
      stage_entered_at: decode_dt(&self.stage_entered_at)?,
      last_seen_at:     decode_dt(&self.last_seen_at)?,
      attributes:       decode_attributes(&self.attributes_json)?,
    })
  }
}

/// Raw strings read directly from a `rejections` row.
pub struct RawRejection {
  pub tag_id:          String,
  pub requested_stage: String,
  pub observed_at:     String,
  pub source:          Option<String>,
  pub reason:          String,
  pub recorded_at:     String,
}

impl RawRejection {
  pub fn into_rejection(self) -> Result<RejectionRecord> {
    Ok(RejectionRecord {
      tag_id:          self.tag_id,
      requested_stage: Stage::parse(&self.requested_stage)?,
      observed_at:     decode_dt(&self.observed_at)?,
      source:          self.source,
      reason:          RejectReason::parse(&self.reason)?,
      recorded_at:     decode_dt(&self.recorded_at)?,
    })
  }
}
