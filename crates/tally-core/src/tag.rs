//! Tag records — the authoritative per-tag state owned by the Scan Store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Schema version stamped into every serialized [`GarmentAttributes`].
pub const ATTRIBUTES_VERSION: u32 = 1;

fn attributes_version() -> u32 { ATTRIBUTES_VERSION }

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Denormalized garment master data captured at scan time.
///
/// Values come from the backend system of record (or inline from the scan
/// source). A failed lookup keeps the last known values and sets `degraded`;
/// fields absent from records written under an older schema default to
/// `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentAttributes {
  #[serde(default = "attributes_version")]
  pub version:  u32,
  /// Work order number.
  #[serde(default)]
  pub wo:       Option<String>,
  #[serde(default)]
  pub style:    Option<String>,
  #[serde(default)]
  pub buyer:    Option<String>,
  #[serde(default)]
  pub item:     Option<String>,
  #[serde(default)]
  pub color:    Option<String>,
  #[serde(default)]
  pub size:     Option<String>,
  /// True when the last system-of-record lookup failed and the values above
  /// are carried over from an earlier scan.
  #[serde(default)]
  pub degraded: bool,
}

impl Default for GarmentAttributes {
  fn default() -> Self {
    Self {
      version:  ATTRIBUTES_VERSION,
      wo:       None,
      style:    None,
      buyer:    None,
      item:     None,
      color:    None,
      size:     None,
      degraded: false,
    }
  }
}

impl GarmentAttributes {
  /// The attributes to stamp when resolution failed: last known values,
  /// flagged as degraded. With no previous record, everything is `None`.
  pub fn degraded_from(previous: Option<&GarmentAttributes>) -> Self {
    let mut attrs = previous.cloned().unwrap_or_default();
    attrs.version = ATTRIBUTES_VERSION;
    attrs.degraded = true;
    attrs
  }
}

// ─── TagRecord ───────────────────────────────────────────────────────────────

/// One physical RFID tag currently tracked. A tag with no recorded scan does
/// not exist in the store — absence means untracked, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagRecord {
  pub tag_id:           String,
  pub stage:            Stage,
  /// Timestamp of the last accepted stage transition.
  pub stage_entered_at: DateTime<Utc>,
  /// Timestamp of the last observed scan, same-stage duplicates included.
  pub last_seen_at:     DateTime<Utc>,
  pub attributes:       GarmentAttributes,
}
