//! Error type for `tally-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The state machine produced a record-relative verdict for a tag that has
  /// no record. Indicates a corrupted row rather than a caller mistake.
  #[error("no record for tag {0:?} while applying a record-relative verdict")]
  MissingRecord(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
