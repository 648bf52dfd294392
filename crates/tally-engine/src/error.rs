//! Error type for `tally-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The Scan Store could not apply the event. The scan was not ingested,
  /// no aggregate or notification side effect happened, and the caller may
  /// retry.
  #[error("scan store unavailable: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
