//! Error types for `tally-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown stage: {0:?}")]
  UnknownStage(String),

  #[error("unknown rejection reason: {0:?}")]
  UnknownRejectReason(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
