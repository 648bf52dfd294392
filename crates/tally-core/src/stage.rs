//! Production stages a tracked garment moves through.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The tracked production state of a garment.
///
/// The set is closed at compile time. Wire and database names are the
/// uppercase forms the dashboard expects (`WAITING`, `IN_PROGRESS`, `DONE`).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
  Waiting,
  InProgress,
  Done,
}

impl Stage {
  /// All stages in production order.
  pub const ALL: [Stage; 3] = [Stage::Waiting, Stage::InProgress, Stage::Done];

  /// The wire/database name for this stage.
  pub fn as_str(self) -> &'static str {
    match self {
      Stage::Waiting => "WAITING",
      Stage::InProgress => "IN_PROGRESS",
      Stage::Done => "DONE",
    }
  }

  /// Parse a wire/database name produced by [`Stage::as_str`].
  pub fn parse(s: &str) -> Result<Self> {
    match s {
      "WAITING" => Ok(Stage::Waiting),
      "IN_PROGRESS" => Ok(Stage::InProgress),
      "DONE" => Ok(Stage::Done),
      other => Err(Error::UnknownStage(other.to_string())),
    }
  }

  /// `DONE` is the terminal stage. Whether it stays terminal is decided by
  /// [`crate::transition::ReentryPolicy`].
  pub fn is_terminal(self) -> bool { matches!(self, Stage::Done) }
}

impl std::fmt::Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
