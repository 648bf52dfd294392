//! The Aggregator — incremental per-stage membership and counts.
//!
//! Holds a derived, never-authoritative view rebuilt from the Scan Store's
//! mutations. All mutation methods do O(1) work under the write lock, so the
//! only global critical section on the ingest path stays short; readers get
//! a consistent copy and never observe a half-applied transition.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tally_core::{
  snapshot::{StageCounts, StageSnapshot, TagSummary},
  stage::Stage,
  tag::TagRecord,
};

// ─── Internal state ──────────────────────────────────────────────────────────

#[derive(Default)]
struct StageSets {
  waiting:  HashSet<String>,
  progress: HashSet<String>,
  done:     HashSet<String>,
  /// Denormalized row per tracked tag, shared by all three sets.
  items:    HashMap<String, TagSummary>,
}

impl StageSets {
  fn set(&self, stage: Stage) -> &HashSet<String> {
    match stage {
      Stage::Waiting => &self.waiting,
      Stage::InProgress => &self.progress,
      Stage::Done => &self.done,
    }
  }

  fn set_mut(&mut self, stage: Stage) -> &mut HashSet<String> {
    match stage {
      Stage::Waiting => &mut self.waiting,
      Stage::InProgress => &mut self.progress,
      Stage::Done => &mut self.done,
    }
  }
}

// ─── Aggregator ──────────────────────────────────────────────────────────────

/// Incrementally maintained stage membership. See module docs.
#[derive(Default)]
pub struct Aggregator {
  inner: RwLock<StageSets>,
}

impl Aggregator {
  pub fn new() -> Self { Self::default() }

  /// Replace the whole view from the store's records. Called once at
  /// process start; never on the hot path.
  pub fn rebuild(&self, records: &[TagRecord]) {
    let mut inner = self.inner.write();
    *inner = StageSets::default();
    for record in records {
      inner.set_mut(record.stage).insert(record.tag_id.clone());
      inner
        .items
        .insert(record.tag_id.clone(), TagSummary::from(record));
    }
  }

  /// Apply an accepted stage change: the tag moves from `previous`'s set
  /// (no-op if it was untracked) into the record's current set.
  pub fn apply_transition(&self, record: &TagRecord, previous: Option<Stage>) {
    let mut inner = self.inner.write();
    if let Some(previous) = previous {
      inner.set_mut(previous).remove(&record.tag_id);
    }
    inner.set_mut(record.stage).insert(record.tag_id.clone());
    inner
      .items
      .insert(record.tag_id.clone(), TagSummary::from(record));
  }

  /// Apply an attributes-only refresh: membership and counts are untouched.
  pub fn apply_refresh(&self, record: &TagRecord) {
    let mut inner = self.inner.write();
    inner
      .items
      .insert(record.tag_id.clone(), TagSummary::from(record));
  }

  /// Current per-stage counts.
  pub fn counts(&self) -> StageCounts {
    let inner = self.inner.read();
    StageCounts {
      waiting:  inner.waiting.len(),
      progress: inner.progress.len(),
      done:     inner.done.len(),
    }
  }

  /// A consistent copy of one stage's membership, ordered by entry time
  /// (ties broken by tag id) so repeated reads render stably.
  pub fn snapshot(&self, stage: Stage) -> StageSnapshot {
    let inner = self.inner.read();
    let set = inner.set(stage);
    let mut items: Vec<TagSummary> = set
      .iter()
      .filter_map(|tag_id| inner.items.get(tag_id).cloned())
      .collect();
    drop(inner);

    items.sort_by(|a, b| {
      a.stage_entered_at
        .cmp(&b.stage_entered_at)
        .then_with(|| a.tag_id.cmp(&b.tag_id))
    });
    StageSnapshot { count: items.len(), items }
  }
}
