//! The Subscription Hub and Notifier — push fan-out to dashboard clients.
//!
//! Each subscriber owns a bounded channel; publishing uses `try_send`, so the
//! ingest path never waits on delivery. A subscriber whose channel is full or
//! closed is torn down on the spot — its blast radius is itself.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tally_core::{stage::Stage, tag::GarmentAttributes};
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

/// Capacity of each subscriber's delivery channel. A client that lets this
/// many notifications pile up unread is treated as dead.
const SUBSCRIBER_BUFFER: usize = 64;

// ─── Notification ────────────────────────────────────────────────────────────

/// A diff pushed to subscribers after an accepted scan.
///
/// The serialized form is the wire shape the dashboard consumes, e.g.
/// `{"type":"transition","tag_id":...,"previous_stage":...,"new_stage":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
  /// An accepted change of stage. First-ever scans admit a tag without a
  /// stage change and therefore do not produce one of these.
  Transition {
    tag_id:         String,
    previous_stage: Stage,
    new_stage:      Stage,
    attributes:     GarmentAttributes,
  },
  /// A same-stage duplicate that refreshed attributes only.
  AttributesRefreshed {
    tag_id:     String,
    stage:      Stage,
    attributes: GarmentAttributes,
  },
}

impl Notification {
  /// Whether a subscription with `filter` should receive this notification.
  /// A transition matches on either endpoint of the move.
  pub fn matches(&self, filter: Option<Stage>) -> bool {
    let Some(want) = filter else {
      return true;
    };
    match self {
      Notification::Transition { previous_stage, new_stage, .. } => {
        *previous_stage == want || *new_stage == want
      }
      Notification::AttributesRefreshed { stage, .. } => *stage == want,
    }
  }
}

// ─── Hub ─────────────────────────────────────────────────────────────────────

struct Subscription {
  filter: Option<Stage>,
  tx:     mpsc::Sender<Notification>,
}

/// Registry of live push subscriptions.
#[derive(Default)]
pub struct SubscriptionHub {
  subscriptions: DashMap<Uuid, Subscription>,
}

impl SubscriptionHub {
  pub fn new() -> Self { Self::default() }

  /// Register a subscriber; `filter` of `None` means all stages.
  ///
  /// The receiver sees only notifications published after this call — a
  /// client reconnecting after a gap resyncs from the current snapshot, not
  /// from missed history.
  pub fn subscribe(
    &self,
    filter: Option<Stage>,
  ) -> (Uuid, mpsc::Receiver<Notification>) {
    let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
    let id = Uuid::new_v4();
    self.subscriptions.insert(id, Subscription { filter, tx });
    (id, rx)
  }

  /// Remove a subscription. Idempotent; safe to call from both the
  /// disconnect path and the publish path.
  pub fn unsubscribe(&self, id: Uuid) {
    self.subscriptions.remove(&id);
  }

  pub fn subscriber_count(&self) -> usize { self.subscriptions.len() }

  /// Deliver `notification` to every matching subscription, best-effort.
  /// Never blocks: full or closed channels get their subscription removed
  /// instead of backpressuring the caller.
  pub fn publish(&self, notification: &Notification) {
    let mut dead = Vec::new();
    for entry in self.subscriptions.iter() {
      if !notification.matches(entry.filter) {
        continue;
      }
      match entry.tx.try_send(notification.clone()) {
        Ok(()) => {}
        Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
          dead.push(*entry.key());
        }
      }
    }
    for id in dead {
      self.subscriptions.remove(&id);
      tracing::debug!(subscription = %id, "dropped unresponsive subscriber");
    }
  }
}
