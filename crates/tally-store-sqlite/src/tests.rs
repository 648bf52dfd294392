//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeZone, Utc};
use tally_core::{
  event::ScanEvent,
  stage::Stage,
  store::{Applied, ScanStore},
  tag::GarmentAttributes,
  transition::{ReentryPolicy, RejectReason},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory(ReentryPolicy::Reject)
    .await
    .expect("in-memory store")
}

fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

fn scan(tag: &str, stage: Stage, secs: i64) -> ScanEvent {
  ScanEvent::new(tag, stage, at(secs)).with_source("reader-1")
}

fn attrs(wo: &str) -> GarmentAttributes {
  GarmentAttributes {
    wo: Some(wo.into()),
    style: Some("S-100".into()),
    buyer: Some("ACME".into()),
    ..GarmentAttributes::default()
  }
}

// ─── First scans ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_scan_creates_record_at_declared_stage() {
  let s = store().await;

  let out = s
    .upsert(scan("A1", Stage::InProgress, 10), Some(attrs("WO-1")))
    .await
    .unwrap();

  assert_eq!(out.applied, Applied::Transitioned { previous: None });
  assert_eq!(out.record.stage, Stage::InProgress);
  assert_eq!(out.record.stage_entered_at, at(10));

  let fetched = s.get("A1").await.unwrap().unwrap();
  assert_eq!(fetched.stage, Stage::InProgress);
  assert_eq!(fetched.attributes.wo.as_deref(), Some("WO-1"));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get("nope").await.unwrap().is_none());
}

// ─── Forward transitions ─────────────────────────────────────────────────────

#[tokio::test]
async fn full_walk_waiting_progress_done() {
  let s = store().await;

  s.upsert(scan("A1", Stage::Waiting, 10), Some(attrs("WO-1")))
    .await
    .unwrap();

  let out = s
    .upsert(scan("A1", Stage::InProgress, 20), Some(attrs("WO-1")))
    .await
    .unwrap();
  assert_eq!(
    out.applied,
    Applied::Transitioned { previous: Some(Stage::Waiting) }
  );

  let out = s
    .upsert(scan("A1", Stage::Done, 30), Some(attrs("WO-1")))
    .await
    .unwrap();
  assert_eq!(
    out.applied,
    Applied::Transitioned { previous: Some(Stage::InProgress) }
  );

  let record = s.get("A1").await.unwrap().unwrap();
  assert_eq!(record.stage, Stage::Done);
  assert_eq!(record.stage_entered_at, at(30));
}

#[tokio::test]
async fn fast_path_skip_waiting_to_done() {
  let s = store().await;

  s.upsert(scan("A1", Stage::Waiting, 10), Some(attrs("WO-1")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A1", Stage::Done, 20), Some(attrs("WO-1")))
    .await
    .unwrap();

  assert_eq!(
    out.applied,
    Applied::Transitioned { previous: Some(Stage::Waiting) }
  );
}

// ─── Rejections ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn regression_rejected_and_recorded() {
  let s = store().await;

  s.upsert(scan("A1", Stage::InProgress, 10), Some(attrs("WO-1")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A1", Stage::Waiting, 20), Some(attrs("WO-1")))
    .await
    .unwrap();

  assert_eq!(out.applied, Applied::Rejected(RejectReason::Regression));
  // The record is untouched.
  assert_eq!(out.record.stage, Stage::InProgress);
  assert_eq!(out.record.stage_entered_at, at(10));

  let rejections = s.rejections_for("A1").await.unwrap();
  assert_eq!(rejections.len(), 1);
  assert_eq!(rejections[0].reason, RejectReason::Regression);
  assert_eq!(rejections[0].requested_stage, Stage::Waiting);
  assert_eq!(rejections[0].source.as_deref(), Some("reader-1"));
}

#[tokio::test]
async fn done_is_terminal_by_default() {
  let s = store().await;

  s.upsert(scan("A2", Stage::Done, 10), Some(attrs("WO-2")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A2", Stage::Waiting, 20), Some(attrs("WO-2")))
    .await
    .unwrap();

  assert_eq!(out.applied, Applied::Rejected(RejectReason::Terminal));
  assert_eq!(s.get("A2").await.unwrap().unwrap().stage, Stage::Done);
}

#[tokio::test]
async fn done_reentry_with_policy_allow() {
  let s = SqliteStore::open_in_memory(ReentryPolicy::Allow).await.unwrap();

  s.upsert(scan("A2", Stage::Done, 10), Some(attrs("WO-2")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A2", Stage::Waiting, 20), Some(attrs("WO-2")))
    .await
    .unwrap();

  assert_eq!(
    out.applied,
    Applied::Transitioned { previous: Some(Stage::Done) }
  );
  assert_eq!(s.get("A2").await.unwrap().unwrap().stage, Stage::Waiting);
}

#[tokio::test]
async fn stale_observation_rejected() {
  let s = store().await;

  s.upsert(scan("A1", Stage::InProgress, 100), Some(attrs("WO-1")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A1", Stage::Done, 50), Some(attrs("WO-1")))
    .await
    .unwrap();

  assert_eq!(out.applied, Applied::Rejected(RejectReason::Stale));
  assert_eq!(s.get("A1").await.unwrap().unwrap().stage, Stage::InProgress);
}

// ─── Duplicates ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_refreshes_attributes_not_stage() {
  let s = store().await;

  s.upsert(scan("A1", Stage::InProgress, 10), Some(attrs("WO-1")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A1", Stage::InProgress, 20), Some(attrs("WO-9")))
    .await
    .unwrap();

  assert_eq!(out.applied, Applied::Refreshed);
  let record = s.get("A1").await.unwrap().unwrap();
  assert_eq!(record.stage, Stage::InProgress);
  // Stage entry time survives a duplicate; last_seen_at advances.
  assert_eq!(record.stage_entered_at, at(10));
  assert_eq!(record.last_seen_at, at(20));
  assert_eq!(record.attributes.wo.as_deref(), Some("WO-9"));
}

#[tokio::test]
async fn replaying_the_same_event_is_idempotent() {
  let s = store().await;
  let event = scan("A1", Stage::InProgress, 10);

  let first = s.upsert(event.clone(), Some(attrs("WO-1"))).await.unwrap();
  assert_eq!(first.applied, Applied::Transitioned { previous: None });

  let second = s.upsert(event, Some(attrs("WO-1"))).await.unwrap();
  assert_eq!(second.applied, Applied::Refreshed);

  // Store state is identical after both applications.
  assert_eq!(
    serde_json::to_value(&first.record).unwrap(),
    serde_json::to_value(&second.record).unwrap(),
  );
}

// ─── Degraded attributes ─────────────────────────────────────────────────────

#[tokio::test]
async fn failed_lookup_keeps_last_known_and_flags_degraded() {
  let s = store().await;

  s.upsert(scan("A1", Stage::Waiting, 10), Some(attrs("WO-1")))
    .await
    .unwrap();
  let out = s
    .upsert(scan("A1", Stage::InProgress, 20), None)
    .await
    .unwrap();

  assert_eq!(
    out.applied,
    Applied::Transitioned { previous: Some(Stage::Waiting) }
  );
  assert!(out.record.attributes.degraded);
  assert_eq!(out.record.attributes.wo.as_deref(), Some("WO-1"));
}

#[tokio::test]
async fn failed_lookup_on_first_scan_yields_empty_degraded_attributes() {
  let s = store().await;

  let out = s.upsert(scan("A1", Stage::Waiting, 10), None).await.unwrap();

  assert!(out.record.attributes.degraded);
  assert!(out.record.attributes.wo.is_none());
}

// ─── Bulk reads ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn load_all_returns_every_record() {
  let s = store().await;

  for i in 0..5 {
    s.upsert(scan(&format!("T{i}"), Stage::Waiting, 10), Some(attrs("WO")))
      .await
      .unwrap();
  }

  let all = s.load_all().await.unwrap();
  assert_eq!(all.len(), 5);
  assert!(all.iter().all(|r| r.stage == Stage::Waiting));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_distinct_tags_all_land() {
  let s = store().await;

  let mut handles = Vec::new();
  for i in 0..100 {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      s.upsert(scan(&format!("T{i}"), Stage::InProgress, 10), None)
        .await
        .unwrap();
    }));
  }
  for h in handles {
    h.await.unwrap();
  }

  let all = s.load_all().await.unwrap();
  assert_eq!(all.len(), 100);
  assert!(all.iter().all(|r| r.stage == Stage::InProgress));
}

#[tokio::test]
async fn concurrent_same_tag_scans_serialize() {
  let s = store().await;

  // Same tag, same timestamp, racing WAITING and IN_PROGRESS scans. Either
  // serialization order ends at IN_PROGRESS: WAITING-first advances on the
  // tie, IN_PROGRESS-first rejects the late WAITING as a regression.
  let a = {
    let s = s.clone();
    tokio::spawn(
      async move { s.upsert(scan("T1", Stage::Waiting, 10), None).await },
    )
  };
  let b = {
    let s = s.clone();
    tokio::spawn(async move {
      s.upsert(scan("T1", Stage::InProgress, 10), None).await
    })
  };
  a.await.unwrap().unwrap();
  b.await.unwrap().unwrap();

  let all = s.load_all().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].stage, Stage::InProgress);
}
