//! [`SqliteStore`] — the SQLite implementation of [`ScanStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use dashmap::DashMap;
use rusqlite::OptionalExtension as _;
use tokio::sync::Mutex;

use tally_core::{
  event::ScanEvent,
  store::{Applied, RejectionRecord, ScanStore, UpsertOutcome},
  tag::{GarmentAttributes, TagRecord},
  transition::{Decision, ReentryPolicy, RejectReason, decide},
};

use crate::{
  Error, Result,
  encode::{RawRejection, RawTagRecord, encode_attributes, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tally Scan Store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection and lock table are
/// reference-counted. The per-tag locks serialize same-tag upserts across
/// the whole read-validate-write sequence; the SQLite connection below only
/// serializes individual statements.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  locks:  Arc<DashMap<String, Arc<Mutex<()>>>>,
  policy: ReentryPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(
    path: impl AsRef<Path>,
    policy: ReentryPolicy,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self {
      conn,
      locks: Arc::new(DashMap::new()),
      policy,
    };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(policy: ReentryPolicy) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self {
      conn,
      locks: Arc::new(DashMap::new()),
      policy,
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The per-tag critical section for `tag_id`.
  fn tag_lock(&self, tag_id: &str) -> Arc<Mutex<()>> {
    self
      .locks
      .entry(tag_id.to_string())
      .or_insert_with(|| Arc::new(Mutex::new(())))
      .clone()
  }

  /// Write a record, inserting or replacing the tag's single row.
  async fn put_record(&self, record: &TagRecord) -> Result<()> {
    let tag_id     = record.tag_id.clone();
    let stage      = record.stage.as_str().to_owned();
    let entered_at = encode_dt(record.stage_entered_at);
    let seen_at    = encode_dt(record.last_seen_at);
    let attrs_json = encode_attributes(&record.attributes)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO tags (
             tag_id, stage, stage_entered_at, last_seen_at, attributes_json
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(tag_id) DO UPDATE SET
             stage            = excluded.stage,
             stage_entered_at = excluded.stage_entered_at,
             last_seen_at     = excluded.last_seen_at,
             attributes_json  = excluded.attributes_json",
          rusqlite::params![tag_id, stage, entered_at, seen_at, attrs_json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Append a refused transition to the rejection log.
  async fn record_rejection(
    &self,
    event: &ScanEvent,
    reason: RejectReason,
  ) -> Result<()> {
    let tag_id      = event.tag_id.clone();
    let requested   = event.requested_stage.as_str().to_owned();
    let observed_at = encode_dt(event.observed_at);
    let source      = event.source.clone();
    let reason_str  = reason.as_str().to_owned();
    let recorded_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rejections (
             tag_id, requested_stage, observed_at, source, reason, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            tag_id,
            requested,
            observed_at,
            source,
            reason_str,
            recorded_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_record(&self, tag_id: &str) -> Result<Option<TagRecord>> {
    let id = tag_id.to_string();

    let raw: Option<RawTagRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT tag_id, stage, stage_entered_at, last_seen_at,
                      attributes_json
               FROM tags WHERE tag_id = ?1",
              rusqlite::params![id],
              |row| {
                Ok(RawTagRecord {
                  tag_id:           row.get(0)?,
                  stage:            row.get(1)?,
                  stage_entered_at: row.get(2)?,
                  last_seen_at:     row.get(3)?,
                  attributes_json:  row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTagRecord::into_record).transpose()
  }
}

// ─── ScanStore impl ──────────────────────────────────────────────────────────

impl ScanStore for SqliteStore {
  type Error = Error;

  async fn get(&self, tag_id: &str) -> Result<Option<TagRecord>> {
    self.get_record(tag_id).await
  }

  async fn upsert(
    &self,
    event: ScanEvent,
    attributes: Option<GarmentAttributes>,
  ) -> Result<UpsertOutcome> {
    let lock = self.tag_lock(&event.tag_id);
    let _guard = lock.lock().await;

    let current = self.get_record(&event.tag_id).await?;

    match decide(current.as_ref(), &event, self.policy) {
      Decision::Transition => {
        let previous = current.as_ref().map(|r| r.stage);
        let attributes = match attributes {
          Some(attrs) => attrs,
          None => GarmentAttributes::degraded_from(
            current.as_ref().map(|r| &r.attributes),
          ),
        };
        let record = TagRecord {
          tag_id: event.tag_id.clone(),
          stage: event.requested_stage,
          stage_entered_at: event.observed_at,
          last_seen_at: event.observed_at,
          attributes,
        };
        self.put_record(&record).await?;
        Ok(UpsertOutcome {
          applied: Applied::Transitioned { previous },
          record,
        })
      }

      Decision::Refresh => {
        // `decide` yields Refresh only when a record exists.
        let Some(mut record) = current else {
          return Err(Error::MissingRecord(event.tag_id));
        };
        record.last_seen_at = event.observed_at;
        record.attributes = match attributes {
          Some(attrs) => attrs,
          None => GarmentAttributes::degraded_from(Some(&record.attributes)),
        };
        self.put_record(&record).await?;
        Ok(UpsertOutcome { applied: Applied::Refreshed, record })
      }

      Decision::Reject(reason) => {
        // Absent tags always accept, so a rejection implies a record.
        let Some(record) = current else {
          return Err(Error::MissingRecord(event.tag_id));
        };
        self.record_rejection(&event, reason).await?;
        Ok(UpsertOutcome {
          applied: Applied::Rejected(reason),
          record,
        })
      }
    }
  }

  async fn load_all(&self) -> Result<Vec<TagRecord>> {
    let raws: Vec<RawTagRecord> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT tag_id, stage, stage_entered_at, last_seen_at,
                  attributes_json
           FROM tags",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawTagRecord {
              tag_id:           row.get(0)?,
              stage:            row.get(1)?,
              stage_entered_at: row.get(2)?,
              last_seen_at:     row.get(3)?,
              attributes_json:  row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTagRecord::into_record).collect()
  }

  async fn rejections_for(&self, tag_id: &str) -> Result<Vec<RejectionRecord>> {
    let id = tag_id.to_string();

    let raws: Vec<RawRejection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT tag_id, requested_stage, observed_at, source, reason,
                  recorded_at
           FROM rejections
           WHERE tag_id = ?1
           ORDER BY rejection_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id], |row| {
            Ok(RawRejection {
              tag_id:          row.get(0)?,
              requested_stage: row.get(1)?,
              observed_at:     row.get(2)?,
              source:          row.get(3)?,
              reason:          row.get(4)?,
              recorded_at:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRejection::into_rejection).collect()
  }
}
