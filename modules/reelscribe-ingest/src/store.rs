// Video record persistence: merge-patch with per-field last-write-wins.
//
// Both stores keep the record as a JSON document plus a `field_clock` map from
// leaf path ("title", "metadata.transcriptionStatus") to the write time of its
// current value. A patch value older than the clock entry for its path is
// dropped, so a slow success cannot clobber a later failure or vice versa.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{RecordPatch, VideoRecordStore};
use crate::types::{timestamp, VideoAttributes};

/// Apply `patch` to `doc`, consulting and updating `clock`.
///
/// Object values merge one level deep; anything else replaces the stored
/// value. Returns the number of leaf paths written.
pub fn apply_patch(
    doc: &mut Map<String, Value>,
    clock: &mut Map<String, Value>,
    patch: &RecordPatch,
) -> usize {
    let mut written = 0;

    for (key, value) in &patch.fields {
        match value {
            Value::Object(entries) => {
                let slot = doc
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !slot.is_object() {
                    *slot = Value::Object(Map::new());
                }
                let Some(target) = slot.as_object_mut() else {
                    continue;
                };
                for (inner_key, inner_value) in entries {
                    let path = format!("{key}.{inner_key}");
                    if is_stale(clock, &path, patch.written_at) {
                        debug!(path = path.as_str(), "Skipping stale patch field");
                        continue;
                    }
                    target.insert(inner_key.clone(), inner_value.clone());
                    clock.insert(path, timestamp(patch.written_at));
                    written += 1;
                }
            }
            _ => {
                if is_stale(clock, key, patch.written_at) {
                    debug!(path = key.as_str(), "Skipping stale patch field");
                    continue;
                }
                doc.insert(key.clone(), value.clone());
                clock.insert(key.clone(), timestamp(patch.written_at));
                written += 1;
            }
        }
    }

    written
}

fn is_stale(clock: &Map<String, Value>, path: &str, written_at: DateTime<Utc>) -> bool {
    clock
        .get(path)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .is_some_and(|stored| stored.with_timezone(&Utc) > written_at)
}

fn to_document(record: &VideoAttributes) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(record)? {
        Value::Object(doc) => Ok(doc),
        other => Err(StoreError::InvalidPatch {
            id: record.id.clone(),
            found: other.to_string(),
        }),
    }
}

fn from_document(doc: Map<String, Value>) -> StoreResult<VideoAttributes> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct StoredRecord {
    doc: Map<String, Value>,
    clock: Map<String, Value>,
}

/// In-process store. Used by tests and by local runs without a database.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, StoredRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a record wholesale, resetting its field clock.
    pub fn insert(&self, record: &VideoAttributes) -> StoreResult<()> {
        let doc = to_document(record)?;
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.id.clone(), StoredRecord { doc, clock: Map::new() });
        Ok(())
    }

    /// Raw stored document, for assertions on exactly what was persisted.
    pub fn document(&self, id: &str) -> Option<Map<String, Value>> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|r| r.doc.clone())
    }
}

#[async_trait]
impl VideoRecordStore for MemoryRecordStore {
    async fn get(&self, id: &str) -> StoreResult<Option<VideoAttributes>> {
        match self.document(id) {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn patch(&self, id: &str, patch: RecordPatch) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let StoredRecord { doc, clock } = record;
        apply_patch(doc, clock, &patch);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PgVideoStore
// ---------------------------------------------------------------------------

/// Postgres-backed store. One row per video; the record lives in `doc`.
pub struct PgVideoStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    doc: Value,
    field_clock: Value,
}

impl PgVideoStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(())
    }

    /// Create the row for a new video. Existing rows are left untouched.
    pub async fn insert(&self, record: &VideoAttributes) -> StoreResult<()> {
        let doc = Value::Object(to_document(record)?);
        sqlx::query(
            r#"
            INSERT INTO videos (id, doc, field_clock, updated_at)
            VALUES ($1, $2, '{}'::jsonb, now())
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoRecordStore for PgVideoStore {
    async fn get(&self, id: &str) -> StoreResult<Option<VideoAttributes>> {
        let row = sqlx::query_as::<_, VideoRow>("SELECT doc, field_clock FROM videos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(VideoRow { doc: Value::Object(doc), .. }) => Ok(Some(from_document(doc)?)),
            Some(VideoRow { doc, .. }) => Err(StoreError::InvalidPatch {
                id: id.to_string(),
                found: doc.to_string(),
            }),
            None => Ok(None),
        }
    }

    async fn patch(&self, id: &str, patch: RecordPatch) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, VideoRow>(
            "SELECT doc, field_clock FROM videos WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut doc = match row.doc {
            Value::Object(doc) => doc,
            other => {
                return Err(StoreError::InvalidPatch {
                    id: id.to_string(),
                    found: other.to_string(),
                })
            }
        };
        let mut clock = match row.field_clock {
            Value::Object(clock) => clock,
            _ => Map::new(),
        };

        let written = apply_patch(&mut doc, &mut clock, &patch);
        if written == 0 {
            tx.rollback().await?;
            return Ok(());
        }

        sqlx::query(
            r#"
            UPDATE videos
            SET doc = $2, field_clock = $3, updated_at = GREATEST(updated_at, $4)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Value::Object(doc))
        .bind(Value::Object(clock))
        .bind(patch.written_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
