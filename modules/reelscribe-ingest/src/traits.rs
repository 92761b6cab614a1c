// Trait boundaries for the enrichment orchestrator.
//
// MetadataScraper wraps the third-party scraping service, TranscriptionDispatcher
// hands work to the transcription pipeline, VideoRecordStore owns persisted
// records. Production wires ApifyScraper, HttpTranscriptionDispatcher and
// PgVideoStore; tests use the mocks in `testing`.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::StoreResult;
use crate::types::{Platform, ScrapeResult, TranscriptionDispatchRequest, VideoAttributes};

// ---------------------------------------------------------------------------
// MetadataScraper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Best-known platform for the URL; scrapers may ignore it.
    pub platform: Platform,
    /// Budget the caller is willing to wait. The orchestrator enforces it
    /// regardless; scrapers may also pass it upstream.
    pub timeout: Duration,
}

#[async_trait]
pub trait MetadataScraper: Send + Sync {
    /// Scrape one video page. An `Err` carries only message text; a result
    /// with `success == false` means the scrape ran but found nothing usable.
    async fn scrape(&self, url: &str, opts: &ScrapeOptions) -> Result<ScrapeResult>;

    fn name(&self) -> &str {
        "unknown"
    }
}

// ---------------------------------------------------------------------------
// TranscriptionDispatcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TranscriptionDispatcher: Send + Sync {
    /// Enqueue transcription work. `Ok` means the enqueue was accepted, not
    /// that transcription has started.
    async fn enqueue(&self, task: TranscriptionDispatchRequest) -> Result<()>;
}

// ---------------------------------------------------------------------------
// VideoRecordStore
// ---------------------------------------------------------------------------

/// A merge-patch against one record. `written_at` orders concurrent writes
/// per field; older values never overwrite newer ones.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPatch {
    pub fields: Map<String, Value>,
    pub written_at: DateTime<Utc>,
}

impl RecordPatch {
    pub fn new(fields: Map<String, Value>, written_at: DateTime<Utc>) -> Self {
        Self { fields, written_at }
    }

    /// Patch that merges `metadata` keys only.
    pub fn metadata(metadata: Map<String, Value>, written_at: DateTime<Utc>) -> Self {
        let mut fields = Map::new();
        fields.insert("metadata".into(), Value::Object(metadata));
        Self { fields, written_at }
    }
}

#[async_trait]
pub trait VideoRecordStore: Send + Sync {
    async fn get(&self, id: &str) -> StoreResult<Option<VideoAttributes>>;

    /// Merge `patch` into the record. Untouched fields are left as they are.
    async fn patch(&self, id: &str, patch: RecordPatch) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
