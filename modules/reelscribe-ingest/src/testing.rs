// Test mocks for the enrichment orchestrator.
//
// One mock per trait boundary:
// - MockScraper (MetadataScraper) — scripted response, counts calls
// - MockDispatcher (TranscriptionDispatcher) — records enqueued tasks, can be told to fail
// - FixedClock (Clock) — settable instant
// MemoryRecordStore in `store` covers VideoRecordStore.

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::traits::{Clock, MetadataScraper, ScrapeOptions, TranscriptionDispatcher};
use crate::types::{ScrapeResult, TranscriptionDispatchRequest};

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Scripted {
    Result(ScrapeResult),
    Error(String),
    Hang(Duration),
}

/// Returns the same scripted response for every URL.
pub struct MockScraper {
    response: Scripted,
    calls: Mutex<Vec<String>>,
}

impl MockScraper {
    pub fn succeeding(result: ScrapeResult) -> Self {
        Self::with(Scripted::Result(result))
    }

    /// Scrape runs but reports `success: false`.
    pub fn empty() -> Self {
        Self::with(Scripted::Result(ScrapeResult::failed()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Scripted::Error(message.to_string()))
    }

    /// Sleeps for `delay` before answering, to exercise deadlines.
    pub fn hanging(delay: Duration) -> Self {
        Self::with(Scripted::Hang(delay))
    }

    fn with(response: Scripted) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataScraper for MockScraper {
    async fn scrape(&self, url: &str, _opts: &ScrapeOptions) -> Result<ScrapeResult> {
        self.calls.lock().unwrap().push(url.to_string());
        match &self.response {
            Scripted::Result(result) => Ok(result.clone()),
            Scripted::Error(message) => bail!("{message}"),
            Scripted::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(ScrapeResult::failed())
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockDispatcher
// ---------------------------------------------------------------------------

/// Records `enqueue()` calls for test assertions.
pub struct MockDispatcher {
    calls: Mutex<Vec<TranscriptionDispatchRequest>>,
    fail_with: Option<String>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// Every enqueue is recorded, then rejected with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<TranscriptionDispatchRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptionDispatcher for MockDispatcher {
    async fn enqueue(&self, task: TranscriptionDispatchRequest) -> Result<()> {
        self.calls.lock().unwrap().push(task);
        match &self.fail_with {
            Some(message) => bail!("{message}"),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// FixedClock
// ---------------------------------------------------------------------------

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
