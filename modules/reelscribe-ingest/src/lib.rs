pub mod cdn;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod scraper;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod types;

pub use cdn::{fallback_candidates, is_direct_media_url, media_platform, select_fallback_url};
pub use config::IngestConfig;
pub use dispatch::HttpTranscriptionDispatcher;
pub use error::{is_timeout_like, ScrapeError, ScrapeErrorKind, StoreError, StoreResult};
pub use merge::merge_scrape_result;
pub use orchestrator::{
    EnrichOptions, EnrichRequest, EnrichmentOrchestrator, EnrichmentOutcome, EnrichmentReport,
    TimeoutPolicy, DOWNLOAD_URL_UNAVAILABLE,
};
pub use scraper::ApifyScraper;
pub use store::{apply_patch, MemoryRecordStore, PgVideoStore};
pub use traits::{
    Clock, MetadataScraper, RecordPatch, ScrapeOptions, SystemClock, TranscriptionDispatcher,
    VideoRecordStore,
};
pub use types::*;
