//! Orchestrator behavior across scrape outcomes.
//! Runs entirely on in-crate mocks: no network, no database.

use std::sync::Arc;
use std::time::Duration;

use reelscribe_ingest::testing::{FixedClock, MockDispatcher, MockScraper};
use reelscribe_ingest::Clock;
use reelscribe_ingest::{
    CallerHints, EnrichOptions, EnrichRequest, EnrichmentOrchestrator, EnrichmentOutcome,
    MemoryRecordStore, Platform, ScrapeErrorKind, ScrapeResult, TimeoutPolicy, TranscriptionState,
    TranscriptionStatus, VideoAttributes, VideoRecordStore, DOWNLOAD_URL_UNAVAILABLE,
};

const VIDEO_ID: &str = "vid-1";
const TIKTOK_PAGE: &str = "https://www.tiktok.com/@mnfoodshelf/video/7301";
const TIKTOK_CDN: &str = "https://v16-webapp.tiktokcdn.com/clip.mp4";
const INSTAGRAM_CDN: &str = "https://instagram.fxyz1-1.fna.cdninstagram.com/v/clip.mp4";

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    scraper: Arc<MockScraper>,
    dispatcher: Arc<MockDispatcher>,
    store: Arc<MemoryRecordStore>,
    orchestrator: EnrichmentOrchestrator,
}

fn prior() -> VideoAttributes {
    let mut record = VideoAttributes::new(VIDEO_ID, TIKTOK_PAGE, Platform::TikTok);
    record.insights.saves = 2;
    record.metadata.insert("collectionId".into(), "col-9".into());
    record
}

fn harness_with(scraper: MockScraper, dispatcher: MockDispatcher, options: EnrichOptions) -> Harness {
    let scraper = Arc::new(scraper);
    let dispatcher = Arc::new(dispatcher);
    let store = Arc::new(MemoryRecordStore::new());
    store.insert(&prior()).unwrap();

    let orchestrator = EnrichmentOrchestrator::new(
        scraper.clone(),
        dispatcher.clone(),
        store.clone(),
        Arc::new(FixedClock::default()),
        options,
    );

    Harness {
        scraper,
        dispatcher,
        store,
        orchestrator,
    }
}

fn harness(scraper: MockScraper) -> Harness {
    harness_with(scraper, MockDispatcher::new(), EnrichOptions::default())
}

fn request() -> EnrichRequest {
    EnrichRequest::new(VIDEO_ID, TIKTOK_PAGE, Platform::TikTok, prior())
}

fn scraped() -> ScrapeResult {
    ScrapeResult {
        success: true,
        title: Some("Food shelf hours".into()),
        author: Some("mnfoodshelf".into()),
        download_url: Some(TIKTOK_CDN.into()),
        video_url: Some(TIKTOK_PAGE.into()),
        platform: Some(Platform::TikTok),
        views: Some(1200.0),
        likes: Some(80.0),
        ..Default::default()
    }
}

async fn stored(h: &Harness) -> VideoAttributes {
    h.store.get(VIDEO_ID).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Successful scrape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_scrape_merges_and_dispatches_once() {
    let h = harness(MockScraper::succeeding(scraped()));

    let report = h.orchestrator.enrich(request()).await;

    assert_eq!(report.outcome, EnrichmentOutcome::Processing);
    assert_eq!(report.attributes.transcription_status(), TranscriptionStatus::Processing);
    assert!(report.dispatched());

    let calls = h.dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].video_id, VIDEO_ID);
    assert_eq!(calls[0].source_url, TIKTOK_CDN);
    assert_eq!(calls[0].platform, Platform::TikTok);

    let record = stored(&h).await;
    assert_eq!(record.transcription_status(), TranscriptionStatus::Processing);
    assert_eq!(record.title.as_deref(), Some("Food shelf hours"));
    assert_eq!(record.insights.views, 1200);
    assert_eq!(record.insights.saves, 2);
    assert_eq!(record.metadata["collectionId"], "col-9");
    assert_eq!(record.metadata["downloadUrl"], TIKTOK_CDN);
    assert_eq!(record.content_metadata.description.as_deref(), Some("Food shelf hours"));
    assert!(matches!(
        record.transcription_state(),
        TranscriptionState::Processing { .. }
    ));
}

#[tokio::test]
async fn successful_scrape_without_media_urls_dispatches_source_url() {
    let result = ScrapeResult {
        success: true,
        title: Some("No media".into()),
        ..Default::default()
    };
    let h = harness(MockScraper::succeeding(result));

    let report = h.orchestrator.enrich(request()).await;

    assert_eq!(report.outcome, EnrichmentOutcome::Processing);
    let calls = h.dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source_url, TIKTOK_PAGE);
    assert_eq!(calls[0].platform, Platform::TikTok);
}

#[tokio::test]
async fn unknown_platform_is_detected_from_source_url() {
    let mut result = scraped();
    result.platform = None;
    let h = harness(MockScraper::succeeding(result));

    let req = EnrichRequest::new(VIDEO_ID, TIKTOK_PAGE, Platform::Other, prior());
    h.orchestrator.enrich(req).await;

    assert_eq!(h.dispatcher.calls()[0].platform, Platform::TikTok);
}

#[tokio::test]
async fn record_platform_is_used_when_request_and_url_are_unknown() {
    let mut result = scraped();
    result.platform = None;
    let h = harness(MockScraper::succeeding(result));

    let req = EnrichRequest::new(VIDEO_ID, "https://vm.example.com/abc", Platform::Other, prior());
    h.orchestrator.enrich(req).await;

    assert_eq!(h.dispatcher.calls()[0].platform, Platform::TikTok);
}

#[tokio::test]
async fn fallback_prefers_record_platform_over_cdn_host() {
    let h = harness(MockScraper::empty());

    let req = EnrichRequest::new(VIDEO_ID, "https://vm.example.com/abc", Platform::Other, prior())
        .with_hints(CallerHints {
            download_url: Some(INSTAGRAM_CDN.into()),
            ..Default::default()
        });
    h.orchestrator.enrich(req).await;

    assert_eq!(h.dispatcher.calls()[0].platform, Platform::TikTok);
}

#[tokio::test]
async fn original_url_comes_from_request_when_record_has_none() {
    let h = harness(MockScraper::succeeding(scraped()));

    let bare = VideoAttributes {
        id: VIDEO_ID.into(),
        ..Default::default()
    };
    let req = EnrichRequest::new(VIDEO_ID, TIKTOK_PAGE, Platform::TikTok, bare);
    let report = h.orchestrator.enrich(req).await;

    assert_eq!(report.attributes.metadata["originalUrl"], TIKTOK_PAGE);
    assert_eq!(stored(&h).await.metadata["originalUrl"], TIKTOK_PAGE);
}

#[tokio::test]
async fn success_after_failed_attempt_clears_stale_error() {
    let h = harness(MockScraper::succeeding(scraped()));

    let mut prior = prior();
    prior.metadata.extend(
        TranscriptionState::Failed {
            reason: DOWNLOAD_URL_UNAVAILABLE.into(),
            failed_at: FixedClock::default().now() - chrono::Duration::minutes(5),
        }
        .to_metadata_fields(),
    );
    h.store.insert(&prior).unwrap();

    let req = EnrichRequest::new(VIDEO_ID, TIKTOK_PAGE, Platform::TikTok, prior);
    let report = h.orchestrator.enrich(req).await;

    assert_eq!(report.attributes.transcription_error(), None);
    let record = stored(&h).await;
    assert_eq!(record.transcription_status(), TranscriptionStatus::Processing);
    assert_eq!(record.transcription_error(), None);
    assert!(record.metadata["transcriptionFailedAt"].is_null());
}

#[tokio::test]
async fn report_json_names_outcome_kind_once() {
    let h = harness(MockScraper::succeeding(scraped()));

    let report = h.orchestrator.enrich(request()).await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["outcome"]["kind"], "processing");
    assert!(json["outcome"].get("outcome").is_none());
}

#[tokio::test]
async fn dispatch_failure_is_reported_but_status_stays_processing() {
    let h = harness_with(
        MockScraper::succeeding(scraped()),
        MockDispatcher::failing("ingress unavailable (503)"),
        EnrichOptions::default(),
    );

    let report = h.orchestrator.enrich(request()).await;

    assert_eq!(report.outcome, EnrichmentOutcome::Processing);
    assert!(!report.dispatched());
    assert!(report
        .dispatch_error
        .as_deref()
        .unwrap()
        .contains("ingress unavailable"));
    assert_eq!(stored(&h).await.transcription_status(), TranscriptionStatus::Processing);
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn timed_out_scrape_records_timeout_without_dispatch() {
    let h = harness(MockScraper::failing("Request timed out after 30s"));

    // A qualifying CDN URL is available, but the terminal policy never looks.
    let req = request().with_hints(CallerHints {
        download_url: Some(TIKTOK_CDN.into()),
        ..Default::default()
    });
    let report = h.orchestrator.enrich(req).await;

    assert!(matches!(report.outcome, EnrichmentOutcome::Timeout { .. }));
    assert_eq!(report.attributes.transcription_status(), TranscriptionStatus::Timeout);
    assert_eq!(
        report.attributes.transcription_error(),
        Some("Request timed out after 30s")
    );
    assert_eq!(report.scrape_error.as_ref().unwrap().kind, ScrapeErrorKind::Timeout);

    // Preserved behavior: nothing is queued for a timed-out scrape.
    assert!(h.dispatcher.calls().is_empty());
    assert!(report.dispatch_request.is_none());

    let record = stored(&h).await;
    assert_eq!(record.transcription_status(), TranscriptionStatus::Timeout);
    assert!(record.metadata_str("transcriptionFailedAt").is_some());
    assert_eq!(record.metadata["collectionId"], "col-9");
}

#[tokio::test]
async fn gateway_timeout_code_is_treated_as_timeout() {
    let h = harness(MockScraper::failing("API error (status 524): upstream"));
    let report = h.orchestrator.enrich(request()).await;
    assert!(matches!(report.outcome, EnrichmentOutcome::Timeout { .. }));
}

#[tokio::test]
async fn fallthrough_policy_lets_timeouts_use_the_fallback() {
    let options = EnrichOptions {
        timeout_policy: TimeoutPolicy::FallThrough,
        ..Default::default()
    };
    let h = harness_with(
        MockScraper::failing("upstream 524 Gateway Timeout"),
        MockDispatcher::new(),
        options,
    );

    let req = request().with_hints(CallerHints {
        video_url: Some(TIKTOK_CDN.into()),
        ..Default::default()
    });
    let report = h.orchestrator.enrich(req).await;

    assert_eq!(
        report.outcome,
        EnrichmentOutcome::FallbackDispatched {
            url: TIKTOK_CDN.into()
        }
    );
    assert_eq!(h.dispatcher.calls().len(), 1);
    assert_eq!(report.scrape_error.unwrap().kind, ScrapeErrorKind::Timeout);
}

#[tokio::test]
async fn hung_scraper_is_cut_off_by_scrape_timeout() {
    let options = EnrichOptions {
        scrape_timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let h = harness_with(
        MockScraper::hanging(Duration::from_secs(5)),
        MockDispatcher::new(),
        options,
    );

    let report = h.orchestrator.enrich(request()).await;

    assert!(matches!(report.outcome, EnrichmentOutcome::Timeout { .. }));
    assert!(report
        .attributes
        .transcription_error()
        .unwrap()
        .contains("timed out"));
    assert!(h.dispatcher.calls().is_empty());
}

#[tokio::test]
async fn caller_deadline_tightens_scrape_budget() {
    let h = harness(MockScraper::hanging(Duration::from_secs(5)));

    let deadline = tokio::time::Instant::now() + Duration::from_millis(30);
    let started = std::time::Instant::now();
    let report = h.orchestrator.enrich(request().with_deadline(deadline)).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(report.outcome, EnrichmentOutcome::Timeout { .. }));
}

// ---------------------------------------------------------------------------
// Other failures and the CDN fallback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_timeout_error_without_cdn_url_records_failure() {
    let h = harness(MockScraper::failing("network unreachable"));

    let req = request().with_hints(CallerHints {
        original_url: Some(TIKTOK_PAGE.into()),
        ..Default::default()
    });
    let report = h.orchestrator.enrich(req).await;

    assert_eq!(
        report.outcome,
        EnrichmentOutcome::Failed {
            reason: DOWNLOAD_URL_UNAVAILABLE.into()
        }
    );
    assert_eq!(report.attributes.transcription_status(), TranscriptionStatus::Failed);
    assert_eq!(report.attributes.transcription_error(), Some(DOWNLOAD_URL_UNAVAILABLE));
    assert_eq!(report.scrape_error.unwrap().kind, ScrapeErrorKind::Unknown);
    assert!(h.dispatcher.calls().is_empty());

    let record = stored(&h).await;
    assert_eq!(record.transcription_error(), Some(DOWNLOAD_URL_UNAVAILABLE));
    assert!(matches!(record.transcription_state(), TranscriptionState::Failed { .. }));
}

#[tokio::test]
async fn non_timeout_error_with_cdn_hint_dispatches_fallback() {
    let h = harness(MockScraper::failing("API error (status 404): not found"));

    let req = request().with_hints(CallerHints {
        download_url: Some("https://example.com/clip.mp4".into()),
        video_url: Some(TIKTOK_CDN.into()),
        original_url: Some(TIKTOK_PAGE.into()),
    });
    let report = h.orchestrator.enrich(req).await;

    assert_eq!(
        report.outcome,
        EnrichmentOutcome::FallbackDispatched {
            url: TIKTOK_CDN.into()
        }
    );
    assert_eq!(report.scrape_error.unwrap().kind, ScrapeErrorKind::NotFound);

    let calls = h.dispatcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].source_url, TIKTOK_CDN);
    assert_eq!(stored(&h).await.transcription_status(), TranscriptionStatus::Processing);
}

#[tokio::test]
async fn unsuccessful_scrape_prefers_record_urls_over_caller_hints() {
    let h = harness(MockScraper::empty());

    let mut prior = prior();
    prior.url = Some(INSTAGRAM_CDN.into());
    let req = EnrichRequest::new(VIDEO_ID, TIKTOK_PAGE, Platform::Other, prior).with_hints(
        CallerHints {
            download_url: Some(TIKTOK_CDN.into()),
            ..Default::default()
        },
    );
    let report = h.orchestrator.enrich(req).await;

    assert_eq!(
        report.outcome,
        EnrichmentOutcome::FallbackDispatched {
            url: INSTAGRAM_CDN.into()
        }
    );
    assert!(report.scrape_error.is_none());
    // The record already knows it is TikTok, so that wins over the CDN host.
    assert_eq!(h.dispatcher.calls()[0].platform, Platform::TikTok);
}

#[tokio::test]
async fn fallback_platform_comes_from_cdn_host_when_unknown() {
    let h = harness(MockScraper::empty());

    let mut prior = prior();
    prior.platform = Platform::Other;
    let req = EnrichRequest::new(VIDEO_ID, "https://example.com/watch/1", Platform::Other, prior)
        .with_hints(CallerHints {
            download_url: Some(INSTAGRAM_CDN.into()),
            ..Default::default()
        });
    h.orchestrator.enrich(req).await;

    assert_eq!(h.dispatcher.calls()[0].platform, Platform::Instagram);
}

#[tokio::test]
async fn failed_fallback_enqueue_does_not_claim_processing() {
    let h = harness_with(
        MockScraper::failing("connection reset"),
        MockDispatcher::failing("ingress unavailable"),
        EnrichOptions::default(),
    );

    let req = request().with_hints(CallerHints {
        download_url: Some(TIKTOK_CDN.into()),
        ..Default::default()
    });
    let report = h.orchestrator.enrich(req).await;

    assert!(matches!(report.outcome, EnrichmentOutcome::FallbackDispatched { .. }));
    assert!(report.dispatch_error.is_some());
    assert_eq!(report.attributes.transcription_status(), TranscriptionStatus::Unset);
    assert_eq!(stored(&h).await.transcription_status(), TranscriptionStatus::Unset);
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[tokio::test]
async fn enrich_and_dispatch_never_errors_on_scrape_failure() {
    let h = harness(MockScraper::failing("network unreachable"));
    let attributes = h.orchestrator.enrich_and_dispatch(request()).await.unwrap();
    assert_eq!(attributes.transcription_status(), TranscriptionStatus::Failed);
}

#[tokio::test]
async fn missing_store_record_does_not_abort_enrichment() {
    let h = harness(MockScraper::succeeding(scraped()));

    let req = EnrichRequest::new("not-in-store", TIKTOK_PAGE, Platform::TikTok, prior());
    let attributes = h.orchestrator.enrich_and_dispatch(req).await.unwrap();

    assert_eq!(attributes.transcription_status(), TranscriptionStatus::Processing);
    assert_eq!(h.dispatcher.calls().len(), 1);
}

#[tokio::test]
async fn repeated_invocations_reach_the_same_classification() {
    let h = harness(MockScraper::failing("network unreachable"));

    let first = h.orchestrator.enrich(request()).await;
    let second = h.orchestrator.enrich(request()).await;

    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.attributes, second.attributes);
    assert_eq!(h.scraper.calls().len(), 2);
    assert_eq!(h.scraper.calls()[0], TIKTOK_PAGE);
}
