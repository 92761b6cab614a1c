// Enrichment-and-dispatch orchestrator.
//
// One scrape attempt per invocation, then exactly one of:
//   scrape ok        → merge, persist `processing`, dispatch
//   scrape timed out → persist `timeout` (Terminal policy)
//   anything else    → CDN fallback: dispatch a direct media URL, or persist `failed`
// Nothing is raised to the caller; outcomes live in the record and the report.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::cdn::{fallback_candidates, media_platform, select_fallback_url};
use crate::error::ScrapeError;
use crate::merge::merge_scrape_result;
use crate::traits::{
    Clock, MetadataScraper, RecordPatch, ScrapeOptions, TranscriptionDispatcher, VideoRecordStore,
};
use crate::types::{
    CallerHints, Platform, ScrapeResult, TranscriptionDispatchRequest, TranscriptionState,
    TranscriptionStatus, VideoAttributes,
};

/// Reason persisted when neither the scrape nor the fallback yields a media URL.
pub const DOWNLOAD_URL_UNAVAILABLE: &str = "Download URL unavailable after scrape failure";

/// What to do when the scrape fails with a timeout-like error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// Record `timeout` and stop; no fallback, no dispatch.
    #[default]
    Terminal,
    /// Treat it like any other scrape error and try the CDN fallback.
    FallThrough,
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub scrape_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(45),
            timeout_policy: TimeoutPolicy::default(),
        }
    }
}

/// One video to enrich.
#[derive(Debug, Clone)]
pub struct EnrichRequest {
    pub video_id: String,
    pub source_url: String,
    pub platform: Platform,
    pub prior: VideoAttributes,
    pub hints: CallerHints,
    /// The caller's own deadline. The scrape never outlives it.
    pub deadline: Option<Instant>,
}

impl EnrichRequest {
    pub fn new(
        video_id: impl Into<String>,
        source_url: impl Into<String>,
        platform: Platform,
        prior: VideoAttributes,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            source_url: source_url.into(),
            platform,
            prior,
            hints: CallerHints::default(),
            deadline: None,
        }
    }

    pub fn with_hints(mut self, hints: CallerHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// How a single invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// Scrape succeeded; metadata merged and transcription dispatched.
    Processing,
    /// Scrape failed but a direct media URL was found and dispatched.
    FallbackDispatched { url: String },
    /// Scrape timed out; recorded and left alone.
    Timeout { reason: String },
    /// Nothing transcribable was found.
    Failed { reason: String },
}

impl EnrichmentOutcome {
    pub fn status(&self) -> TranscriptionStatus {
        match self {
            EnrichmentOutcome::Processing | EnrichmentOutcome::FallbackDispatched { .. } => {
                TranscriptionStatus::Processing
            }
            EnrichmentOutcome::Timeout { .. } => TranscriptionStatus::Timeout,
            EnrichmentOutcome::Failed { .. } => TranscriptionStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub attributes: VideoAttributes,
    pub outcome: EnrichmentOutcome,
    /// The request handed to the dispatcher, whether or not the enqueue succeeded.
    pub dispatch_request: Option<TranscriptionDispatchRequest>,
    pub dispatch_error: Option<String>,
    pub scrape_error: Option<ScrapeError>,
}

impl EnrichmentReport {
    pub fn dispatched(&self) -> bool {
        self.dispatch_request.is_some() && self.dispatch_error.is_none()
    }
}

pub struct EnrichmentOrchestrator {
    scraper: Arc<dyn MetadataScraper>,
    dispatcher: Arc<dyn TranscriptionDispatcher>,
    store: Arc<dyn VideoRecordStore>,
    clock: Arc<dyn Clock>,
    options: EnrichOptions,
}

impl EnrichmentOrchestrator {
    pub fn new(
        scraper: Arc<dyn MetadataScraper>,
        dispatcher: Arc<dyn TranscriptionDispatcher>,
        store: Arc<dyn VideoRecordStore>,
        clock: Arc<dyn Clock>,
        options: EnrichOptions,
    ) -> Self {
        Self {
            scraper,
            dispatcher,
            store,
            clock,
            options,
        }
    }

    /// Enrich one video and return only its final attributes.
    ///
    /// Scrape, dispatch and store failures are absorbed into the record;
    /// this never returns `Err` for them.
    pub async fn enrich_and_dispatch(&self, request: EnrichRequest) -> anyhow::Result<VideoAttributes> {
        Ok(self.enrich(request).await.attributes)
    }

    /// Enrich one video: scrape once, then merge and dispatch, record a
    /// timeout, or fall back to a direct CDN URL.
    pub async fn enrich(&self, request: EnrichRequest) -> EnrichmentReport {
        let EnrichRequest {
            video_id,
            source_url,
            platform,
            prior,
            hints,
            deadline,
        } = request;

        let platform = [platform, prior.platform]
            .into_iter()
            .find(Platform::is_known)
            .unwrap_or_else(|| Platform::detect(&source_url));

        info!(
            video_id = video_id.as_str(),
            source_url = source_url.as_str(),
            platform = %platform,
            scraper = self.scraper.name(),
            "Enriching video"
        );

        let scrape_error = match self.scrape(&source_url, platform, deadline).await {
            Ok(result) if result.success => {
                return self
                    .dispatch_scraped(&video_id, &source_url, platform, prior, result)
                    .await;
            }
            Ok(_) => {
                info!(video_id = video_id.as_str(), "Scrape reported no usable result, trying fallback");
                None
            }
            Err(err) if err.is_timeout() && self.options.timeout_policy == TimeoutPolicy::Terminal => {
                warn!(video_id = video_id.as_str(), error = %err, "Scrape timed out");
                let reason = err.message.clone();
                let state = TranscriptionState::Timeout {
                    reason: reason.clone(),
                    failed_at: self.clock.now(),
                };
                let attributes = self.record_state(&video_id, prior, state).await;
                return EnrichmentReport {
                    attributes,
                    outcome: EnrichmentOutcome::Timeout { reason },
                    dispatch_request: None,
                    dispatch_error: None,
                    scrape_error: Some(err),
                };
            }
            Err(err) => {
                warn!(
                    video_id = video_id.as_str(),
                    kind = ?err.kind,
                    error = %err,
                    "Scrape failed, trying fallback"
                );
                Some(err)
            }
        };

        self.fallback(&video_id, platform, prior, &hints, scrape_error).await
    }

    /// Run the scrape under the tighter of our own budget and the caller's deadline.
    async fn scrape(
        &self,
        url: &str,
        platform: Platform,
        caller_deadline: Option<Instant>,
    ) -> Result<ScrapeResult, ScrapeError> {
        let started = Instant::now();
        let budget = started + self.options.scrape_timeout;
        let deadline = caller_deadline.map_or(budget, |d| d.min(budget));

        let opts = ScrapeOptions {
            platform,
            timeout: deadline.saturating_duration_since(started),
        };

        match tokio::time::timeout_at(deadline, self.scraper.scrape(url, &opts)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err(ScrapeError::classify(format!("{e:#}"))),
            Err(_) => Err(ScrapeError::deadline_elapsed(opts.timeout)),
        }
    }

    async fn dispatch_scraped(
        &self,
        video_id: &str,
        source_url: &str,
        platform: Platform,
        mut prior: VideoAttributes,
        result: ScrapeResult,
    ) -> EnrichmentReport {
        if prior.source_url.is_empty() {
            prior.source_url = source_url.to_string();
        }
        let now = self.clock.now();
        let (merged, updates) = merge_scrape_result(&prior, &result, now);
        self.persist(video_id, RecordPatch::new(updates, now)).await;

        let media_url = [
            result.download_url.as_deref(),
            result.video_url.as_deref(),
            prior.url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|u| !u.is_empty())
        .unwrap_or(source_url);

        let task = TranscriptionDispatchRequest {
            video_id: video_id.to_string(),
            source_url: media_url.to_string(),
            platform: result.platform.filter(Platform::is_known).unwrap_or(platform),
        };
        let dispatch_error = self.dispatch(task.clone()).await;

        EnrichmentReport {
            attributes: merged,
            outcome: EnrichmentOutcome::Processing,
            dispatch_request: Some(task),
            dispatch_error,
            scrape_error: None,
        }
    }

    async fn fallback(
        &self,
        video_id: &str,
        platform: Platform,
        prior: VideoAttributes,
        hints: &CallerHints,
        scrape_error: Option<ScrapeError>,
    ) -> EnrichmentReport {
        let candidates = fallback_candidates(&prior, hints);

        let Some(url) = select_fallback_url(&candidates) else {
            warn!(video_id, "No direct media URL among fallback candidates");
            let state = TranscriptionState::Failed {
                reason: DOWNLOAD_URL_UNAVAILABLE.to_string(),
                failed_at: self.clock.now(),
            };
            let attributes = self.record_state(video_id, prior, state).await;
            return EnrichmentReport {
                attributes,
                outcome: EnrichmentOutcome::Failed {
                    reason: DOWNLOAD_URL_UNAVAILABLE.to_string(),
                },
                dispatch_request: None,
                dispatch_error: None,
                scrape_error,
            };
        };

        let platform = match platform {
            Platform::Other => media_platform(&url),
            known => known,
        };
        info!(video_id, url = url.as_str(), platform = %platform, "Dispatching fallback media URL");

        let task = TranscriptionDispatchRequest {
            video_id: video_id.to_string(),
            source_url: url.clone(),
            platform,
        };
        let dispatch_error = self.dispatch(task.clone()).await;

        // Only claim `processing` once something was actually queued.
        let attributes = if dispatch_error.is_none() {
            let state = TranscriptionState::Processing {
                queued_at: self.clock.now(),
            };
            self.record_state(video_id, prior, state).await
        } else {
            prior
        };

        EnrichmentReport {
            attributes,
            outcome: EnrichmentOutcome::FallbackDispatched { url },
            dispatch_request: Some(task),
            dispatch_error,
            scrape_error,
        }
    }

    /// Persist transcription bookkeeping and mirror it onto the returned record.
    async fn record_state(
        &self,
        video_id: &str,
        mut attributes: VideoAttributes,
        state: TranscriptionState,
    ) -> VideoAttributes {
        let written_at = match &state {
            TranscriptionState::Unset => self.clock.now(),
            TranscriptionState::Processing { queued_at } => *queued_at,
            TranscriptionState::Timeout { failed_at, .. }
            | TranscriptionState::Failed { failed_at, .. } => *failed_at,
        };
        let fields = state.to_metadata_fields();
        attributes
            .metadata
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.persist(video_id, RecordPatch::metadata(fields, written_at)).await;
        attributes
    }

    async fn persist(&self, video_id: &str, patch: RecordPatch) {
        if let Err(e) = self.store.patch(video_id, patch).await {
            error!(video_id, error = %e, "Failed to persist video record patch");
        }
    }

    /// Returns the enqueue error text, if any. Enqueue failures are logged
    /// and reported but never change the persisted status.
    async fn dispatch(&self, task: TranscriptionDispatchRequest) -> Option<String> {
        let video_id = task.video_id.clone();
        match self.dispatcher.enqueue(task).await {
            Ok(()) => None,
            Err(e) => {
                warn!(video_id = video_id.as_str(), error = %e, "Transcription enqueue failed");
                Some(format!("{e:#}"))
            }
        }
    }
}
