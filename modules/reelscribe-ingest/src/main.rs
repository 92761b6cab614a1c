use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apify_client::ApifyClient;
use reelscribe_ingest::{
    ApifyScraper, CallerHints, EnrichRequest, EnrichmentOrchestrator, HttpTranscriptionDispatcher,
    IngestConfig, PgVideoStore, Platform, SystemClock, VideoAttributes, VideoRecordStore,
};

/// Enrich one video record and hand it to transcription.
#[derive(Debug, Parser)]
#[command(name = "enrich")]
struct Args {
    /// Record id of the video.
    #[arg(long)]
    video_id: String,

    /// Page URL the video was added from.
    #[arg(long)]
    url: String,

    /// Platform tag (instagram, tiktok, youtube, other). Detected from the URL if omitted.
    #[arg(long, default_value = "other")]
    platform: String,

    /// Direct download URL the caller already has.
    #[arg(long)]
    download_url: Option<String>,

    /// Direct video URL the caller already has.
    #[arg(long)]
    video_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reelscribe_ingest=info".parse()?))
        .init();

    let args = Args::parse();
    info!(video_id = args.video_id.as_str(), "Reelscribe enrich starting...");

    // Load config
    let config = IngestConfig::from_env();
    config.log_redacted();

    // Connect to Postgres
    let store = PgVideoStore::connect(&config.database_url).await?;
    store.migrate().await?;

    let platform = Platform::from_tag(&args.platform);
    let prior = match store.get(&args.video_id).await? {
        Some(record) => record,
        None => {
            info!(video_id = args.video_id.as_str(), "No existing record, creating one");
            let record = VideoAttributes::new(&args.video_id, &args.url, platform);
            store.insert(&record).await?;
            record
        }
    };

    let scraper = ApifyScraper::new(ApifyClient::new(config.apify_api_key.clone()));
    let dispatcher = HttpTranscriptionDispatcher::new(&config.transcription_ingress_url)
        .with_auth_token(config.transcription_auth_token.clone());

    let orchestrator = EnrichmentOrchestrator::new(
        Arc::new(scraper),
        Arc::new(dispatcher),
        Arc::new(store),
        Arc::new(SystemClock),
        config.enrich_options(),
    );

    let request = EnrichRequest::new(&args.video_id, &args.url, platform, prior).with_hints(CallerHints {
        download_url: args.download_url,
        video_url: args.video_url,
        original_url: Some(args.url.clone()),
    });
    let report = orchestrator.enrich(request).await;

    info!(
        video_id = args.video_id.as_str(),
        status = %report.outcome.status(),
        dispatched = report.dispatched(),
        "Enrichment complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
