// Apify-backed metadata scraper.
//
// Routes a video page URL to the matching Apify actor and reshapes the first
// dataset item into a ScrapeResult. Platforms without an actor report
// `success: false` rather than erroring, which sends the orchestrator to its
// CDN fallback.

use anyhow::Result;
use apify_client::{ApifyClient, InstagramVideo, TikTokVideo};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::traits::{MetadataScraper, ScrapeOptions};
use crate::types::{Platform, ScrapeResult};

const MAX_TITLE_CHARS: usize = 100;

pub struct ApifyScraper {
    client: ApifyClient,
}

impl ApifyScraper {
    pub fn new(client: ApifyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataScraper for ApifyScraper {
    async fn scrape(&self, url: &str, opts: &ScrapeOptions) -> Result<ScrapeResult> {
        let platform = match Platform::detect(url) {
            Platform::Other => opts.platform,
            detected => detected,
        };

        let result = match platform {
            Platform::Instagram => self
                .client
                .scrape_instagram_video(url)
                .await?
                .into_iter()
                .next()
                .map(from_instagram),
            Platform::TikTok => self
                .client
                .scrape_tiktok_video(url)
                .await?
                .into_iter()
                .next()
                .map(from_tiktok),
            Platform::YouTube | Platform::Other => {
                info!(url, platform = %platform, "No scraper for platform, skipping");
                return Ok(ScrapeResult::failed());
            }
        };

        match result {
            Some(result) => Ok(result),
            None => {
                warn!(url, platform = %platform, "Scrape returned no items");
                Ok(ScrapeResult::failed())
            }
        }
    }

    fn name(&self) -> &str {
        "apify"
    }
}

/// Reshape an Instagram dataset item. Photo posts have nothing to transcribe.
pub fn from_instagram(item: InstagramVideo) -> ScrapeResult {
    let is_video = item.video_url.is_some() || item.post_type.as_deref() == Some("Video");
    let raw = serde_json::to_value(&item).ok();

    ScrapeResult {
        success: is_video,
        title: item.caption.as_deref().and_then(title_from_caption),
        author: item.author().map(String::from),
        duration: item.video_duration,
        thumbnail_url: item.display_url.clone(),
        download_url: item.video_url.clone(),
        video_url: item.video_url.clone(),
        audio_url: item.audio_url.clone(),
        description: item.caption.clone(),
        platform: Some(Platform::Instagram),
        views: item.views().map(|v| v as f64),
        likes: item.likes_count.map(|v| v as f64),
        comments: item.comments_count.map(|v| v as f64),
        shares: None,
        raw,
    }
}

/// Reshape a TikTok dataset item. Apify-mirrored media wins over the signed CDN link.
pub fn from_tiktok(item: TikTokVideo) -> ScrapeResult {
    let raw = serde_json::to_value(&item).ok();
    let meta = item.video_meta.as_ref();

    let download_url = item
        .media_urls
        .first()
        .cloned()
        .or_else(|| meta.and_then(|m| m.download_addr.clone()));
    let video_url = meta
        .and_then(|m| m.play_addr.clone())
        .or_else(|| item.web_video_url.clone());

    ScrapeResult {
        success: download_url.is_some() || video_url.is_some(),
        title: item.text.as_deref().and_then(title_from_caption),
        author: item
            .author_meta
            .as_ref()
            .and_then(|a| a.name.clone().or_else(|| a.nick_name.clone())),
        duration: meta.and_then(|m| m.duration),
        thumbnail_url: meta.and_then(|m| m.cover_url.clone()),
        download_url,
        video_url,
        audio_url: item.music_meta.as_ref().and_then(|m| m.play_url.clone()),
        description: item.text.clone(),
        platform: Some(Platform::TikTok),
        views: item.play_count.map(|v| v as f64),
        likes: item.digg_count.map(|v| v as f64),
        comments: item.comment_count.map(|v| v as f64),
        shares: item.share_count.map(|v| v as f64),
        raw,
    }
}

/// First non-empty caption line, cut to a title-sized prefix.
fn title_from_caption(caption: &str) -> Option<String> {
    let line = caption.lines().map(str::trim).find(|l| !l.is_empty())?;
    Some(line.chars().take(MAX_TITLE_CHARS).collect())
}
