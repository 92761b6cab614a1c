use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wrapper for Apify API responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

/// Apify actor run metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct RunData {
    pub id: String,
    pub status: String,
    #[serde(rename = "defaultDatasetId")]
    pub default_dataset_id: String,
    #[serde(rename = "startedAt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "finishedAt")]
    pub finished_at: Option<DateTime<Utc>>,
}

// --- Instagram post/reel scraper ---

/// Input for the apify/instagram-scraper actor in direct-URL mode.
#[derive(Debug, Clone, Serialize)]
pub struct InstagramDirectInput {
    #[serde(rename = "directUrls")]
    pub direct_urls: Vec<String>,
    #[serde(rename = "resultsType")]
    pub results_type: String,
    #[serde(rename = "resultsLimit")]
    pub results_limit: u32,
}

/// A single Instagram post or reel from the Apify dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramVideo {
    pub url: Option<String>,
    #[serde(rename = "shortCode")]
    pub short_code: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub caption: Option<String>,
    #[serde(rename = "ownerUsername")]
    pub owner_username: Option<String>,
    #[serde(rename = "ownerFullName")]
    pub owner_full_name: Option<String>,
    /// Direct CDN link to the mp4 (cdninstagram.com / fbcdn.net).
    #[serde(rename = "videoUrl")]
    pub video_url: Option<String>,
    #[serde(rename = "audioUrl")]
    pub audio_url: Option<String>,
    #[serde(rename = "displayUrl")]
    pub display_url: Option<String>,
    #[serde(rename = "videoDuration")]
    pub video_duration: Option<f64>,
    #[serde(rename = "videoViewCount")]
    pub video_view_count: Option<i64>,
    #[serde(rename = "videoPlayCount")]
    pub video_play_count: Option<i64>,
    #[serde(rename = "likesCount")]
    pub likes_count: Option<i64>,
    #[serde(rename = "commentsCount")]
    pub comments_count: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl InstagramVideo {
    /// Reels report plays separately from views; prefer plays when present.
    pub fn views(&self) -> Option<i64> {
        self.video_play_count.or(self.video_view_count)
    }

    pub fn author(&self) -> Option<&str> {
        self.owner_username
            .as_deref()
            .or(self.owner_full_name.as_deref())
    }
}

// --- TikTok video scraper ---

/// Input for the clockworks/tiktok-scraper actor in post-URL mode.
#[derive(Debug, Clone, Serialize)]
pub struct TikTokPostInput {
    #[serde(rename = "postURLs")]
    pub post_urls: Vec<String>,
    #[serde(rename = "shouldDownloadVideos")]
    pub should_download_videos: bool,
    #[serde(rename = "resultsPerPage")]
    pub results_per_page: u32,
}

/// A single TikTok video from the Apify dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokVideo {
    pub id: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "webVideoUrl")]
    pub web_video_url: Option<String>,
    #[serde(rename = "createTimeISO")]
    pub create_time_iso: Option<String>,
    #[serde(rename = "authorMeta")]
    pub author_meta: Option<TikTokAuthor>,
    #[serde(rename = "videoMeta")]
    pub video_meta: Option<TikTokVideoMeta>,
    #[serde(rename = "musicMeta")]
    pub music_meta: Option<TikTokMusicMeta>,
    /// Populated when `shouldDownloadVideos` is set; Apify key-value store links.
    #[serde(rename = "mediaUrls", default)]
    pub media_urls: Vec<String>,
    #[serde(rename = "diggCount")]
    pub digg_count: Option<i64>,
    #[serde(rename = "shareCount")]
    pub share_count: Option<i64>,
    #[serde(rename = "playCount")]
    pub play_count: Option<i64>,
    #[serde(rename = "commentCount")]
    pub comment_count: Option<i64>,
}

/// Author metadata from a TikTok video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokAuthor {
    pub name: Option<String>,
    #[serde(rename = "nickName")]
    pub nick_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokVideoMeta {
    pub duration: Option<f64>,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
    /// Signed tiktokcdn.com link; expires after a few hours.
    #[serde(rename = "downloadAddr")]
    pub download_addr: Option<String>,
    #[serde(rename = "playAddr")]
    pub play_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokMusicMeta {
    #[serde(rename = "playUrl")]
    pub play_url: Option<String>,
}
