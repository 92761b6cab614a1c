// Direct-media URL heuristics.
//
// A scrape that fails may still leave us holding a CDN link from an earlier
// enrichment or from the caller. These helpers decide whether such a link
// can be handed straight to the transcription worker.

use crate::types::{CallerHints, Platform, VideoAttributes};

const INSTAGRAM_CDN_HOSTS: &[&str] = &["cdninstagram.com"];
const TIKTOK_CDN_HOSTS: &[&str] = &["tiktokcdn.com", "bytecdn.cn", "ibyteimg.com"];

/// True if `candidate` points straight at a platform-hosted mp4.
///
/// Case-insensitive substring match; no network access.
pub fn is_direct_media_url(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let lower = candidate.to_lowercase();
    if !lower.contains(".mp4") {
        return false;
    }
    INSTAGRAM_CDN_HOSTS
        .iter()
        .chain(TIKTOK_CDN_HOSTS)
        .any(|host| lower.contains(host))
}

/// Platform whose CDN serves `url`, if it is one we recognize.
pub fn media_platform(url: &str) -> Platform {
    let lower = url.to_lowercase();
    if INSTAGRAM_CDN_HOSTS.iter().any(|host| lower.contains(host)) {
        Platform::Instagram
    } else if TIKTOK_CDN_HOSTS.iter().any(|host| lower.contains(host)) {
        Platform::TikTok
    } else {
        Platform::Other
    }
}

/// First candidate that passes [`is_direct_media_url`]. Order is priority.
pub fn select_fallback_url<S: AsRef<str>>(candidates: &[S]) -> Option<String> {
    candidates
        .iter()
        .find(|c| is_direct_media_url(c.as_ref()))
        .map(|c| c.as_ref().to_string())
}

/// Candidates in fixed priority order: the record's playback URL, the record's
/// `metadata.downloadUrl`, then the caller's download, video and original URLs.
pub fn fallback_candidates(record: &VideoAttributes, hints: &CallerHints) -> Vec<String> {
    [
        record.url.as_deref(),
        record.metadata_str("downloadUrl"),
        hints.download_url.as_deref(),
        hints.video_url.as_deref(),
        hints.original_url.as_deref(),
    ]
    .into_iter()
    .map(|c| c.unwrap_or_default().to_string())
    .collect()
}
