use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// --- Platform ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    #[serde(rename = "tiktok")]
    TikTok,
    #[serde(rename = "youtube")]
    YouTube,
    #[default]
    #[serde(other)]
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::TikTok => "tiktok",
            Platform::YouTube => "youtube",
            Platform::Other => "other",
        }
    }

    /// Parse a caller-supplied tag. Unknown tags map to `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "instagram" => Platform::Instagram,
            "tiktok" => Platform::TikTok,
            "youtube" => Platform::YouTube,
            _ => Platform::Other,
        }
    }

    /// Detect the platform from a page URL alone (no HTTP).
    pub fn detect(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.contains("instagram.com") {
            Platform::Instagram
        } else if lower.contains("tiktok.com") {
            Platform::TikTok
        } else if lower.contains("youtube.com") || lower.contains("youtu.be") {
            Platform::YouTube
        } else {
            Platform::Other
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Other)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Transcription status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    #[default]
    Unset,
    Processing,
    Timeout,
    Failed,
}

impl TranscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::Unset => "unset",
            TranscriptionStatus::Processing => "processing",
            TranscriptionStatus::Timeout => "timeout",
            TranscriptionStatus::Failed => "failed",
        }
    }

    /// Statuses after which nothing in this crate acts on the record again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranscriptionStatus::Timeout | TranscriptionStatus::Failed)
    }
}

impl std::fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transcription bookkeeping as persisted in `metadata`.
///
/// Failure states always carry a reason and a timestamp; there is no way to
/// write `timeout` or `failed` without both.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionState {
    Unset,
    Processing { queued_at: DateTime<Utc> },
    Timeout { reason: String, failed_at: DateTime<Utc> },
    Failed { reason: String, failed_at: DateTime<Utc> },
}

impl TranscriptionState {
    pub fn status(&self) -> TranscriptionStatus {
        match self {
            TranscriptionState::Unset => TranscriptionStatus::Unset,
            TranscriptionState::Processing { .. } => TranscriptionStatus::Processing,
            TranscriptionState::Timeout { .. } => TranscriptionStatus::Timeout,
            TranscriptionState::Failed { .. } => TranscriptionStatus::Failed,
        }
    }

    /// Metadata keys to merge into the record for this state.
    pub fn to_metadata_fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "transcriptionStatus".into(),
            Value::String(self.status().as_str().into()),
        );
        match self {
            TranscriptionState::Unset => {}
            TranscriptionState::Processing { queued_at } => {
                fields.insert("transcriptionQueuedAt".into(), timestamp(*queued_at));
                // Clear leftovers from an earlier failed attempt.
                fields.insert("transcriptionError".into(), Value::Null);
                fields.insert("transcriptionFailedAt".into(), Value::Null);
            }
            TranscriptionState::Timeout { reason, failed_at }
            | TranscriptionState::Failed { reason, failed_at } => {
                fields.insert("transcriptionError".into(), Value::String(reason.clone()));
                fields.insert("transcriptionFailedAt".into(), timestamp(*failed_at));
            }
        }
        fields
    }

    /// Read the state back out of a metadata bag. Malformed or partial
    /// failure entries read as `Unset` rather than inventing a reason.
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        let status = metadata
            .get("transcriptionStatus")
            .and_then(Value::as_str)
            .unwrap_or("unset");
        let reason = metadata
            .get("transcriptionError")
            .and_then(Value::as_str)
            .map(String::from);
        let at = |key: &str| {
            metadata
                .get(key)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };

        match status {
            "processing" => match at("transcriptionQueuedAt") {
                Some(queued_at) => TranscriptionState::Processing { queued_at },
                None => TranscriptionState::Unset,
            },
            "timeout" => match (reason, at("transcriptionFailedAt")) {
                (Some(reason), Some(failed_at)) => TranscriptionState::Timeout { reason, failed_at },
                _ => TranscriptionState::Unset,
            },
            "failed" => match (reason, at("transcriptionFailedAt")) {
                (Some(reason), Some(failed_at)) => TranscriptionState::Failed { reason, failed_at },
                _ => TranscriptionState::Unset,
            },
            _ => TranscriptionState::Unset,
        }
    }
}

/// RFC 3339 with millisecond precision, the format every stored timestamp uses.
pub fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

// --- Video record ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub saves: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The persisted video record as this crate sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAttributes {
    pub id: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub platform: Platform,
    /// Playback URL once known.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub insights: Insights,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub content_metadata: ContentMetadata,
}

impl VideoAttributes {
    pub fn new(id: impl Into<String>, source_url: impl Into<String>, platform: Platform) -> Self {
        Self {
            id: id.into(),
            source_url: source_url.into(),
            platform,
            ..Default::default()
        }
    }

    pub fn transcription_state(&self) -> TranscriptionState {
        TranscriptionState::from_metadata(&self.metadata)
    }

    /// Status as written, even when the accompanying fields are incomplete.
    pub fn transcription_status(&self) -> TranscriptionStatus {
        match self.metadata.get("transcriptionStatus").and_then(Value::as_str) {
            Some("processing") => TranscriptionStatus::Processing,
            Some("timeout") => TranscriptionStatus::Timeout,
            Some("failed") => TranscriptionStatus::Failed,
            _ => TranscriptionStatus::Unset,
        }
    }

    pub fn transcription_error(&self) -> Option<&str> {
        self.metadata.get("transcriptionError").and_then(Value::as_str)
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

// --- Scrape result ---

/// One best-effort scrape of a video page. Consumed by the merge, never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ScrapeResult {
    pub fn failed() -> Self {
        Self::default()
    }
}

// --- Caller input and dispatch message ---

/// URLs the caller already had before enrichment, used only by the fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerHints {
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
}

/// Fire-and-forget request to transcribe one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionDispatchRequest {
    #[serde(rename = "videoID")]
    pub video_id: String,
    #[serde(rename = "sourceURL")]
    pub source_url: String,
    pub platform: Platform,
}
