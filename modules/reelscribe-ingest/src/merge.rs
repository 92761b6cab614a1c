// Scrape result → video record merge.
//
// Pure: same inputs, same output. The returned patch carries only the keys the
// merge sets, so a store applying it never touches unrelated fields.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::types::{timestamp, ScrapeResult, TranscriptionState, VideoAttributes};

/// Merge a successful scrape into the prior attributes.
///
/// Returns the merged record and the patch to persist for it. The merged
/// metadata marks transcription as queued at `now`; callers only persist it
/// together with a dispatch.
pub fn merge_scrape_result(
    prior: &VideoAttributes,
    result: &ScrapeResult,
    now: DateTime<Utc>,
) -> (VideoAttributes, Map<String, Value>) {
    let mut merged = prior.clone();
    let mut updates = Map::new();

    // Top-level fields fall back to what the record already had.
    merged.title = result.title.clone().or_else(|| prior.title.clone());
    merged.thumbnail_url = result.thumbnail_url.clone().or_else(|| prior.thumbnail_url.clone());
    merged.author = result.author.clone().or_else(|| prior.author.clone());
    merged.duration = finite(result.duration).or(prior.duration);
    merged.url = result.video_url.clone().or_else(|| prior.url.clone());
    if let Some(platform) = result.platform.filter(|p| p.is_known()) {
        merged.platform = platform;
        updates.insert("platform".into(), Value::String(platform.as_str().into()));
    }

    for (key, value) in [
        ("title", merged.title.as_deref()),
        ("thumbnailUrl", merged.thumbnail_url.as_deref()),
        ("author", merged.author.as_deref()),
        ("url", merged.url.as_deref()),
    ] {
        if let Some(v) = value {
            updates.insert(key.into(), Value::String(v.into()));
        }
    }
    if let Some(duration) = merged.duration {
        updates.insert("duration".into(), number(duration));
    }

    // Saves are never scraped; leave them alone.
    merged.insights.views = count(result.views).unwrap_or(prior.insights.views);
    merged.insights.likes = count(result.likes).unwrap_or(prior.insights.likes);
    merged.insights.comments = count(result.comments).unwrap_or(prior.insights.comments);
    let mut insights = Map::new();
    insights.insert("views".into(), merged.insights.views.into());
    insights.insert("likes".into(), merged.insights.likes.into());
    insights.insert("comments".into(), merged.insights.comments.into());
    updates.insert("insights".into(), Value::Object(insights));

    let metadata = metadata_fields(prior, result, now);
    for (key, value) in &metadata {
        merged.metadata.insert(key.clone(), value.clone());
    }
    updates.insert("metadata".into(), Value::Object(metadata));

    merged.content_metadata.description = non_empty(result.description.as_deref())
        .or_else(|| non_empty(prior.content_metadata.description.as_deref()))
        .or_else(|| non_empty(merged.title.as_deref()))
        .map(String::from);
    let mut content = Map::new();
    if let Some(description) = &merged.content_metadata.description {
        content.insert("description".into(), Value::String(description.clone()));
    }
    updates.insert("contentMetadata".into(), Value::Object(content));

    (merged, updates)
}

fn metadata_fields(prior: &VideoAttributes, result: &ScrapeResult, now: DateTime<Utc>) -> Map<String, Value> {
    let mut fields = Map::new();

    let original_url = non_empty(prior.metadata_str("originalUrl"))
        .or_else(|| non_empty(Some(prior.source_url.as_str())))
        .unwrap_or_default();
    fields.insert("originalUrl".into(), Value::String(original_url.into()));
    fields.insert("source".into(), Value::String("import".into()));

    let scrape = match &result.raw {
        Some(raw) => raw.clone(),
        None => serde_json::to_value(result).unwrap_or(Value::Null),
    };
    fields.insert("scrape".into(), scrape);
    fields.insert("scrapedAt".into(), timestamp(now));

    fields.extend(TranscriptionState::Processing { queued_at: now }.to_metadata_fields());

    if let Some(url) = non_empty(result.download_url.as_deref()) {
        fields.insert("downloadUrl".into(), Value::String(url.into()));
    }
    if let Some(url) = non_empty(result.audio_url.as_deref()) {
        fields.insert("audioUrl".into(), Value::String(url.into()));
    }

    let mut metrics = Map::new();
    for (key, value) in [
        ("views", result.views),
        ("likes", result.likes),
        ("comments", result.comments),
        ("shares", result.shares),
    ] {
        if let Some(v) = finite(value) {
            metrics.insert(key.into(), number(v));
        }
    }
    if !metrics.is_empty() {
        fields.insert("metrics".into(), Value::Object(metrics));
    }

    fields
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn count(value: Option<f64>) -> Option<u64> {
    finite(value).map(|v| v.max(0.0).round() as u64)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Whole numbers serialize as integers; everything else as floats.
fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Value::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
