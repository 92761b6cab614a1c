//! Typed errors for scraping and record storage.
//!
//! The upstream scraper only ever hands back message text, so
//! [`ScrapeError::classify`] turns that text into a [`ScrapeErrorKind`] once,
//! and everything downstream matches on the kind.

use serde::Serialize;
use thiserror::Error;

/// What went wrong with a scrape, as far as the message text reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeErrorKind {
    Timeout,
    RateLimited,
    NotFound,
    Unknown,
}

/// A classified scrape failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ScrapeError {
    pub kind: ScrapeErrorKind,
    pub message: String,
}

impl ScrapeError {
    /// Classify free-form error text. Substring heuristics, checked in order:
    /// timeout (`timeout`, `timed out`, `524`), rate limit, not found.
    ///
    /// Fragile by nature: a message like "fetched 524 items" reads as a timeout.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        let kind = if ["timeout", "timed out", "524"].iter().any(|p| lower.contains(p)) {
            ScrapeErrorKind::Timeout
        } else if ["429", "rate limit", "too many requests"]
            .iter()
            .any(|p| lower.contains(p))
        {
            ScrapeErrorKind::RateLimited
        } else if ["404", "not found"].iter().any(|p| lower.contains(p)) {
            ScrapeErrorKind::NotFound
        } else {
            ScrapeErrorKind::Unknown
        };

        Self { kind, message }
    }

    /// The orchestrator's own scrape deadline expired.
    pub fn deadline_elapsed(after: std::time::Duration) -> Self {
        Self {
            kind: ScrapeErrorKind::Timeout,
            message: format!("scrape timed out after {}s", after.as_secs()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ScrapeErrorKind::Timeout
    }
}

/// True if the error's message looks like a scrape timeout.
pub fn is_timeout_like(err: &(dyn std::fmt::Display + '_)) -> bool {
    ScrapeError::classify(err.to_string()).is_timeout()
}

/// Errors from a [`crate::traits::VideoRecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video record not found: {0}")]
    NotFound(String),

    #[error("patch for {id} must be a JSON object, got {found}")]
    InvalidPatch { id: String, found: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
