use std::env;
use std::time::Duration;

use crate::orchestrator::{EnrichOptions, TimeoutPolicy};

const DEFAULT_SCRAPE_TIMEOUT_SECS: u64 = 45;

/// Ingest configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    // Scraping
    pub apify_api_key: String,
    pub scrape_timeout: Duration,

    // Persistence
    pub database_url: String,

    // Transcription workflow ingress
    pub transcription_ingress_url: String,
    pub transcription_auth_token: Option<String>,

    /// Let timeout-classified scrape failures try the CDN fallback.
    pub timeout_fallthrough: bool,
}

impl IngestConfig {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            apify_api_key: required_env("APIFY_API_KEY"),
            scrape_timeout: Duration::from_secs(
                env::var("SCRAPE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SCRAPE_TIMEOUT_SECS),
            ),
            database_url: required_env("DATABASE_URL"),
            transcription_ingress_url: required_env("TRANSCRIPTION_INGRESS_URL"),
            transcription_auth_token: env::var("TRANSCRIPTION_AUTH_TOKEN").ok(),
            timeout_fallthrough: parse_flag(env::var("TIMEOUT_FALLTHROUGH").ok().as_deref()),
        }
    }

    pub fn enrich_options(&self) -> EnrichOptions {
        EnrichOptions {
            scrape_timeout: self.scrape_timeout,
            timeout_policy: if self.timeout_fallthrough {
                TimeoutPolicy::FallThrough
            } else {
                TimeoutPolicy::Terminal
            },
        }
    }

    /// Log config with secrets cut to a short prefix.
    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  APIFY_API_KEY: {}", preview(&self.apify_api_key));
        tracing::info!("  DATABASE_URL: {}", preview(&self.database_url));
        tracing::info!("  TRANSCRIPTION_INGRESS_URL: {}", self.transcription_ingress_url);
        tracing::info!("  SCRAPE_TIMEOUT_SECS: {}", self.scrape_timeout.as_secs());
        tracing::info!("  TIMEOUT_FALLTHROUGH: {}", self.timeout_fallthrough);
    }
}

fn preview(val: &str) -> String {
    let head: String = val.chars().take(5).collect();
    format!("{head}...({} chars)", val.chars().count())
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
