// Transcription dispatch over the workflow ingress.
//
// The transcription worker runs as a durable workflow keyed by video id. We
// POST to the `/send` variant of its run handler, which returns as soon as the
// invocation is accepted.

use anyhow::Result;
use async_trait::async_trait;

use crate::traits::TranscriptionDispatcher;
use crate::types::TranscriptionDispatchRequest;

/// Production dispatcher that POSTs transcription requests to the workflow ingress.
pub struct HttpTranscriptionDispatcher {
    http: reqwest::Client,
    ingress_url: String,
    auth_token: Option<String>,
}

impl HttpTranscriptionDispatcher {
    pub fn new(ingress_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            ingress_url: ingress_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
        }
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Workflow key is the video id, so a repeated send for the same video
    /// attaches to the existing invocation instead of starting another.
    fn send_url(&self, video_id: &str) -> String {
        format!("{}/TranscriptionWorkflow/{video_id}/run/send", self.ingress_url)
    }
}

#[async_trait]
impl TranscriptionDispatcher for HttpTranscriptionDispatcher {
    async fn enqueue(&self, task: TranscriptionDispatchRequest) -> Result<()> {
        let url = self.send_url(&task.video_id);

        tracing::info!(
            url = url.as_str(),
            video_id = task.video_id.as_str(),
            platform = %task.platform,
            "Dispatching transcription"
        );

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&task);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Transcription dispatch failed ({}): {}",
                status,
                error_text
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_url_is_keyed_by_video_id() {
        let dispatcher = HttpTranscriptionDispatcher::new("http://restate:8080/");
        assert_eq!(
            dispatcher.send_url("vid-42"),
            "http://restate:8080/TranscriptionWorkflow/vid-42/run/send"
        );
    }

    #[test]
    fn empty_auth_token_is_ignored() {
        let dispatcher =
            HttpTranscriptionDispatcher::new("http://restate:8080").with_auth_token(Some(String::new()));
        assert!(dispatcher.auth_token.is_none());
    }
}
