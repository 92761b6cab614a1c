pub mod error;
pub mod types;

pub use error::{ApifyError, Result};
pub use types::{
    InstagramDirectInput, InstagramVideo, RunData, TikTokAuthor, TikTokMusicMeta, TikTokPostInput,
    TikTokVideo, TikTokVideoMeta,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use types::ApiResponse;

const BASE_URL: &str = "https://api.apify.com/v2";

/// Actor ID for apify/instagram-scraper.
const INSTAGRAM_SCRAPER: &str = "shu8hvrXbJbY3Eb9W";

/// Actor ID for clockworks/tiktok-scraper.
const TIKTOK_SCRAPER: &str = "GdWCkxBtKWOsKjdch";

pub struct ApifyClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApifyClient {
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            token,
        }
    }

    /// Point the client at a different API root (self-hosted proxy, test server).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Start an actor run with the given input. Returns immediately with run metadata.
    pub async fn start_run<I: Serialize + ?Sized>(&self, actor_id: &str, input: &I) -> Result<RunData> {
        let url = format!("{}/acts/{}/runs", self.base_url, actor_id);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let api_resp: ApiResponse<RunData> = resp.json().await?;
        Ok(api_resp.data)
    }

    /// Poll until a run completes. Uses `waitForFinish=60` for efficient long-polling.
    pub async fn wait_for_run(&self, run_id: &str) -> Result<RunData> {
        loop {
            let url = format!("{}/actor-runs/{}?waitForFinish=60", self.base_url, run_id);
            let resp = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(ApifyError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let api_resp: ApiResponse<RunData> = resp.json().await?;
            match api_resp.data.status.as_str() {
                "SUCCEEDED" => return Ok(api_resp.data),
                "TIMED-OUT" => {
                    return Err(ApifyError::RunTimedOut {
                        run_id: api_resp.data.id,
                    });
                }
                "FAILED" | "ABORTED" => {
                    return Err(ApifyError::RunFailed(api_resp.data.status));
                }
                _ => {
                    tracing::debug!(run_id, status = %api_resp.data.status, "Run still in progress");
                    continue;
                }
            }
        }
    }

    /// Fetch dataset items from a completed run.
    pub async fn get_dataset_items<T: DeserializeOwned>(&self, dataset_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/datasets/{}/items?format=json", self.base_url, dataset_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApifyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let items: Vec<T> = resp.json().await?;
        Ok(items)
    }

    /// Start a run, wait for it, and fetch its dataset.
    async fn run_to_completion<I, T>(&self, actor_id: &str, input: &I) -> Result<Vec<T>>
    where
        I: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let run = self.start_run(actor_id, input).await?;
        tracing::info!(run_id = %run.id, "Apify run started, polling for completion");

        let completed = self.wait_for_run(&run.id).await?;
        tracing::info!(
            run_id = %completed.id,
            dataset_id = %completed.default_dataset_id,
            "Run completed, fetching results"
        );

        self.get_dataset_items(&completed.default_dataset_id).await
    }

    /// Scrape a single Instagram post or reel by its permalink.
    pub async fn scrape_instagram_video(&self, post_url: &str) -> Result<Vec<InstagramVideo>> {
        tracing::info!(post_url, "Starting Instagram video scrape");

        let input = InstagramDirectInput {
            direct_urls: vec![post_url.to_string()],
            results_type: "posts".to_string(),
            results_limit: 1,
        };

        let items: Vec<InstagramVideo> = self.run_to_completion(INSTAGRAM_SCRAPER, &input).await?;
        tracing::info!(count = items.len(), "Fetched Instagram items");
        Ok(items)
    }

    /// Scrape a single TikTok video by its permalink, asking Apify to mirror the mp4.
    pub async fn scrape_tiktok_video(&self, post_url: &str) -> Result<Vec<TikTokVideo>> {
        tracing::info!(post_url, "Starting TikTok video scrape");

        let input = TikTokPostInput {
            post_urls: vec![post_url.to_string()],
            should_download_videos: true,
            results_per_page: 1,
        };

        let items: Vec<TikTokVideo> = self.run_to_completion(TIKTOK_SCRAPER, &input).await?;
        tracing::info!(count = items.len(), "Fetched TikTok items");
        Ok(items)
    }
}
