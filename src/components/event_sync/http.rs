use crate::error::{transport_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Browser-like user agent; Steam serves a reduced page to unknown clients
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Source of HTML pages
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> BotResult<String>;
}

/// Source of banner images, used best-effort
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> BotResult<Vec<u8>>;
}

/// reqwest-backed transport for pages and images
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> BotResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| transport_error(&format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> BotResult<reqwest::Response> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(transport_error(&format!(
                "Request to {} failed: HTTP {}",
                url,
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl HtmlFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> BotResult<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ImageFetcher for HttpClient {
    async fn fetch_bytes(&self, url: &str) -> BotResult<Vec<u8>> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
