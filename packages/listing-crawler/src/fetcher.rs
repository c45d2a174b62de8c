//! HTTP photo transfer via `reqwest`.

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CrawlError, CrawlResult};
use crate::traits::PhotoFetcher;

/// Fetches photo bytes over HTTP with the configured user-agent.
/// Non-image responses are rejected by a content-type check, which is
/// what makes the permissive extractors cheap to be wrong about.
pub struct HttpPhotoFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpPhotoFetcher {
    /// Wrap a pre-built client (the caller owns timeout and pool
    /// settings).
    pub fn with_client(client: reqwest::Client, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: user_agent.into(),
        }
    }
}

#[async_trait]
impl PhotoFetcher for HttpPhotoFetcher {
    async fn fetch(&self, url: &str) -> CrawlResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(CrawlError::transfer)?
            .error_for_status()
            .map_err(CrawlError::transfer)?;

        if let Some(content_type) = response.headers().get("content-type") {
            let content_type = content_type.to_str().unwrap_or("");
            if !content_type.starts_with("image/") {
                return Err(CrawlError::transfer(format!(
                    "not an image: content-type {content_type}"
                )));
            }
        }

        let bytes = response.bytes().await.map_err(CrawlError::transfer)?;
        debug!(url = %url, bytes = bytes.len(), "photo fetched");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unparseable_url_is_a_transfer_error() {
        let fetcher = HttpPhotoFetcher::with_client(reqwest::Client::new(), "test-agent");
        let result = fetcher.fetch("not a url").await;
        assert!(matches!(result, Err(CrawlError::Transfer(_))));
    }
}
