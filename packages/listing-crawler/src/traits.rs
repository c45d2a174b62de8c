//! Collaborator seams (to allow mocking).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CrawlResult;
use crate::types::{ImageCandidate, NextOutcome, WaitOutcome};

/// The browser/DOM collaborator: everything the traversal controller
/// needs from a rendered catalog or listing page.
///
/// Implementations hand raw attribute data to the pure extractors in
/// [`crate::extract`]; they never interpret listing semantics
/// themselves.
#[async_trait]
pub trait CatalogBrowser: Send + Sync {
    /// Navigate to a URL.
    async fn goto(&self, url: &str) -> CrawlResult<()>;

    /// The URL currently loaded (after redirects).
    async fn current_url(&self) -> CrawlResult<String>;

    /// Bounded wait for an element to be present. Timing out is a
    /// normal outcome, never an error.
    async fn wait_for(&self, css: &str, timeout: Duration) -> WaitOutcome;

    /// All anchor hrefs on the current view.
    async fn anchor_hrefs(&self) -> CrawlResult<Vec<String>>;

    /// Raw image-like candidates on the current view: `img` attributes
    /// plus inline styles carrying background images.
    async fn image_candidates(&self) -> CrawlResult<Vec<ImageCandidate>>;

    /// Best-effort search for a next-page control; activates it when
    /// found. `NotFound` is the end-of-catalog signal.
    async fn activate_next_control(&self) -> CrawlResult<NextOutcome>;

    /// Scroll the viewport to the top.
    async fn scroll_to_top(&self) -> CrawlResult<()>;

    /// Scroll the viewport to the bottom, triggering lazy loading.
    async fn scroll_to_bottom(&self) -> CrawlResult<()>;

    /// Release the underlying session.
    async fn close(&self) -> CrawlResult<()>;
}

/// The HTTP transfer collaborator for individual photos.
#[async_trait]
pub trait PhotoFetcher: Send + Sync {
    /// Fetch raw image bytes from a URL.
    async fn fetch(&self, url: &str) -> CrawlResult<Vec<u8>>;
}

/// The classification collaborator: cached image file in, decision out.
pub trait PhotoClassifier: Send + Sync {
    fn classify(&self, path: &Path) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
}
