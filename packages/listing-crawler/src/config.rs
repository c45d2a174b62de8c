//! Crawl configuration.
//!
//! Everything the traversal controller needs is carried explicitly in
//! one immutable value built at startup; no ambient state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the catalog is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Click through numbered result pages via a "next" control.
    Paged,
    /// Scroll an infinite feed until no new listings render.
    Scroll,
}

/// Which hrefs count as listing links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRules {
    /// An href must contain one of these locale segments.
    pub locale_segments: Vec<String>,
    /// ...and one of these listing-path markers.
    pub path_markers: Vec<String>,
}

impl Default for LinkRules {
    fn default() -> Self {
        Self {
            locale_segments: vec!["/en/".to_string(), "/fr/".to_string()],
            path_markers: vec![
                "/property".to_string(),
                "/properties".to_string(),
                "/real-estate".to_string(),
            ],
        }
    }
}

/// Configuration for a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Catalog entry URL.
    pub entry_url: String,
    /// Traversal strategy.
    pub strategy: Strategy,
    /// Delay between listings and after scroll/navigation steps.
    pub settle_delay: Duration,
    /// Wait after activating a next-page control or loading a listing.
    pub page_load_wait: Duration,
    /// Hard ceiling on catalog pages (guards malformed pagination).
    pub max_pages: u32,
    /// Hard ceiling on scroll iterations.
    pub max_scrolls: u32,
    /// Per-listing cap on photos analyzed (bounds per-listing cost).
    pub max_photos_per_listing: usize,
    /// User-agent for photo transfer.
    pub user_agent: String,
    /// Listing-link recognition rules.
    pub link_rules: LinkRules,
}

impl CrawlConfig {
    pub fn new(entry_url: impl Into<String>) -> Self {
        Self {
            entry_url: entry_url.into(),
            strategy: Strategy::Paged,
            settle_delay: Duration::from_millis(300),
            page_load_wait: Duration::from_millis(1500),
            max_pages: 300,
            max_scrolls: 300,
            max_photos_per_listing: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36"
                .to_string(),
            link_rules: LinkRules::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_page_load_wait(mut self, wait: Duration) -> Self {
        self.page_load_wait = wait;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_max_scrolls(mut self, max_scrolls: u32) -> Self {
        self.max_scrolls = max_scrolls;
        self
    }

    pub fn with_max_photos_per_listing(mut self, max: usize) -> Self {
        self.max_photos_per_listing = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_link_rules(mut self, link_rules: LinkRules) -> Self {
        self.link_rules = link_rules;
        self
    }
}
