//! Resumable crawler for paginated/infinite-scroll listing catalogs.
//!
//! The crawler discovers listing pages, visits each newly-discovered
//! listing exactly once, harvests candidate photo URLs, downloads
//! each photo into a content-addressed cache, and runs the blob
//! classifier from the `detection` crate over the result. Progress is
//! persisted after every mutation so a crashed or interrupted run
//! resumes without reprocessing.
//!
//! Collaborators (browser session, photo transfer, classification) sit
//! behind traits so the traversal logic is testable without a live
//! WebDriver session.

pub mod browser;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod pipeline;
pub mod store;
pub mod traits;
pub mod types;

pub use browser::WebDriverBrowser;
pub use classifier::BlobClassifier;
pub use config::{CrawlConfig, LinkRules, Strategy};
pub use error::{CrawlError, CrawlResult, StoreError, StoreResult};
pub use fetcher::HttpPhotoFetcher;
pub use pipeline::Crawler;
pub use store::CrawlStore;
pub use traits::{CatalogBrowser, PhotoClassifier, PhotoFetcher};
pub use types::{
    Alert, AnalysisRecord, CrawlOutcome, ImageCandidate, ListingUrl, NextOutcome, PhotoUrl,
    SeenSet, WaitOutcome,
};
