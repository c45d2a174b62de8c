//! Typed errors for crawl operations.
//!
//! Uses `thiserror` for library errors (not `anyhow`); the browser and
//! transfer variants box their sources so collaborator traits stay
//! independent of any particular WebDriver or HTTP implementation.

use thiserror::Error;

/// Errors that can occur while driving a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Browser/DOM collaborator failed
    #[error("browser error: {0}")]
    Browser(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Photo transfer failed
    #[error("photo transfer failed: {0}")]
    Transfer(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Durable state operation failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CrawlError {
    /// Wrap a browser-side error.
    pub fn browser(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Browser(source.into())
    }

    /// Wrap a transfer-side error.
    pub fn transfer(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transfer(source.into())
    }
}

/// Errors from the dedup store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Seen file is not valid JSON
    #[error("seen file corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for crawl operations.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
