//! Core crawl types.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A normalized, canonicalized absolute URL identifying one listing.
///
/// Query string and fragment are stripped at construction; equality is
/// exact string equality afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingUrl(String);

impl ListingUrl {
    /// Normalize an absolute href into a listing URL. Returns `None`
    /// if the href is not a parseable absolute URL.
    pub fn normalize(href: &str) -> Option<Self> {
        let mut url = url::Url::parse(href).ok()?;
        url.set_query(None);
        url.set_fragment(None);
        Some(Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListingUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The durable set of listing URLs already processed or enqueued.
///
/// Insert-only; the single source of truth for "already handled".
pub type SeenSet = BTreeSet<ListingUrl>;

/// A candidate photo URL harvested from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhotoUrl(String);

impl PhotoUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic cache filename: first 64 bits of the SHA-256 of
    /// the URL string, hex-encoded. Stable across runs so repeated
    /// URLs resolve to the same file and are fetched at most once.
    pub fn cache_file_name(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        format!("{}.jpg", hex::encode(&digest[..8]))
    }
}

impl std::fmt::Display for PhotoUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One append-only entry in the analysis log.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub listing: ListingUrl,
    pub photos_analyzed: usize,
    pub at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn now(listing: ListingUrl, photos_analyzed: usize) -> Self {
        Self {
            listing,
            photos_analyzed,
            at: Utc::now(),
        }
    }
}

/// Emitted when the classifier flags an image. Never deduplicated:
/// multiple qualifying images in one listing produce multiple alerts.
#[derive(Debug, Clone)]
pub struct Alert {
    pub listing: ListingUrl,
    pub image_path: PathBuf,
    pub at: DateTime<Utc>,
}

impl Alert {
    pub fn now(listing: ListingUrl, image_path: PathBuf) -> Self {
        Self {
            listing,
            image_path,
            at: Utc::now(),
        }
    }
}

/// Raw attribute data for one image-like element, handed over by the
/// browser so extraction stays pure and DOM-free.
#[derive(Debug, Clone, Default)]
pub struct ImageCandidate {
    pub src: Option<String>,
    pub data_src: Option<String>,
    pub srcset: Option<String>,
    pub style: Option<String>,
}

/// Outcome of a bounded DOM wait. A timeout is not an error; the
/// caller proceeds with whatever is there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Present,
    TimedOut,
}

/// Outcome of the next-page control lookup. `NotFound` is the normal
/// end-of-catalog signal, indistinguishable from a missing control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    Activated,
    NotFound,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutcome {
    pub pages_visited: u32,
    pub listings_processed: u32,
    pub alerts: u32,
}
