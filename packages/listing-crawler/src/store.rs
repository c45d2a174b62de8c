//! Durable crawl state: the seen set, append-only analysis and alert
//! logs, and the content-addressed photo cache.
//!
//! The seen file is replaced atomically (write to a sibling temp file,
//! then rename) so a crash mid-write never corrupts the previously
//! durable state. The logs are append-only text, readable while being
//! written.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::error::StoreResult;
use crate::types::{Alert, AnalysisRecord, PhotoUrl, SeenSet};

const SEPARATOR: &str =
    "================================================================================";

/// File-backed dedup store rooted at a data directory.
#[derive(Debug, Clone)]
pub struct CrawlStore {
    seen_file: PathBuf,
    seen_text_file: PathBuf,
    analysis_file: PathBuf,
    summary_file: PathBuf,
    alerts_file: PathBuf,
    images_dir: PathBuf,
}

impl CrawlStore {
    /// Open (creating if needed) the store under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let data_dir = data_dir.as_ref();
        let images_dir = data_dir.join("images");
        fs::create_dir_all(&images_dir)?;

        let store = Self {
            seen_file: data_dir.join("seen_listings.json"),
            seen_text_file: data_dir.join("seen_listings.txt"),
            analysis_file: data_dir.join("analyzed_listings.txt"),
            summary_file: data_dir.join("analyzed_listings_summary.txt"),
            alerts_file: data_dir.join("alerts.log"),
            images_dir,
        };

        if !store.analysis_file.exists() {
            let mut file = fs::File::create(&store.analysis_file)?;
            writeln!(file, "Real-time log of analyzed listings")?;
            writeln!(file, "Format: timestamp | URL | Images: count")?;
            writeln!(file, "{SEPARATOR}")?;
            writeln!(file)?;
        }

        Ok(store)
    }

    /// Load the seen set; a missing file is an empty set.
    pub fn load_seen(&self) -> StoreResult<SeenSet> {
        if !self.seen_file.exists() {
            return Ok(SeenSet::new());
        }
        let json = fs::read_to_string(&self.seen_file)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Persist the seen set with write-new-then-replace discipline,
    /// plus a human-readable companion file.
    pub fn persist_seen(&self, seen: &SeenSet) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(seen)?;
        let tmp = self.seen_file.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.seen_file)?;

        let mut text = String::new();
        text.push_str(&format!("Total listings detected: {}\n", seen.len()));
        text.push_str(&format!("Last updated: {}\n", timestamp()));
        text.push_str(SEPARATOR);
        text.push_str("\n\n");
        for (idx, listing) in seen.iter().enumerate() {
            text.push_str(&format!("{}. {}\n", idx + 1, listing));
        }
        fs::write(&self.seen_text_file, text)?;

        debug!(count = seen.len(), "persisted seen set");
        Ok(())
    }

    /// Append one analysis record. Flushed immediately so the log is
    /// readable in real time.
    pub fn append_analysis(&self, record: &AnalysisRecord) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.analysis_file)?;
        writeln!(
            file,
            "{} | {} | Images: {}",
            record.at.to_rfc3339_opts(SecondsFormat::Micros, true),
            record.listing,
            record.photos_analyzed
        )?;
        file.flush()?;
        Ok(())
    }

    /// Append one alert.
    pub fn append_alert(&self, alert: &Alert) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.alerts_file)?;
        writeln!(
            file,
            "{} | listing: {} | image: {}",
            alert.at.to_rfc3339_opts(SecondsFormat::Micros, true),
            alert.listing,
            alert.image_path.display()
        )?;
        file.flush()?;
        Ok(())
    }

    /// Regenerate the sorted summary from the analysis log,
    /// latest-wins per listing.
    pub fn rewrite_summary(&self) -> StoreResult<()> {
        let mut per_listing: BTreeMap<String, usize> = BTreeMap::new();
        let log = fs::read_to_string(&self.analysis_file)?;
        for line in log.lines() {
            let mut parts = line.split('|');
            let (Some(_ts), Some(url), Some(count)) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            let Some(count) = count.trim().strip_prefix("Images:") else {
                continue;
            };
            if let Ok(count) = count.trim().parse::<usize>() {
                per_listing.insert(url.trim().to_string(), count);
            }
        }

        let mut text = String::new();
        text.push_str(&format!("Total analyzed listings: {}\n", per_listing.len()));
        text.push_str(&format!("Last updated: {}\n", timestamp()));
        text.push_str(SEPARATOR);
        text.push_str("\n\n");
        for (idx, (url, count)) in per_listing.iter().enumerate() {
            text.push_str(&format!("{}. {} | Images: {}\n", idx + 1, url, count));
        }
        fs::write(&self.summary_file, text)?;
        Ok(())
    }

    /// Cache path for a photo URL; the same URL always resolves to the
    /// same file.
    pub fn photo_cache_path(&self, url: &PhotoUrl) -> PathBuf {
        self.images_dir.join(url.cache_file_name())
    }

    pub fn analysis_file(&self) -> &Path {
        &self.analysis_file
    }

    pub fn alerts_file(&self) -> &Path {
        &self.alerts_file
    }

    pub fn seen_file(&self) -> &Path {
        &self.seen_file
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
