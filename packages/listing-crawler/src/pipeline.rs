//! The traversal controller.
//!
//! Drives pagination or scrolling, discovers listing links per catalog
//! state, dispatches each new listing for harvesting, and persists
//! progress after every mutation.
//!
//! Dedup discipline: every discovered link is inserted into the seen
//! set and persisted *before* its listing is processed, so a crash
//! mid-listing never reprocesses a listing already marked seen. The
//! trade-off is at-most-once, not exactly-once: a listing that failed
//! to analyze stays seen and is not retried. Forward progress beats
//! completeness here.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{CrawlConfig, Strategy};
use crate::error::CrawlResult;
use crate::extract;
use crate::store::CrawlStore;
use crate::traits::{CatalogBrowser, PhotoClassifier, PhotoFetcher};
use crate::types::{Alert, AnalysisRecord, CrawlOutcome, ListingUrl, NextOutcome, SeenSet};

const INITIAL_CONTENT_WAIT: Duration = Duration::from_secs(15);
const NEXT_PAGE_CONTENT_WAIT: Duration = Duration::from_secs(8);
const CATALOG_RELOAD_WAIT: Duration = Duration::from_secs(5);
const LISTING_IMAGES_WAIT: Duration = Duration::from_secs(3);

/// The crawl pipeline, generic over its collaborators.
pub struct Crawler<B, F, C> {
    browser: B,
    fetcher: F,
    classifier: C,
    store: CrawlStore,
    config: CrawlConfig,
}

impl<B, F, C> Crawler<B, F, C>
where
    B: CatalogBrowser,
    F: PhotoFetcher,
    C: PhotoClassifier,
{
    pub fn new(browser: B, fetcher: F, classifier: C, store: CrawlStore, config: CrawlConfig) -> Self {
        Self {
            browser,
            fetcher,
            classifier,
            store,
            config,
        }
    }

    pub fn store(&self) -> &CrawlStore {
        &self.store
    }

    /// Run the crawl to exhaustion (or to the configured ceiling).
    ///
    /// The seen set is flushed after every mutation, so interrupting
    /// the process at any point loses at most the listing in flight.
    pub async fn run(&self) -> CrawlResult<CrawlOutcome> {
        let mut seen = self.store.load_seen()?;
        info!(
            seen = seen.len(),
            entry = %self.config.entry_url,
            strategy = ?self.config.strategy,
            "starting crawl"
        );

        self.browser.goto(&self.config.entry_url).await?;
        self.browser.wait_for("a", INITIAL_CONTENT_WAIT).await;

        let mut outcome = CrawlOutcome::default();
        match self.config.strategy {
            Strategy::Paged => self.run_paged(&mut seen, &mut outcome).await?,
            Strategy::Scroll => self.run_scroll(&mut seen, &mut outcome).await?,
        }

        self.store.persist_seen(&seen)?;
        info!(
            pages = outcome.pages_visited,
            listings = outcome.listings_processed,
            alerts = outcome.alerts,
            "crawl complete"
        );
        Ok(outcome)
    }

    async fn run_paged(&self, seen: &mut SeenSet, outcome: &mut CrawlOutcome) -> CrawlResult<()> {
        let mut catalog_url = self.browser.current_url().await?;

        for page in 1..=self.config.max_pages {
            outcome.pages_visited = page;
            info!(page, max_pages = self.config.max_pages, url = %catalog_url, "catalog page");

            let _ = self.browser.scroll_to_top().await;
            sleep(self.config.settle_delay).await;

            let new = self.discover_and_mark(seen).await?;
            for listing in &new {
                self.process_listing(listing, &catalog_url, seen, outcome).await;
            }

            match self.browser.activate_next_control().await {
                Ok(NextOutcome::Activated) => {
                    sleep(self.config.page_load_wait).await;
                    self.browser.wait_for("a", NEXT_PAGE_CONTENT_WAIT).await;
                    // Pagination may rewrite the catalog URL
                    match self.browser.current_url().await {
                        Ok(current) if current != catalog_url => {
                            debug!(url = %current, "catalog URL changed");
                            catalog_url = current;
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "could not read catalog URL"),
                    }
                }
                Ok(NextOutcome::NotFound) => {
                    info!("no next-page control, catalog exhausted");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "pagination activation failed, stopping");
                    break;
                }
            }
        }
        Ok(())
    }

    async fn run_scroll(&self, seen: &mut SeenSet, outcome: &mut CrawlOutcome) -> CrawlResult<()> {
        let catalog_url = self.browser.current_url().await?;

        for iteration in 1..=self.config.max_scrolls {
            outcome.pages_visited = iteration;
            info!(iteration, max_scrolls = self.config.max_scrolls, "scroll viewport");

            let new = self.discover_and_mark(seen).await?;
            if new.is_empty() {
                // Feed exhausted or lazy loading stalled; no further
                // scroll action
                info!("scroll yielded no new listings, stopping");
                break;
            }

            for listing in &new {
                self.process_listing(listing, &catalog_url, seen, outcome).await;
            }

            if let Err(e) = self.browser.scroll_to_bottom().await {
                warn!(error = %e, "scroll failed, stopping");
                break;
            }
            sleep(self.config.settle_delay).await;
        }
        Ok(())
    }

    /// Capture the current view's listing links, insert every one of
    /// them into the seen set, persist, and return only the genuinely
    /// new ones for processing.
    async fn discover_and_mark(&self, seen: &mut SeenSet) -> CrawlResult<Vec<ListingUrl>> {
        let discovered = match self.browser.anchor_hrefs().await {
            Ok(hrefs) => {
                extract::listing_links(hrefs.iter().map(String::as_str), &self.config.link_rules)
            }
            Err(e) => {
                warn!(error = %e, "link capture failed");
                BTreeSet::new()
            }
        };

        let new: Vec<ListingUrl> = discovered
            .iter()
            .filter(|l| !seen.contains(*l))
            .cloned()
            .collect();
        info!(total = discovered.len(), new = new.len(), "listings discovered");

        if !new.is_empty() {
            for listing in &discovered {
                seen.insert(listing.clone());
            }
            self.store.persist_seen(seen)?;
        }
        Ok(new)
    }

    /// Process one listing end to end. Every failure mode in here is
    /// non-fatal: it is logged, the affected photo or listing is
    /// skipped, and the crawl moves on.
    async fn process_listing(
        &self,
        listing: &ListingUrl,
        catalog_url: &str,
        seen: &SeenSet,
        outcome: &mut CrawlOutcome,
    ) {
        info!(listing = %listing, "processing listing");

        if let Err(e) = self.browser.goto(listing.as_str()).await {
            warn!(listing = %listing, error = %e, "listing navigation failed, skipping");
            self.record_analysis(listing, 0, seen);
            self.return_to_catalog(catalog_url).await;
            return;
        }
        sleep(self.config.page_load_wait).await;
        self.browser.wait_for("img", LISTING_IMAGES_WAIT).await;

        let candidates = match self.browser.image_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(listing = %listing, error = %e, "image capture failed");
                Vec::new()
            }
        };
        let photos = extract::photo_urls(&candidates);
        let total = photos.len();
        if total > self.config.max_photos_per_listing {
            debug!(
                total,
                cap = self.config.max_photos_per_listing,
                "capping photos for this listing"
            );
        }

        let mut analyzed = 0usize;
        for photo in photos.iter().take(self.config.max_photos_per_listing) {
            let path = self.store.photo_cache_path(photo);

            if !path.exists() {
                let bytes = match self.fetcher.fetch(photo.as_str()).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!(photo = %photo, error = %e, "photo fetch failed, skipping");
                        continue;
                    }
                };
                if let Err(e) = std::fs::write(&path, &bytes) {
                    warn!(path = %path.display(), error = %e, "photo cache write failed");
                    continue;
                }
            }

            match self.classifier.classify(&path) {
                Ok(true) => {
                    analyzed += 1;
                    outcome.alerts += 1;
                    warn!(
                        listing = %listing,
                        image = %path.display(),
                        "ALERT: possible purple duck found"
                    );
                    let alert = Alert::now(listing.clone(), path.clone());
                    if let Err(e) = self.store.append_alert(&alert) {
                        warn!(error = %e, "alert append failed");
                    }
                }
                Ok(false) => analyzed += 1,
                Err(e) => {
                    // Undecodable image: treated as a negative
                    debug!(image = %path.display(), error = %e, "classification failed, skipping");
                }
            }
        }

        info!(listing = %listing, analyzed, total, "listing analyzed");
        self.record_analysis(listing, analyzed, seen);
        outcome.listings_processed += 1;

        self.return_to_catalog(catalog_url).await;
        sleep(self.config.settle_delay).await;
    }

    fn record_analysis(&self, listing: &ListingUrl, analyzed: usize, seen: &SeenSet) {
        let record = AnalysisRecord::now(listing.clone(), analyzed);
        if let Err(e) = self.store.append_analysis(&record) {
            warn!(error = %e, "analysis append failed");
        }
        if let Err(e) = self.store.rewrite_summary() {
            warn!(error = %e, "summary rewrite failed");
        }
        if let Err(e) = self.store.persist_seen(seen) {
            warn!(error = %e, "seen set persist failed");
        }
    }

    async fn return_to_catalog(&self, catalog_url: &str) {
        if let Err(e) = self.browser.goto(catalog_url).await {
            warn!(error = %e, "return to catalog failed");
            return;
        }
        self.browser.wait_for("a", CATALOG_RELOAD_WAIT).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkRules;
    use crate::error::CrawlError;
    use crate::traits::{CatalogBrowser, PhotoClassifier, PhotoFetcher};
    use crate::types::{ImageCandidate, WaitOutcome};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const CATALOG: &str = "https://example.com/en/properties~for-sale";

    fn listing(n: u32) -> ListingUrl {
        ListingUrl::normalize(&format!("https://example.com/en/property/{n}")).unwrap()
    }

    /// Single catalog page serving a fixed set of listing links; each
    /// listing page serves the photo URLs it was configured with.
    struct MockBrowser {
        catalog_hrefs: Vec<String>,
        listing_photos: Vec<(String, Vec<String>)>,
        current: Mutex<String>,
        scrolls_to_bottom: AtomicUsize,
        next_activations: AtomicUsize,
    }

    impl MockBrowser {
        fn new(catalog_hrefs: Vec<String>, listing_photos: Vec<(String, Vec<String>)>) -> Self {
            Self {
                catalog_hrefs,
                listing_photos,
                current: Mutex::new(String::new()),
                scrolls_to_bottom: AtomicUsize::new(0),
                next_activations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogBrowser for MockBrowser {
        async fn goto(&self, url: &str) -> CrawlResult<()> {
            *self.current.lock().unwrap() = url.to_string();
            Ok(())
        }

        async fn current_url(&self) -> CrawlResult<String> {
            Ok(self.current.lock().unwrap().clone())
        }

        async fn wait_for(&self, _css: &str, _timeout: Duration) -> WaitOutcome {
            WaitOutcome::Present
        }

        async fn anchor_hrefs(&self) -> CrawlResult<Vec<String>> {
            let current = self.current.lock().unwrap().clone();
            if current == CATALOG {
                Ok(self.catalog_hrefs.clone())
            } else {
                Ok(Vec::new())
            }
        }

        async fn image_candidates(&self) -> CrawlResult<Vec<ImageCandidate>> {
            let current = self.current.lock().unwrap().clone();
            let photos = self
                .listing_photos
                .iter()
                .find(|(url, _)| *url == current)
                .map(|(_, photos)| photos.clone())
                .unwrap_or_default();
            Ok(photos
                .into_iter()
                .map(|src| ImageCandidate {
                    src: Some(src),
                    ..Default::default()
                })
                .collect())
        }

        async fn activate_next_control(&self) -> CrawlResult<NextOutcome> {
            self.next_activations.fetch_add(1, Ordering::SeqCst);
            Ok(NextOutcome::NotFound)
        }

        async fn scroll_to_top(&self) -> CrawlResult<()> {
            Ok(())
        }

        async fn scroll_to_bottom(&self) -> CrawlResult<()> {
            self.scrolls_to_bottom.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) -> CrawlResult<()> {
            Ok(())
        }
    }

    /// Serves a 1x1 PNG for every URL and counts transfers.
    struct MockFetcher {
        calls: AtomicUsize,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PhotoFetcher for MockFetcher {
        async fn fetch(&self, _url: &str) -> CrawlResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // The classifier is mocked, so the content only needs to
            // be writable
            Ok(b"not-a-real-photo".to_vec())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PhotoFetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> CrawlResult<Vec<u8>> {
            Err(CrawlError::transfer(format!("unreachable: {url}")))
        }
    }

    /// Flags everything.
    struct AlwaysPositive;

    impl PhotoClassifier for AlwaysPositive {
        fn classify(&self, _path: &Path) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            Ok(true)
        }
    }

    struct AlwaysNegative;

    impl PhotoClassifier for AlwaysNegative {
        fn classify(&self, _path: &Path) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            Ok(false)
        }
    }

    fn test_config() -> CrawlConfig {
        CrawlConfig::new(CATALOG)
            .with_settle_delay(Duration::from_millis(0))
            .with_page_load_wait(Duration::from_millis(0))
            .with_link_rules(LinkRules::default())
    }

    #[tokio::test]
    async fn test_paged_step_skips_already_seen_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrawlStore::open(dir.path()).unwrap();

        // Listing 1 was processed in an earlier run
        let mut prior = SeenSet::new();
        prior.insert(listing(1));
        store.persist_seen(&prior).unwrap();

        let browser = MockBrowser::new(
            vec![
                format!("{}?page=1", listing(1)),
                listing(2).to_string(),
                listing(3).to_string(),
            ],
            vec![
                (listing(2).to_string(), vec!["https://cdn.example.com/2.jpg".to_string()]),
                (listing(3).to_string(), vec!["https://cdn.example.com/3.jpg".to_string()]),
            ],
        );
        let fetcher = MockFetcher::new();
        let crawler = Crawler::new(browser, fetcher, AlwaysNegative, store.clone(), test_config());

        let outcome = crawler.run().await.unwrap();
        assert_eq!(outcome.listings_processed, 2);
        assert_eq!(outcome.alerts, 0);
        // The single page's NotFound ended the crawl after one lookup
        assert_eq!(crawler.browser.next_activations.load(Ordering::SeqCst), 1);

        // Seen set is the union of prior and everything discovered
        let seen = store.load_seen().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.contains(&listing(1)));
        assert!(seen.contains(&listing(2)));
        assert!(seen.contains(&listing(3)));

        // Exactly two analysis records were written
        let log = std::fs::read_to_string(store.analysis_file()).unwrap();
        let records = log.lines().filter(|l| l.contains("Images:") && l.contains("https")).count();
        assert_eq!(records, 2);
    }

    #[tokio::test]
    async fn test_identical_photo_url_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrawlStore::open(dir.path()).unwrap();

        // Both listings reference the same photo URL
        let shared = "https://cdn.example.com/shared_photo.jpg".to_string();
        let browser = MockBrowser::new(
            vec![listing(1).to_string(), listing(2).to_string()],
            vec![
                (listing(1).to_string(), vec![shared.clone()]),
                (listing(2).to_string(), vec![shared.clone()]),
            ],
        );
        let fetcher = MockFetcher::new();
        let crawler = Crawler::new(browser, fetcher, AlwaysNegative, store.clone(), test_config());

        let outcome = crawler.run().await.unwrap();
        assert_eq!(outcome.listings_processed, 2);
        assert_eq!(crawler.fetcher.calls.load(Ordering::SeqCst), 1);

        // Both listings still count the cached photo as analyzed
        let log = std::fs::read_to_string(store.analysis_file()).unwrap();
        assert_eq!(log.lines().filter(|l| l.contains("Images: 1")).count(), 2);
    }

    #[tokio::test]
    async fn test_positive_classification_emits_alert() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrawlStore::open(dir.path()).unwrap();

        let browser = MockBrowser::new(
            vec![listing(1).to_string()],
            vec![(
                listing(1).to_string(),
                vec!["https://cdn.example.com/duck.jpg".to_string()],
            )],
        );
        let crawler = Crawler::new(
            browser,
            MockFetcher::new(),
            AlwaysPositive,
            store.clone(),
            test_config(),
        );

        let outcome = crawler.run().await.unwrap();
        assert_eq!(outcome.alerts, 1);

        let alerts = std::fs::read_to_string(store.alerts_file()).unwrap();
        assert!(alerts.contains("listing: https://example.com/en/property/1"));
    }

    #[tokio::test]
    async fn test_fetch_failure_is_nonfatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrawlStore::open(dir.path()).unwrap();

        let browser = MockBrowser::new(
            vec![listing(1).to_string()],
            vec![(
                listing(1).to_string(),
                vec!["https://cdn.example.com/gone.jpg".to_string()],
            )],
        );
        let crawler = Crawler::new(browser, FailingFetcher, AlwaysPositive, store.clone(), test_config());

        let outcome = crawler.run().await.unwrap();
        // Listing completes with zero analyzed photos and no alert
        assert_eq!(outcome.listings_processed, 1);
        assert_eq!(outcome.alerts, 0);

        let log = std::fs::read_to_string(store.analysis_file()).unwrap();
        assert!(log.contains("Images: 0"));
    }

    #[tokio::test]
    async fn test_scroll_terminates_without_scrolling_when_nothing_new() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrawlStore::open(dir.path()).unwrap();

        // Everything on the feed is already seen
        let mut prior = SeenSet::new();
        prior.insert(listing(1));
        prior.insert(listing(2));
        store.persist_seen(&prior).unwrap();

        let browser = MockBrowser::new(
            vec![listing(1).to_string(), listing(2).to_string()],
            vec![],
        );
        let crawler = Crawler::new(
            browser,
            MockFetcher::new(),
            AlwaysNegative,
            store.clone(),
            test_config().with_strategy(Strategy::Scroll),
        );

        let outcome = crawler.run().await.unwrap();
        assert_eq!(outcome.listings_processed, 0);
        // Termination happened before any scroll action
        assert_eq!(crawler.browser.scrolls_to_bottom.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scroll_processes_new_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let store = CrawlStore::open(dir.path()).unwrap();

        let browser = MockBrowser::new(
            vec![listing(1).to_string()],
            vec![(
                listing(1).to_string(),
                vec!["https://cdn.example.com/1.jpg".to_string()],
            )],
        );
        let crawler = Crawler::new(
            browser,
            MockFetcher::new(),
            AlwaysNegative,
            store.clone(),
            test_config().with_strategy(Strategy::Scroll),
        );

        let outcome = crawler.run().await.unwrap();
        // Iteration 1 processes the listing and scrolls; iteration 2
        // finds nothing new and stops
        assert_eq!(outcome.listings_processed, 1);
        assert_eq!(crawler.browser.scrolls_to_bottom.load(Ordering::SeqCst), 1);
    }
}
