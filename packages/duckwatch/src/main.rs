//! Duckwatch
//!
//! Watches a property catalog for photos containing a purple duck.
//! Crawls the catalog with a WebDriver session, analyzes every listing
//! photo, and appends an alert for each qualifying image. Safe to stop
//! and restart: progress is persisted after every listing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use detection::DetectConfig;
use listing_crawler::{
    BlobClassifier, CatalogBrowser, CrawlConfig, CrawlStore, Crawler, HttpPhotoFetcher, Strategy,
    WebDriverBrowser,
};
use thirtyfour::{ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "duckwatch", about = "Purple duck detector for property listing photos")]
struct Args {
    /// Catalog entry URL to start crawling from
    #[arg(long)]
    url: String,

    /// Catalog traversal strategy
    #[arg(long, value_enum, default_value = "paged")]
    strategy: StrategyArg,

    /// Directory for crawl state, cached photos, and logs
    #[arg(long, default_value = "duckwatch-data")]
    data_dir: PathBuf,

    /// WebDriver endpoint (chromedriver)
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,

    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Hard ceiling on catalog pages
    #[arg(long, default_value_t = 300)]
    max_pages: u32,

    /// Hard ceiling on scroll iterations
    #[arg(long, default_value_t = 300)]
    max_scrolls: u32,

    /// Per-listing cap on photos analyzed
    #[arg(long, default_value_t = 15)]
    max_photos: usize,

    /// Delay in milliseconds after scroll and navigation steps
    #[arg(long, default_value_t = 300)]
    settle_ms: u64,

    /// Wait in milliseconds after page activation or listing load
    #[arg(long, default_value_t = 1500)]
    page_load_ms: u64,

    /// Minimum qualifying blob area in pixels (after downscale)
    #[arg(long, default_value_t = 1000)]
    min_blob_area: u32,

    /// Override the browser/transfer user-agent string
    #[arg(long)]
    user_agent: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Paged,
    Scroll,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Paged => Strategy::Paged,
            StrategyArg::Scroll => Strategy::Scroll,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,listing_crawler=debug,detection=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let args = Args::parse();
    tracing::info!(url = %args.url, data_dir = %args.data_dir.display(), "starting duckwatch");

    let mut config = CrawlConfig::new(&args.url)
        .with_strategy(args.strategy.into())
        .with_max_pages(args.max_pages)
        .with_max_scrolls(args.max_scrolls)
        .with_max_photos_per_listing(args.max_photos)
        .with_settle_delay(Duration::from_millis(args.settle_ms))
        .with_page_load_wait(Duration::from_millis(args.page_load_ms));
    if let Some(user_agent) = args.user_agent {
        config = config.with_user_agent(user_agent);
    }

    let store = CrawlStore::open(&args.data_dir).context("Failed to open crawl store")?;

    // A session that cannot be established is fatal; everything after
    // this point degrades per listing instead
    let mut caps = DesiredCapabilities::chrome();
    if args.headless {
        caps.add_arg("--headless=new")
            .context("Invalid Chrome argument")?;
    }
    caps.add_arg(&format!("--user-agent={}", config.user_agent))
        .context("Invalid Chrome argument")?;
    let driver = WebDriver::new(&args.webdriver_url, caps)
        .await
        .context("Failed to start WebDriver session")?;
    let browser = WebDriverBrowser::new(driver);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let fetcher = HttpPhotoFetcher::with_client(client, config.user_agent.clone());
    let classifier = BlobClassifier::new(DetectConfig::default().with_min_area(args.min_blob_area));

    let crawler = Crawler::new(browser.clone(), fetcher, classifier, store, config);

    // Progress is flushed after every listing, so on interrupt the only
    // cleanup needed is ending the browser session
    let result = tokio::select! {
        result = crawler.run() => Some(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
            None
        }
    };

    // The session is released on every exit path, including crawl
    // errors
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "browser session close failed");
    }

    if let Some(result) = result {
        let outcome = result.context("Crawl failed")?;
        tracing::info!(
            pages = outcome.pages_visited,
            listings = outcome.listings_processed,
            alerts = outcome.alerts,
            "done"
        );
    }
    Ok(())
}
