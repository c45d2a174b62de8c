//! WebDriver-backed implementation of the browser collaborator.
//!
//! The next-page lookup is a ranked-fallback chain because the target
//! site's markup is not under our control: known pagination containers
//! are searched first, then a list of generic selectors from most to
//! least specific. Failure to find a control is indistinguishable from
//! true end-of-catalog and is reported as `NextOutcome::NotFound`.

use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::prelude::*;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{CrawlError, CrawlResult};
use crate::traits::CatalogBrowser;
use crate::types::{ImageCandidate, NextOutcome, WaitOutcome};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const PRE_CLICK_SETTLE: Duration = Duration::from_millis(500);

const PAGINATION_CONTAINERS: [&str; 5] = [
    ".pagination",
    "[class*='pagination']",
    "[class*='Pagination']",
    "nav[aria-label*='pagination']",
    "nav[aria-label*='Pagination']",
];

/// Generic next-control selectors, most to least specific. Text and
/// aria-label matches first, then class-name and icon heuristics.
fn next_control_selectors() -> Vec<By> {
    vec![
        By::XPath(
            "//a[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
             'abcdefghijklmnopqrstuvwxyz'), 'next')]",
        ),
        By::XPath(
            "//button[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', \
             'abcdefghijklmnopqrstuvwxyz'), 'next')]",
        ),
        By::XPath("//a[contains(text(), 'Suivant')]"),
        By::XPath("//button[contains(text(), 'Suivant')]"),
        By::Css("a[aria-label*='Next'], a[aria-label*='next']"),
        By::Css("button[aria-label*='Next'], button[aria-label*='next']"),
        By::Css("a.next, button.next, .next"),
        By::Css("[class*='next'], [class*='Next']"),
        By::Css("a[class*='arrow-right'], button[class*='arrow-right']"),
        By::Css(".pagination a:last-child, .pagination button:last-child"),
        By::Css("[class*='pagination'] a:last-child"),
        By::Css("[data-testid*='next'], [id*='next']"),
        By::Css("i[class*='arrow-right'], span[class*='arrow-right']"),
    ]
}

/// `CatalogBrowser` over a thirtyfour WebDriver session.
///
/// Individual element reads tolerate staleness: an element that goes
/// away between query and attribute read is simply skipped.
#[derive(Clone)]
pub struct WebDriverBrowser {
    driver: WebDriver,
}

impl WebDriverBrowser {
    pub fn new(driver: WebDriver) -> Self {
        Self { driver }
    }

    async fn execute(&self, script: &str, args: Vec<serde_json::Value>) -> CrawlResult<()> {
        self.driver
            .execute(script, args)
            .await
            .map_err(CrawlError::browser)?;
        Ok(())
    }

    /// Visible, enabled, and not marked disabled in any of the usual
    /// ways.
    async fn is_usable(&self, elem: &WebElement) -> bool {
        if !elem.is_displayed().await.unwrap_or(false) {
            return false;
        }
        if !elem.is_enabled().await.unwrap_or(false) {
            return false;
        }
        if elem.attr("disabled").await.unwrap_or(None).is_some() {
            return false;
        }
        if elem.attr("aria-disabled").await.unwrap_or(None).as_deref() == Some("true") {
            return false;
        }
        let class = elem.attr("class").await.unwrap_or(None).unwrap_or_default();
        !class.to_ascii_lowercase().contains("disabled")
    }

    /// Does this container child look like a next-page control?
    async fn looks_like_next(&self, elem: &WebElement) -> bool {
        let text = elem.text().await.unwrap_or_default().to_ascii_lowercase();
        let aria = elem
            .attr("aria-label")
            .await
            .unwrap_or(None)
            .unwrap_or_default()
            .to_ascii_lowercase();
        let class = elem
            .attr("class")
            .await
            .unwrap_or(None)
            .unwrap_or_default()
            .to_ascii_lowercase();

        text.contains("next")
            || text.contains("suivant")
            || aria.contains("next")
            || class.contains("next")
            || class.contains("arrow")
    }

    /// Scroll into view, then a direct click with a programmatic
    /// fallback for elements that reject interaction.
    async fn try_activate(&self, elem: &WebElement) -> bool {
        let _ = elem.scroll_into_view().await;
        sleep(PRE_CLICK_SETTLE).await;

        if elem.click().await.is_ok() {
            return true;
        }
        let Ok(elem_json) = elem.to_json() else {
            return false;
        };
        self.driver
            .execute("arguments[0].click();", vec![elem_json])
            .await
            .is_ok()
    }
}

#[async_trait]
impl CatalogBrowser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> CrawlResult<()> {
        self.driver.goto(url).await.map_err(CrawlError::browser)
    }

    async fn current_url(&self) -> CrawlResult<String> {
        Ok(self
            .driver
            .current_url()
            .await
            .map_err(CrawlError::browser)?
            .to_string())
    }

    async fn wait_for(&self, css: &str, timeout: Duration) -> WaitOutcome {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.driver.find(By::Css(css)).await.is_ok() {
                return WaitOutcome::Present;
            }
            if tokio::time::Instant::now() >= deadline {
                debug!(selector = css, "wait timed out, proceeding anyway");
                return WaitOutcome::TimedOut;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn anchor_hrefs(&self) -> CrawlResult<Vec<String>> {
        let elements = self
            .driver
            .find_all(By::Tag("a"))
            .await
            .map_err(CrawlError::browser)?;

        let mut hrefs = Vec::with_capacity(elements.len());
        for elem in elements {
            // Stale elements between query and read are skipped
            if let Ok(Some(href)) = elem.attr("href").await {
                hrefs.push(href);
            }
        }
        Ok(hrefs)
    }

    async fn image_candidates(&self) -> CrawlResult<Vec<ImageCandidate>> {
        let mut candidates = Vec::new();

        let images = self
            .driver
            .find_all(By::Tag("img"))
            .await
            .map_err(CrawlError::browser)?;
        for img in images {
            candidates.push(ImageCandidate {
                src: img.attr("src").await.unwrap_or(None),
                data_src: img.attr("data-src").await.unwrap_or(None),
                srcset: img.attr("srcset").await.unwrap_or(None),
                style: None,
            });
        }

        let styled = self
            .driver
            .find_all(By::Css("div[style*='background-image']"))
            .await
            .unwrap_or_default();
        for div in styled {
            if let Ok(Some(style)) = div.attr("style").await {
                candidates.push(ImageCandidate {
                    style: Some(style),
                    ..Default::default()
                });
            }
        }

        Ok(candidates)
    }

    async fn activate_next_control(&self) -> CrawlResult<NextOutcome> {
        // The control usually sits at the bottom of the results
        let _ = self.scroll_to_bottom().await;
        sleep(PRE_CLICK_SETTLE).await;

        for container_selector in PAGINATION_CONTAINERS {
            let containers = match self.driver.find_all(By::Css(container_selector)).await {
                Ok(containers) => containers,
                Err(_) => continue,
            };
            for container in containers {
                let mut children = container.find_all(By::Tag("a")).await.unwrap_or_default();
                children.extend(container.find_all(By::Tag("button")).await.unwrap_or_default());

                for elem in children {
                    if self.looks_like_next(&elem).await
                        && self.is_usable(&elem).await
                        && self.try_activate(&elem).await
                    {
                        debug!(container = container_selector, "next control activated");
                        return Ok(NextOutcome::Activated);
                    }
                }
            }
        }

        for selector in next_control_selectors() {
            let elements = match self.driver.find_all(selector.clone()).await {
                Ok(elements) => elements,
                Err(_) => continue,
            };
            for elem in elements {
                if self.is_usable(&elem).await && self.try_activate(&elem).await {
                    debug!(selector = ?selector, "next control activated via fallback");
                    return Ok(NextOutcome::Activated);
                }
            }
        }

        warn!("no usable next-page control found");
        Ok(NextOutcome::NotFound)
    }

    async fn scroll_to_top(&self) -> CrawlResult<()> {
        self.execute("window.scrollTo(0, 0);", vec![]).await
    }

    async fn scroll_to_bottom(&self) -> CrawlResult<()> {
        self.execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await
    }

    async fn close(&self) -> CrawlResult<()> {
        self.driver
            .clone()
            .quit()
            .await
            .map_err(CrawlError::browser)
    }
}
