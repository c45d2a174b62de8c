//! Pure link and photo extraction.
//!
//! The browser hands over raw attribute strings; everything here is a
//! pure function so the extractors can be unit-tested against fixture
//! data without a DOM. Both extractors are deliberately permissive: a
//! missed photo silently loses a detection opportunity, while an extra
//! non-photo URL is cheaply rejected at fetch time.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::LinkRules;
use crate::types::{ImageCandidate, ListingUrl, PhotoUrl};

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];
const IMAGE_KEYWORDS: [&str; 2] = ["photo", "image"];

/// Filter anchor hrefs down to the deduplicated, sorted set of listing
/// URLs. Idempotent: the same captured page yields the same set.
pub fn listing_links<'a>(
    hrefs: impl IntoIterator<Item = &'a str>,
    rules: &LinkRules,
) -> BTreeSet<ListingUrl> {
    hrefs
        .into_iter()
        .filter(|href| {
            rules.locale_segments.iter().any(|s| href.contains(s.as_str()))
                && rules.path_markers.iter().any(|m| href.contains(m.as_str()))
        })
        .filter_map(ListingUrl::normalize)
        .collect()
}

/// Collect plausible photo URLs from the raw image candidates of a
/// listing page: direct `src`, lazy-load `data-src`, responsive
/// `srcset` entries, and CSS `background-image` declarations.
pub fn photo_urls(candidates: &[ImageCandidate]) -> BTreeSet<PhotoUrl> {
    let mut urls = BTreeSet::new();

    for candidate in candidates {
        for direct in [&candidate.src, &candidate.data_src].into_iter().flatten() {
            if is_photo_url(direct) {
                urls.insert(PhotoUrl::new(direct.clone()));
            }
        }

        if let Some(srcset) = &candidate.srcset {
            for url in expand_srcset(srcset) {
                if is_photo_url(&url) {
                    urls.insert(PhotoUrl::new(url));
                }
            }
        }

        if let Some(style) = &candidate.style {
            for url in background_urls(style) {
                if is_photo_url(&url) {
                    urls.insert(PhotoUrl::new(url));
                }
            }
        }
    }

    urls
}

/// A URL qualifies if it is not an inline data URI and either carries
/// an image-file extension or a path/keyword hint.
fn is_photo_url(url: &str) -> bool {
    if url.is_empty() || url.starts_with("data:") {
        return false;
    }
    let lower = url.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || IMAGE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Take each srcset candidate URL token before its width/density
/// descriptor.
fn expand_srcset(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|entry| entry.split_whitespace().next())
        .map(|url| url.to_string())
        .collect()
}

/// Pull `url(...)` values out of an inline style declaration.
fn background_urls(style: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).unwrap());
    re.captures_iter(style)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}
