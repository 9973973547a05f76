//! URL handling module
//!
//! This module provides URL normalization, host extraction, exclusion
//! filtering, and the priority classification policy applied to discovered
//! links before they enter the frontier.

mod filter;
mod host;
mod normalize;

use crate::crawler::Priority;
use url::Url;

// Re-export main functions
pub use filter::{matches_wildcard, FilterVerdict, RejectReason, UrlFilter};
pub use host::{extract_domain, extract_host};
pub use normalize::normalize_url;

/// First path segments that mark a site entry page
const HIGH_PRIORITY_PAGES: &[&str] = &["index", "home", "about"];

/// Path segments that mark archive, tag, and category listings
const LOW_PRIORITY_SEGMENTS: &[&str] = &[
    "archive",
    "archives",
    "tag",
    "tags",
    "category",
    "categories",
];

/// Classifies a URL into a frontier priority tier
///
/// - `/`, `/index`, `/home`, `/about` (with or without an extension such as
///   `.html`) are [`Priority::High`]
/// - any path with an archive, tag, or category segment is [`Priority::Low`]
/// - everything else is [`Priority::Normal`]
///
/// # Examples
///
/// ```
/// use url::Url;
/// use weft_crawler::crawler::Priority;
/// use weft_crawler::url::classify_priority;
///
/// let url = Url::parse("https://example.com/about").unwrap();
/// assert_eq!(classify_priority(&url), Priority::High);
///
/// let url = Url::parse("https://example.com/tag/rust").unwrap();
/// assert_eq!(classify_priority(&url), Priority::Low);
/// ```
pub fn classify_priority(url: &Url) -> Priority {
    let path = url.path().to_lowercase();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [] => return Priority::High,
        [only] => {
            let stem = only.split('.').next().unwrap_or(only);
            if HIGH_PRIORITY_PAGES.contains(&stem) {
                return Priority::High;
            }
        }
        _ => {}
    }

    if segments
        .iter()
        .any(|segment| LOW_PRIORITY_SEGMENTS.contains(segment))
    {
        return Priority::Low;
    }

    Priority::Normal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(s: &str) -> Priority {
        classify_priority(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_entry_pages_are_high() {
        assert_eq!(classify("https://example.com/"), Priority::High);
        assert_eq!(classify("https://example.com/index"), Priority::High);
        assert_eq!(classify("https://example.com/index.html"), Priority::High);
        assert_eq!(classify("https://example.com/home"), Priority::High);
        assert_eq!(classify("https://example.com/About"), Priority::High);
    }

    #[test]
    fn test_listings_are_low() {
        assert_eq!(classify("https://example.com/archive/2021"), Priority::Low);
        assert_eq!(classify("https://example.com/blog/tag/rust"), Priority::Low);
        assert_eq!(classify("https://example.com/category/news"), Priority::Low);
        assert_eq!(classify("https://example.com/tags"), Priority::Low);
    }

    #[test]
    fn test_content_pages_are_normal() {
        assert_eq!(classify("https://example.com/blog/post-1"), Priority::Normal);
        assert_eq!(classify("https://example.com/about/team"), Priority::Normal);
        assert_eq!(classify("https://example.com/homepage-redesign"), Priority::Normal);
    }
}
