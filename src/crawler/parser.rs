//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - The page title
//! - Links to follow, resolved to absolute URLs and filtered

use crate::url::UrlFilter;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All followable links found on the page, absolute and in document order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts the title and followable links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags, resolved against `<base href>` when present,
///   otherwise against the page URL
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - Fragment-only links and links that only change the fragment
/// - `<a href="..." download>`
/// - Anything the [`UrlFilter`] rejects (scheme, domain, path, extension)
///
/// Duplicate links on the same page are reported once.
///
/// # Example
///
/// ```
/// use weft_crawler::config::FiltersConfig;
/// use weft_crawler::crawler::parse_html;
/// use weft_crawler::url::UrlFilter;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let filter = UrlFilter::from_config(&FiltersConfig::default());
/// let parsed = parse_html(html, &base_url, &filter);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, page_url: &Url, filter: &UrlFilter) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let base_url = extract_base(&document, page_url);
    let links = extract_links(&document, page_url, &base_url, filter);

    ParsedPage { title, links }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| {
            element
                .text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|s| !s.is_empty())
}

/// Honors `<base href>`; falls back to the page URL
fn extract_base(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .and_then(|href| page_url.join(href.trim()).ok())
        })
        .unwrap_or_else(|| page_url.clone())
}

fn extract_links(
    document: &Html,
    page_url: &Url,
    base_url: &Url,
    filter: &UrlFilter,
) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let Some(absolute) = resolve_link(href, page_url, base_url) else {
            continue;
        };

        if !filter.allows(&absolute) {
            tracing::trace!("Filtered out {}", absolute);
            continue;
        }

        let absolute = absolute.to_string();
        if seen.insert(absolute.clone()) {
            links.push(absolute);
        }
    }

    links
}

/// Resolves a link href to an absolute URL without its fragment
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - Fragment-only links, or links pointing back at the same page
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, page_url: &Url, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    absolute.set_fragment(None);

    let mut current = page_url.clone();
    current.set_fragment(None);
    if absolute == current {
        return None;
    }

    Some(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FiltersConfig;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn parse(html: &str) -> ParsedPage {
        parse_html(html, &base_url(), &UrlFilter::from_config(&FiltersConfig::default()))
    }

    #[test]
    fn test_extract_title() {
        let parsed = parse(r#"<html><head><title>Test Page</title></head><body></body></html>"#);
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_extract_title_collapses_whitespace() {
        let parsed = parse("<html><head><title>\n  Test \n Page  </title></head></html>");
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let parsed = parse(r#"<html><head></head><body></body></html>"#);
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_extract_absolute_and_relative_links() {
        let parsed = parse(
            r#"<html><body>
                <a href="https://other.com/page">Other</a>
                <a href="/root">Root</a>
                <a href="sibling">Sibling</a>
            </body></html>"#,
        );
        assert_eq!(
            parsed.links,
            vec![
                "https://other.com/page",
                "https://example.com/root",
                "https://example.com/sibling",
            ]
        );
    }

    #[test]
    fn test_base_href_is_honored() {
        let parsed = parse(
            r#"<html><head><base href="https://cdn.example.com/docs/"></head>
            <body><a href="intro">Intro</a></body></html>"#,
        );
        assert_eq!(parsed.links, vec!["https://cdn.example.com/docs/intro"]);
    }

    #[test]
    fn test_skip_special_schemes() {
        let parsed = parse(
            r#"<html><body>
                <a href="javascript:void(0)">JS</a>
                <a href="mailto:test@example.com">Email</a>
                <a href="tel:+1234567890">Call</a>
                <a href="data:text/html,<h1>Test</h1>">Data</a>
                <a href="ftp://example.com/file">FTP</a>
            </body></html>"#,
        );
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_skip_fragment_only_and_same_page() {
        let parsed = parse(
            r##"<html><body>
                <a href="#section">Jump</a>
                <a href="/page#other">Same page</a>
                <a href="/next#part">Next</a>
            </body></html>"##,
        );
        assert_eq!(parsed.links, vec!["https://example.com/next"]);
    }

    #[test]
    fn test_skip_download_link() {
        let parsed = parse(r#"<html><body><a href="/file" download>Download</a></body></html>"#);
        assert!(parsed.links.is_empty());
    }

    #[test]
    fn test_filter_applied() {
        let parsed = parse(
            r#"<html><body>
                <a href="/report.pdf">PDF</a>
                <a href="/wp-admin/">Admin</a>
                <a href="/article">Article</a>
            </body></html>"#,
        );
        assert_eq!(parsed.links, vec!["https://example.com/article"]);
    }

    #[test]
    fn test_duplicate_links_reported_once() {
        let parsed = parse(
            r#"<html><body>
                <a href="/a">A</a>
                <a href="/a#x">A again</a>
                <a href="https://example.com/a">A absolute</a>
            </body></html>"#,
        );
        assert_eq!(parsed.links, vec!["https://example.com/a"]);
    }
}
