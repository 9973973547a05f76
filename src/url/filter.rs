//! Exclusion filters for discovered links
//!
//! A rejected link is not an error: it is dropped before it reaches the
//! visited set and never counts against the page budget.

use crate::config::FiltersConfig;
use url::Url;

/// Why a URL was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Scheme,
    BlockedDomain,
    DomainNotAllowed,
    ExcludedPath,
    ExcludedExtension,
}

/// Outcome of running a URL through the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accept,
    Reject(RejectReason),
}

impl FilterVerdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Scheme, domain, path-prefix, and extension filter built from configuration
#[derive(Debug, Clone)]
pub struct UrlFilter {
    allowed_schemes: Vec<String>,
    allowed_domains: Vec<String>,
    blocked_domains: Vec<String>,
    excluded_paths: Vec<String>,
    excluded_extensions: Vec<String>,
}

impl UrlFilter {
    pub fn from_config(config: &FiltersConfig) -> Self {
        let lower = |items: &[String]| items.iter().map(|s| s.to_lowercase()).collect();
        Self {
            allowed_schemes: lower(&config.allowed_schemes),
            allowed_domains: lower(&config.allowed_domains),
            blocked_domains: lower(&config.blocked_domains),
            excluded_paths: config.excluded_paths.clone(),
            excluded_extensions: lower(&config.excluded_extensions),
        }
    }

    /// Checks a URL against every rule. Blocked domains win over allowed ones.
    pub fn check(&self, url: &Url) -> FilterVerdict {
        if !self.allowed_schemes.iter().any(|s| s == url.scheme()) {
            return FilterVerdict::Reject(RejectReason::Scheme);
        }

        let domain = match url.host_str() {
            Some(host) => host.to_lowercase(),
            None => return FilterVerdict::Reject(RejectReason::Scheme),
        };

        if self
            .blocked_domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, &domain))
        {
            return FilterVerdict::Reject(RejectReason::BlockedDomain);
        }

        if !self.allowed_domains.is_empty()
            && !self
                .allowed_domains
                .iter()
                .any(|pattern| matches_wildcard(pattern, &domain))
        {
            return FilterVerdict::Reject(RejectReason::DomainNotAllowed);
        }

        let path = url.path();
        if self
            .excluded_paths
            .iter()
            .any(|prefix| matches_path_prefix(prefix, path))
        {
            return FilterVerdict::Reject(RejectReason::ExcludedPath);
        }

        let lower_path = path.to_lowercase();
        if self
            .excluded_extensions
            .iter()
            .any(|ext| lower_path.ends_with(ext.as_str()))
        {
            return FilterVerdict::Reject(RejectReason::ExcludedExtension);
        }

        FilterVerdict::Accept
    }

    pub fn allows(&self, url: &Url) -> bool {
        self.check(url).is_accept()
    }
}

/// True when `path` is `prefix` itself or lies beneath it
///
/// Matching stops at segment boundaries: `/admin` covers `/admin` and
/// `/admin/users` but not `/administration`.
fn matches_path_prefix(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// Checks if a domain matches a pattern
///
/// "example.com" matches only itself; "*.example.com" matches the bare
/// domain and any subdomain at any depth.
///
/// ```
/// use weft_crawler::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "myexample.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
