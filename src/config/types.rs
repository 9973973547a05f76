use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Seed URLs the crawl starts from (depth 0)
    #[serde(default)]
    pub seeds: Vec<String>,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default, rename = "content-saver")]
    pub content_saver: ContentSaverConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "rate-limit-ms")]
    pub rate_limit_ms: u64,

    /// Overall per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Maximum depth to crawl from seed URLs
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of successfully fetched pages (0 means unlimited)
    #[serde(rename = "max-pages")]
    pub max_pages: u64,
}

impl CrawlerConfig {
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            rate_limit_ms: 500,
            timeout_secs: 30,
            max_depth: 10,
            max_pages: 1000,
        }
    }
}

/// Workers are I/O bound, so the pool is a small multiple of the core count.
pub fn default_workers() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores * 4).clamp(1, 256)
}

/// Retry/backoff configuration for transient fetch failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per job, including the first one
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    #[serde(rename = "initial-delay-ms")]
    pub initial_delay_ms: u64,

    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Maximum redirect hops before a fetch fails
    #[serde(rename = "max-redirects")]
    pub max_redirects: usize,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Upper bound on idle pooled connections kept per host
    #[serde(rename = "pool-max-idle-per-host")]
    pub pool_max_idle_per_host: usize,

    /// Idle pooled connections are evicted after this long
    #[serde(rename = "pool-idle-timeout-secs")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("weft-crawler/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 8,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Frontier sub-queue capacities
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    #[serde(rename = "high-capacity")]
    pub high_capacity: usize,

    #[serde(rename = "normal-capacity")]
    pub normal_capacity: usize,

    #[serde(rename = "low-capacity")]
    pub low_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            high_capacity: 1_000,
            normal_capacity: 50_000,
            low_capacity: 10_000,
        }
    }
}

/// URL filtering rules applied to discovered links
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    #[serde(rename = "allowed-schemes")]
    pub allowed_schemes: Vec<String>,

    /// Domain patterns (e.g. "example.com" or "*.example.com"); empty allows any
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    #[serde(rename = "blocked-domains")]
    pub blocked_domains: Vec<String>,

    #[serde(rename = "excluded-paths")]
    pub excluded_paths: Vec<String>,

    #[serde(rename = "excluded-extensions")]
    pub excluded_extensions: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: vec!["http".to_string(), "https".to_string()],
            allowed_domains: vec![],
            blocked_domains: vec![],
            excluded_paths: ["/wp-admin", "/wp-login", "/wp-content", "/admin", "/login"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_extensions: [
                ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".tar", ".gz", ".rar", ".exe",
                ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Raw content saving configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentSaverConfig {
    pub enabled: bool,

    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Pages larger than this many bytes are skipped (0 means no ceiling)
    #[serde(rename = "max-file-size")]
    pub max_file_size: u64,

    #[serde(rename = "save-metadata")]
    pub save_metadata: bool,
}

impl Default for ContentSaverConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: "crawled_content".to_string(),
            max_file_size: 5 * 1024 * 1024,
            save_metadata: true,
        }
    }
}

/// Archive sink configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Path to the SQLite archive; no archive is attached when absent
    #[serde(rename = "database-path")]
    pub database_path: Option<String>,
}

/// Benchmark sampling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub enabled: bool,

    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1_000,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,
}
