//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every value is read once at session start and treated as immutable afterwards.
//!
//! # Example
//!
//! ```no_run
//! use weft_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_workers, ArchiveConfig, BenchmarkConfig, Config, ContentSaverConfig, CrawlerConfig,
    FiltersConfig, HttpConfig, OutputConfig, QueueConfig, RetryConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
