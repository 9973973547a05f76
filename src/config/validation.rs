use crate::config::types::{Config, CrawlerConfig, FiltersConfig, QueueConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_queue_config(&config.queue)?;
    validate_filters(&config.filters)?;
    validate_seeds(&config.seeds, &config.filters)?;

    if config.benchmark.enabled && config.benchmark.interval_ms == 0 {
        return Err(ConfigError::Validation(
            "benchmark interval-ms must be > 0 when benchmarking is enabled".to_string(),
        ));
    }

    if config.content_saver.enabled && config.content_saver.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "content-saver output-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 1024 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 1024, got {}",
            config.workers
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.initial_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry initial-delay-ms ({}) cannot exceed max-delay-ms ({})",
            config.initial_delay_ms, config.max_delay_ms
        )));
    }

    Ok(())
}

/// Validates sub-queue sizing (Normal must dominate, High is the smallest tier)
fn validate_queue_config(config: &QueueConfig) -> Result<(), ConfigError> {
    if config.high_capacity == 0 || config.normal_capacity == 0 || config.low_capacity == 0 {
        return Err(ConfigError::Validation(
            "queue capacities must all be >= 1".to_string(),
        ));
    }

    if config.high_capacity >= config.normal_capacity {
        return Err(ConfigError::Validation(format!(
            "queue high-capacity ({}) must be smaller than normal-capacity ({})",
            config.high_capacity, config.normal_capacity
        )));
    }

    Ok(())
}

fn validate_filters(filters: &FiltersConfig) -> Result<(), ConfigError> {
    if filters.allowed_schemes.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-schemes cannot be empty".to_string(),
        ));
    }

    for scheme in &filters.allowed_schemes {
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::Validation(format!(
                "allowed-schemes may only contain http and https, got '{}'",
                scheme
            )));
        }
    }

    for pattern in filters
        .allowed_domains
        .iter()
        .chain(filters.blocked_domains.iter())
    {
        validate_domain_pattern(pattern)?;
    }

    for path in &filters.excluded_paths {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "excluded path '{}' must start with '/'",
                path
            )));
        }
    }

    for ext in &filters.excluded_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "excluded extension '{}' must start with '.'",
                ext
            )));
        }
    }

    Ok(())
}

fn validate_seeds(seeds: &[String], filters: &FiltersConfig) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if !filters.allowed_schemes.iter().any(|s| s == url.scheme()) {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' uses a scheme outside allowed-schemes",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
