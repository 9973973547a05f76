use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is recorded in the crawl summary so a report can be traced back
/// to the configuration that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
seeds = ["https://example.com/"]

[crawler]
workers = 8
rate-limit-ms = 250
timeout-secs = 15
max-depth = 3
max-pages = 100

[retry]
max-attempts = 4
initial-delay-ms = 100
max-delay-ms = 2000

[filters]
allowed-domains = ["*.example.com"]
excluded-extensions = [".pdf"]

[content-saver]
enabled = true
output-dir = "out"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.seeds.len(), 1);
        assert_eq!(config.crawler.workers, 8);
        assert_eq!(config.crawler.rate_limit_ms, 250);
        assert_eq!(config.crawler.max_depth, 3);
        assert_eq!(config.crawler.max_pages, 100);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.filters.allowed_domains, vec!["*.example.com"]);
        assert!(config.content_saver.enabled);
        assert_eq!(config.content_saver.output_dir, "out");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = parse_config(r#"seeds = ["https://example.com/"]"#).unwrap();

        assert_eq!(config.crawler.rate_limit_ms, 500);
        assert_eq!(config.crawler.timeout_secs, 30);
        assert_eq!(config.crawler.max_depth, 10);
        assert_eq!(config.crawler.max_pages, 1000);
        assert_eq!(config.http.max_redirects, 10);
        assert_eq!(config.filters.allowed_schemes, vec!["http", "https"]);
        assert!(config.filters.excluded_extensions.contains(&".pdf".to_string()));
        assert!(config.queue.normal_capacity > config.queue.low_capacity);
        assert!(config.queue.low_capacity > config.queue.high_capacity);
        assert!(config.archive.database_path.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/crawler.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
seeds = ["https://example.com/"]

[crawler]
workers = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
