//! Weft crawler main entry point
//!
//! This is the command-line interface for the Weft web crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use weft_crawler::config::{load_config_with_hash, validate, Config};
use weft_crawler::crawler::CrawlSession;
use weft_crawler::output::{print_summary, write_markdown_summary};

/// Weft: a concurrent, polite web crawler
///
/// Weft crawls outward from seed URLs with a fixed pool of workers, pacing
/// requests per host and honoring depth limits and a page budget. Fetched
/// pages can be archived to SQLite and saved to disk.
#[derive(Parser, Debug)]
#[command(name = "weft-crawler")]
#[command(version)]
#[command(about = "A concurrent, polite web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Additional seed URL (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Override the page budget (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,

    /// Override the worker count
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("weft_crawler=info,warn"),
            1 => EnvFilter::new("weft_crawler=debug,info"),
            2 => EnvFilter::new("weft_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    config.seeds.extend(cli.seeds.iter().cloned());

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    validate(config).context("invalid command-line overrides")?;

    if config.seeds.is_empty() {
        bail!("no seed URLs: add `seeds` to the config or pass --seed");
    }

    Ok(())
}

/// Handles the --dry-run mode: shows what would be crawled
fn print_dry_run(config: &Config) {
    println!("=== Weft Dry Run ===\n");

    println!("Crawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Rate limit: {}ms per host", config.crawler.rate_limit_ms);
    println!("  Request timeout: {}s", config.crawler.timeout_secs);
    println!("  Max depth: {}", config.crawler.max_depth);
    match config.crawler.max_pages {
        0 => println!("  Max pages: unlimited"),
        n => println!("  Max pages: {}", n),
    }

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!(
        "  Backoff: {}ms doubling up to {}ms",
        config.retry.initial_delay_ms, config.retry.max_delay_ms
    );

    println!("\nFrontier capacity:");
    println!(
        "  High {}, Normal {}, Low {}",
        config.queue.high_capacity, config.queue.normal_capacity, config.queue.low_capacity
    );

    println!("\nSinks:");
    match &config.archive.database_path {
        Some(path) => println!("  Archive: {}", path),
        None => println!("  Archive: disabled"),
    }
    if config.content_saver.enabled {
        println!("  Content: {}", config.content_saver.output_dir);
    } else {
        println!("  Content: disabled");
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let summary_path = config.output.summary_path.clone();

    let session = CrawlSession::new(config)
        .context("failed to start crawl session")?
        .with_config_hash(config_hash);

    let shutdown = session.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    let summary = match session.run().await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_summary(&summary);

    if let Some(path) = summary_path {
        write_markdown_summary(&summary, Path::new(&path))
            .with_context(|| format!("failed to write summary to {}", path))?;
        println!("\n✓ Summary exported to: {}", path);
    }

    Ok(())
}
