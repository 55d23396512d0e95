//! cached-crawl main entry point
//!
//! This is the command-line interface for the credit-budgeted caching crawler.

use cached_crawl::config::{load_config_with_hash, Config};
use cached_crawl::crawler::{load_statistics, print_statistics};
use cached_crawl::storage::open_pool;
use cached_crawl::Coordinator;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// cached-crawl: crawl through a paid scraping proxy, never paying twice
///
/// Pages already in the response store are replayed instead of fetched.
/// Every network fetch spends one credit, and the crawl shuts down once the
/// credit threshold is reached.
#[derive(Parser, Debug)]
#[command(name = "cached-crawl")]
#[command(version)]
#[command(about = "A credit-budgeted crawler with a persistent response cache", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// URLs to crawl
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Read more URLs from a file, one per line (`#` starts a comment)
    #[arg(long, value_name = "FILE")]
    url_file: Option<PathBuf>,

    /// Override the configured starting credits
    #[arg(long, value_name = "N")]
    credits_used: Option<u64>,

    /// Override the configured credit threshold
    #[arg(long, value_name = "N")]
    credits_threshold: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the response store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(used) = cli.credits_used {
        config.crawler.credits_used = used;
    }
    if let Some(threshold) = cli.credits_threshold {
        config.crawler.credits_threshold = threshold;
    }

    if cli.stats {
        handle_stats(&config).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let urls = collect_urls(&cli.urls, cli.url_file.as_deref())?;

    if cli.dry_run {
        handle_dry_run(&config, &urls);
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(&config, urls).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cached_crawl=info,warn"),
            1 => EnvFilter::new("cached_crawl=debug,info"),
            2 => EnvFilter::new("cached_crawl=trace,debug"),
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

/// Gathers URLs from the command line and the optional URL file, in order
fn collect_urls(args: &[String], url_file: Option<&Path>) -> std::io::Result<Vec<String>> {
    let mut urls = args.to_vec();

    if let Some(path) = url_file {
        let contents = std::fs::read_to_string(path)?;
        urls.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    Ok(urls)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, urls: &[String]) {
    println!("=== cached-crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Concurrent requests: {}", config.crawler.concurrent_requests);
    println!(
        "  Credits: {} used of {}",
        config.crawler.credits_used, config.crawler.credits_threshold
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);

    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);

    println!("\nProxy:");
    match config.proxy.resolve() {
        Some(_) => println!(
            "  Configured (rendering {})",
            if config.proxy.renders() { "on" } else { "off" }
        ),
        None => println!("  None (direct fetches)"),
    }

    println!("\nURLs ({}):", urls.len());
    for url in urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the response store
async fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}\n", config.database.path);

    let pool = open_pool(&config.database, 1)?;
    let conn = pool.acquire().await?;
    let stats = load_statistics(&*conn)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    urls: Vec<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if urls.is_empty() {
        tracing::warn!("No URLs given; nothing to crawl");
        return Ok(ExitCode::SUCCESS);
    }
    tracing::info!("Crawling {} URLs", urls.len());

    let coordinator = Coordinator::from_config(config)?;

    let shutdown = coordinator.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; finishing in-flight requests");
            shutdown.trigger("interrupted");
        }
    });

    let stats = coordinator.run(urls).await;

    if stats.shutdown_reason.is_some() || stats.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
