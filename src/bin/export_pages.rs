//! export-pages: write stored page bodies to files
//!
//! Usage: `export-pages [--config FILE] <DIR> <ID>...`
//!
//! Every ID must name a stored page; the body is written to
//! `<DIR>/<slug of the URL>`. Exits with status 1 on bad arguments, a
//! missing directory or an unknown ID.

use anyhow::Context;
use cached_crawl::config::load_config;
use cached_crawl::export::export_page;
use cached_crawl::storage::{SqliteStorage, StorageError};
use cached_crawl::CrawlError;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "export-pages")]
#[command(version)]
#[command(about = "Write stored page bodies to files named after their URL", long_about = None)]
struct Cli {
    /// Crawl configuration naming the database
    #[arg(long, value_name = "FILE", default_value = "crawl.toml")]
    config: PathBuf,

    /// Existing directory to write files into
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// IDs of the stored pages to export
    #[arg(value_name = "ID", required = true)]
    ids: Vec<i64>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cached_crawl=info,export_pages=info,warn")),
        )
        .with_target(false)
        .init();

    if !cli.dir.is_dir() {
        eprintln!("The first argument must be a path to a directory that exists.");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(CrawlError::Storage(StorageError::RecordNotFound(id))) =
                e.downcast_ref::<CrawlError>()
            {
                eprintln!("ERROR: id {} does not correspond to a stored page!", id);
            } else {
                eprintln!("ERROR: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    tracing::info!("Opening database {}", config.database.path);
    let storage = SqliteStorage::open_read_only(
        Path::new(&config.database.path),
        Duration::from_millis(config.database.busy_timeout_ms),
    )
    .with_context(|| format!("opening database {}", config.database.path))?;

    for &id in &cli.ids {
        export_page(&storage, &cli.dir, id)?;
    }

    Ok(())
}
