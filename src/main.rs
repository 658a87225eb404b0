//! Roster Harvest main entry point
//!
//! This is the command-line interface for the Roster Harvest scraper and API.

use clap::{Parser, Subcommand};
use roster_harvest::config::{load_config_with_hash, Config};
use roster_harvest::crawler::{self, HttpFetcher, PageFetcher};
use roster_harvest::output::{
    load_statistics, print_crawl_report, print_discovery_report, print_reset_report,
    print_statistics,
};
use roster_harvest::server;
use roster_harvest::storage::{open_storage, SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Roster Harvest: a resumable roster scraper
///
/// Discovers the two-letter shard keys of a player catalog, crawls each
/// shard's listing into SQLite at most once, and serves the rows over HTTP.
#[derive(Parser, Debug)]
#[command(name = "roster-harvest")]
#[command(version)]
#[command(about = "A resumable roster scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the catalog root and record new shard keys
    Discover,

    /// Crawl one batch of unprocessed shards
    Crawl {
        /// Maximum shards in the batch (defaults to the configured batch limit)
        #[arg(long)]
        batch_limit: Option<u32>,
    },

    /// Discover, then crawl one batch
    Run {
        /// Maximum shards in the batch (defaults to the configured batch limit)
        #[arg(long)]
        batch_limit: Option<u32>,
    },

    /// Delete every entity and mark every shard unprocessed
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },

    /// Show statistics from the database and exit
    Stats,

    /// Serve the query API
    Serve {
        /// Bind address (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Discover => handle_discover(&config).await,
        Command::Crawl { batch_limit } => {
            let limit = batch_limit.unwrap_or(config.crawler.batch_limit);
            handle_crawl(&config, limit).await
        }
        Command::Run { batch_limit } => {
            let limit = batch_limit.unwrap_or(config.crawler.batch_limit);
            handle_run(&config, limit).await
        }
        Command::Reset { yes } => handle_reset(&config, yes),
        Command::Stats => handle_stats(&config),
        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            server::serve(&config, &host, port).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("roster_harvest=info,warn"),
            1 => EnvFilter::new("roster_harvest=debug,info"),
            2 => EnvFilter::new("roster_harvest=trace,debug"),
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

fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.storage.database_path);
    tracing::debug!("Opening database {}", path.display());
    Ok(open_storage(path)?)
}

fn build_fetcher(config: &Config) -> anyhow::Result<Arc<dyn PageFetcher>> {
    Ok(Arc::new(HttpFetcher::new(&config.fetch)?))
}

/// Returns a flag that flips when Ctrl-C is received
fn shutdown_on_ctrl_c() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight shards");
            handler_flag.store(true, Ordering::SeqCst);
        }
    });
    flag
}

/// Handles the `discover` command
async fn handle_discover(config: &Config) -> anyhow::Result<()> {
    let mut storage = open_database(config)?;
    let discovery = crawler::discovery_from_config(config, build_fetcher(config)?)?;

    let report = discovery.discover(&mut storage).await?;
    print_discovery_report(&report);
    print_latest_shards(&storage)?;

    Ok(())
}

/// Handles the `crawl` command
async fn handle_crawl(config: &Config, batch_limit: u32) -> anyhow::Result<()> {
    let storage = Arc::new(Mutex::new(open_database(config)?));
    let crawler = crawler::crawler_from_config(
        config,
        storage,
        build_fetcher(config)?,
        shutdown_on_ctrl_c(),
    )?;

    match crawler.crawl(batch_limit).await {
        Ok(report) => {
            print_crawl_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles the `run` command: discovery followed by one crawl batch
async fn handle_run(config: &Config, batch_limit: u32) -> anyhow::Result<()> {
    let storage = Arc::new(Mutex::new(open_database(config)?));

    let (discovered, crawled) = crawler::harvest(
        config,
        storage,
        build_fetcher(config)?,
        batch_limit,
        shutdown_on_ctrl_c(),
    )
    .await?;

    print_discovery_report(&discovered);
    print_crawl_report(&crawled);
    Ok(())
}

/// Handles the `reset` command
fn handle_reset(config: &Config, confirmed: bool) -> anyhow::Result<()> {
    if !confirmed {
        anyhow::bail!("reset deletes every harvested entity; pass --yes to confirm");
    }

    let mut storage = open_database(config)?;
    let report = storage.reset_all()?;
    tracing::info!(
        "Reset {} shards and deleted {} entities",
        report.shards_reset,
        report.entities_deleted
    );
    print_reset_report(&report);

    Ok(())
}

/// Handles the `stats` command
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

fn print_latest_shards(storage: &dyn Storage) -> anyhow::Result<()> {
    let stats = load_statistics(storage)?;
    if stats.latest_shards.is_empty() {
        return Ok(());
    }

    println!("\nLatest shard keys:");
    for shard in &stats.latest_shards {
        println!("  - {} ({})", shard.key, shard.source_url);
    }
    Ok(())
}
