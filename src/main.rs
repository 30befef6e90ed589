//! Cityment main entry point
//!
//! This is the command-line interface for the Cityment archive crawler.

use anyhow::Context;
use chrono::NaiveDate;
use cityment::config::{load_config_with_hash, Config};
use cityment::crawler::{Coordinator, RunOptions};
use cityment::output::{load_statistics, print_statistics};
use cityment::range::{complete_range, map_years, months, parse_date};
use cityment::storage::open_storage;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Cityment: a date-windowed archive crawler
///
/// Cityment covers a date span of a news archive API with bounded requests,
/// shrinking each request when the API truncates its answer, and stores every
/// article in a local SQLite database.
#[derive(Parser, Debug)]
#[command(name = "cityment")]
#[command(version = "1.0.0")]
#[command(about = "A date-windowed archive crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// First date to crawl (YYYY-MM-DD), overriding the configured epoch
    #[arg(long, value_name = "DATE", value_parser = parse_since)]
    since: Option<NaiveDate>,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show the request plan without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn parse_since(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.since)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let options = RunOptions {
            since: cli.since,
            fresh: cli.fresh,
        };
        handle_crawl(config, &config_hash, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cityment=info,warn"),
            1 => EnvFilter::new("cityment=debug,info"),
            2 => EnvFilter::new("cityment=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the calendar plan
fn handle_dry_run(config: &Config, since: Option<NaiveDate>) -> anyhow::Result<()> {
    println!("=== Cityment Dry Run ===\n");

    println!("API:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!("  Page size: {}", config.api.page_size);
    println!("  Timeout: {}s", config.api.timeout_secs);
    for (key, value) in &config.api.params {
        println!("  Param {} = {}", key, value);
    }

    println!("\nCrawl:");
    println!("  Strategy: {:?}", config.crawl.strategy);
    match config.crawl.max_requests {
        Some(limit) => println!("  Max requests: {}", limit),
        None => println!("  Max requests: unlimited"),
    }

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(dir) = &config.output.archive_dir {
        println!("  Archive: {}", dir);
    }

    let target = complete_range(Some(since.unwrap_or(config.crawl.epoch)))?;
    println!("\nTarget: {} ({} days)", target, target.num_days());

    let per_year = map_years(target, |year| (year, months(year).count()));
    println!("Calendar plan ({} months):", months(target).count());
    for (year, month_count) in per_year.iter().rev() {
        println!("  {} ({} months)", year, month_count);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Without truncation: 1 adaptive request, or {} calendar-walk requests",
        months(target).count()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, options: RunOptions) -> anyhow::Result<()> {
    if options.fresh {
        tracing::info!("Starting fresh crawl (ignoring previous state)");
    } else {
        tracing::info!("Starting crawl (will resume if interrupted run exists)");
    }

    let mut coordinator = Coordinator::new(config, config_hash, options)?;
    tracing::info!(
        "Run {} covers {}",
        coordinator.run_id(),
        coordinator.target()
    );

    let cancel = coordinator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current request");
            cancel.cancel();
        }
    });

    match coordinator.run().await {
        Ok(report) => {
            tracing::info!(
                "Crawl completed successfully: {} requests, {} articles",
                report.requests,
                report.records
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
