//! Catalog Crawler main entry point
//!
//! This is the command-line interface for the catalog crawler.

use catalog_crawler::catalog::CategoryId;
use catalog_crawler::config::{load_config_with_hash, Config, SinkKind};
use catalog_crawler::crawler::{listing_url, Coordinator, CrawlSummary};
use catalog_crawler::output::{
    load_statistics, print_statistics, print_summary, JsonLinesSink, RunStatus, Sink, SqliteSink,
};
use catalog_crawler::state::PageCursor;
use catalog_crawler::CrawlError;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Catalog Crawler: a paginated catalog harvester
///
/// Walks every listing page of the given categories, fetches the detail of
/// each listed item and writes one normalized record per item.
#[derive(Parser, Debug)]
#[command(name = "catalog-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A paginated catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Categories to crawl instead of the configured ones
    #[arg(value_name = "CATEGORY")]
    categories: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the SQLite output and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
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

    if !cli.categories.is_empty() {
        config.categories = cli.categories;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_crawler=info,warn"),
            1 => EnvFilter::new("catalog_crawler=debug,info"),
            2 => EnvFilter::new("catalog_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let categories = CategoryId::parse_all(config.categories.clone())?;

    println!("=== Catalog Crawler Dry Run ===\n");

    println!("API:");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Catalog URL: {}", config.api.catalog_url);
    println!("  City: {}", config.api.city);

    println!("\nCrawler Configuration:");
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Sort key: {}", config.crawler.sort_key);
    println!(
        "  Max concurrent categories: {}",
        config.crawler.max_concurrent_categories
    );
    println!(
        "  Detail workers: {}",
        config.crawler.max_concurrent_detail_fetches
    );
    println!("  Queue capacity: {}", config.crawler.queue_capacity);
    println!(
        "  Request timeout: {}ms ({} retries, {}ms apart)",
        config.crawler.per_request_timeout, config.crawler.max_retries, config.crawler.retry_delay
    );

    println!("\nOutput:");
    println!("  Kind: {:?}", config.output.kind);
    println!("  Path: {}", config.output.path);

    println!("\nCategories ({}):", categories.len());
    for category in &categories {
        let cursor = PageCursor::new(
            category.clone(),
            config.crawler.page_size,
            config.crawler.sort_key.clone(),
        );
        let url = listing_url(&config.api, &cursor)?;
        println!("  - {} ({})", category, url);
    }

    println!("\n✓ Configuration is valid");
    if categories.is_empty() {
        println!("✗ No categories to crawl");
    } else {
        println!("✓ Would start crawling {} categories", categories.len());
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.output.kind != SinkKind::Sqlite {
        return Err("statistics are only available for the sqlite output".into());
    }

    println!("Database: {}\n", config.output.path);

    let sink = SqliteSink::open(&config.output.path)?;
    let stats = load_statistics(&sink)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<(), Box<dyn std::error::Error>> {
    let categories = CategoryId::parse_all(config.categories.clone())?;
    tracing::info!(
        "Crawling {} categories into {}",
        categories.len(),
        config.output.path
    );

    let kind = config.output.kind;
    let summary = match kind {
        SinkKind::Jsonl => {
            let sink = Arc::new(JsonLinesSink::open(&config.output.path).await?);
            run_until_done(config, sink, categories).await
        }
        SinkKind::Sqlite => {
            let sink = Arc::new(SqliteSink::open(&config.output.path)?);
            let run_id = sink.begin_run(&config_hash)?;
            let result = run_until_done(config, sink.clone(), categories).await;

            let (status, written, failures) = match &result {
                Ok(s) if s.stopped => (RunStatus::Interrupted, s.records_written, s.total_failures()),
                Ok(s) => (RunStatus::Completed, s.records_written, s.total_failures()),
                Err(_) => (RunStatus::Failed, 0, 0),
            };
            sink.finish_run(run_id, status, written, failures)?;
            result
        }
    };

    match summary {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Runs the crawl, stopping gracefully on Ctrl-C
async fn run_until_done(
    config: Config,
    sink: Arc<dyn Sink>,
    categories: Vec<CategoryId>,
) -> Result<CrawlSummary, CrawlError> {
    let coordinator = Coordinator::with_http(config, sink)?;

    let stop = coordinator.stop_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight requests");
            stop.stop();
        }
    });

    coordinator.run(categories).await
}
