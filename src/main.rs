//! Listing Harvester main entry point
//!
//! This is the command-line interface for the Listing Harvester pipeline.

use anyhow::Context;
use clap::Parser;
use listing_harvester::config::{load_config, Config};
use listing_harvester::frontier::{generate_seeds, seeds_per_city};
use listing_harvester::ingest::{start_ingestion, IngestContext, StartOutcome};
use listing_harvester::storage::City;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Listing Harvester: a resumable property listing ingestion pipeline
///
/// Discovers listings for every configured city, purpose and category,
/// captures each listing page and extracts structured attributes into
/// SQLite. Without a config file, BASE_URL and CITY_NAMES are read from the
/// environment (a .env file is honoured).
#[derive(Parser, Debug)]
#[command(name = "listing-harvester")]
#[command(version)]
#[command(about = "A resumable property listing ingestion pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the seed search space without fetching
    #[arg(long, conflicts_with_all = ["stats", "list", "serve"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list", "serve"])]
    stats: bool,

    /// Print one page of discovered listing URLs and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "serve"])]
    list: bool,

    /// Page to print with --list (1-based)
    #[arg(long, requires = "list")]
    page: Option<u64>,

    /// Page size for --list
    #[arg(long, requires = "list")]
    limit: Option<u64>,

    /// Serve the HTTP API instead of running once
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "list"])]
    serve: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            tracing::info!("Loading configuration from the environment");
            Config::from_env().context("loading configuration from the environment")?
        }
    };
    tracing::info!("Configuration loaded (hash: {})", config.fingerprint());

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(config)?;
    } else if cli.list {
        handle_list(config, cli.page, cli.limit)?;
    } else if cli.serve {
        handle_serve(config).await?;
    } else {
        handle_ingest(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvester=info,warn"),
            1 => EnvFilter::new("listing_harvester=debug,info"),
            2 => EnvFilter::new("listing_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the configuration and the seed URLs
fn handle_dry_run(config: &Config) {
    println!("=== Listing Harvester Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.source.base_url);
    let names = config.source.city_names();
    println!("  Cities ({}): {}", names.len(), names.join(", "));

    println!("\nCrawler Configuration:");
    println!("  Page concurrency: {}", config.crawler.page_concurrency);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!(
        "  Transaction timeout: {}s",
        config.crawler.transaction_timeout_secs
    );
    println!(
        "  Max consecutive commit failures: {}",
        config.crawler.max_commit_failures
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    // Placeholder IDs; real ones are assigned when cities are stored
    let cities: Vec<City> = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| City {
            id: i as i64 + 1,
            name,
        })
        .collect();
    let seeds = generate_seeds(&config.source.base_url, &cities);

    println!("\nSeed URLs ({} per city):", seeds_per_city());
    for seed in &seeds {
        println!("  - [{}] {}", seed.city, seed.page_url(1));
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start ingestion with {} seed URLs", seeds.len());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: Config) -> anyhow::Result<()> {
    use listing_harvester::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let ctx = IngestContext::open(config)?;
    let stats = load_statistics(&*ctx.lock_storage()?)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --list mode: prints a page of discovered URLs
fn handle_list(config: Config, page: Option<u64>, limit: Option<u64>) -> anyhow::Result<()> {
    use listing_harvester::output::{list_urls, ListQuery};

    let ctx = IngestContext::open(config)?;
    let result = list_urls(&*ctx.lock_storage()?, ListQuery { page, limit })?;

    println!(
        "Page {} ({} per page), {} URLs total:",
        result.page, result.limit, result.total_count
    );
    for url in &result.data {
        println!("  {}", url);
    }

    Ok(())
}

/// Handles the --serve mode: runs the HTTP API
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let ctx = IngestContext::open(config)?;
    listing_harvester::api::serve(ctx, &bind)
        .await
        .with_context(|| format!("serving on {}", bind))
}

/// Handles the default mode: one ingestion, waited for in the foreground
async fn handle_ingest(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Ingesting {} cities from {}",
        config.source.city_names().len(),
        config.source.base_url
    );

    let ctx = IngestContext::open(config)?;
    match start_ingestion(ctx) {
        StartOutcome::Started(handle) => handle.await.context("ingestion task panicked")?,
        StartOutcome::AlreadyRunning => tracing::warn!("Ingestion already running"),
    }

    Ok(())
}
