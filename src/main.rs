//! Onion-Sieve main entry point
//!
//! This is the command-line interface for the Onion-Sieve address miner.

use anyhow::Context;
use clap::Parser;
use onion_sieve::config::{load_config_with_hash, Config};
use onion_sieve::crawler::{LinkExtractor, ProxyTransport, Termination, Transport};
use onion_sieve::output::{
    generate_markdown_summary, open_sink, print_summary, read_visit_log, summarize,
};
use onion_sieve::seeds::SearchEngineSeeds;
use onion_sieve::storage::{open_storage, Savestate};
use onion_sieve::{Crawler, SieveError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Onion-Sieve: a hidden-service address miner
///
/// Onion-Sieve searches for hidden services matching a keyword list, crawls
/// them through a forward proxy and records every valid Bitcoin address it
/// comes across.
#[derive(Parser, Debug)]
#[command(name = "onion-sieve")]
#[command(version)]
#[command(about = "A hidden-service address miner", long_about = None)]
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

    /// Start a fresh crawl, ignoring saved state
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the visit log and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            match e.downcast_ref::<SieveError>() {
                Some(SieveError::Seeding(_)) => ExitCode::from(2),
                _ => ExitCode::from(1),
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }
    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let termination = handle_crawl(config, &config_hash, cli.fresh).await?;
    Ok(exit_code(termination))
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("onion_sieve=info,warn"),
            1 => EnvFilter::new("onion_sieve=debug,info"),
            2 => EnvFilter::new("onion_sieve=trace,debug"),
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

fn exit_code(termination: Termination) -> ExitCode {
    match termination {
        Termination::Exhausted | Termination::PageLimit => ExitCode::SUCCESS,
        Termination::Deadline => ExitCode::from(3),
        Termination::Stopped => ExitCode::from(130),
    }
}

fn describe_limit<T: std::fmt::Display>(limit: Option<T>) -> String {
    limit.map_or_else(|| "unbounded".to_string(), |value| value.to_string())
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Onion-Sieve Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max depth: {}", describe_limit(config.crawler.max_depth));
    println!("  Max pages: {}", describe_limit(config.crawler.max_pages));
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Max pending: {}", config.crawler.max_pending);
    println!(
        "  Max runtime: {}",
        describe_limit(config.crawler.max_runtime_secs.map(|s| format!("{}s", s)))
    );

    println!("\nTransport:");
    println!(
        "  Proxy: {}",
        config.transport.proxy.as_deref().unwrap_or("none (direct)")
    );
    println!("  Timeout: {}s", config.transport.timeout_secs);
    println!("  Max body: {} bytes", config.transport.max_body_bytes);

    println!("\nScope:");
    println!("  Suffixes: {}", config.scope.suffixes.join(", "));
    println!("  Strict onion hosts: {}", config.scope.strict_onion_hosts);
    println!("  Keep query: {}", config.scope.keep_query);

    println!("\nSeeds:");
    match &config.seeds.keyword_path {
        Some(path) => println!("  Keywords: {}", path.display()),
        None => println!("  Keywords: none"),
    }
    println!("  Search URL: {}", config.seeds.search_url);
    println!("  Static URLs ({}):", config.seeds.urls.len());
    for url in &config.seeds.urls {
        println!("    * {}", url);
    }

    println!("\nOutput:");
    println!("  Visit log: {}", config.output.log_path().display());
    println!("  Summary: {}", config.output.summary_path().display());
    println!("  Savestate: {}", config.output.savestate_path().display());

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: summarizes an existing visit log
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config.output.log_path();
    println!("Visit log: {}\n", path.display());

    let results = read_visit_log(&path)
        .with_context(|| format!("Failed to read visit log {}", path.display()))?;
    let summary = summarize(&results);
    print_summary(&summary);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, fresh: bool) -> anyhow::Result<Termination> {
    if fresh {
        tracing::info!("Starting fresh crawl (ignoring saved state)");
    } else {
        tracing::info!("Starting crawl (will resume if an interrupted run exists)");
    }

    let config = Arc::new(config);

    let storage = open_storage(&config.output.savestate_path()).map_err(SieveError::from)?;
    let savestate =
        Savestate::open(Box::new(storage), config_hash, fresh).map_err(SieveError::from)?;

    let transport: Arc<dyn Transport> =
        Arc::new(ProxyTransport::new(&config.transport).map_err(SieveError::from)?);
    let links = Arc::new(LinkExtractor::from_config(&config.scope));
    let seeds = SearchEngineSeeds::new(
        Arc::clone(&transport),
        links,
        config.seeds.search_url.clone(),
    );
    let sink = open_sink(&config.output).map_err(SieveError::from)?;

    let crawler = Crawler::new(Arc::clone(&config), transport, Arc::new(seeds), sink)
        .with_savestate(savestate);

    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            stop.stop();
        }
    });

    let report = crawler.run().await?;

    let summary_path = config.output.summary_path();
    generate_markdown_summary(&report.summary, &summary_path).map_err(SieveError::from)?;
    tracing::info!("Summary written to {}", summary_path.display());

    if !report.summary.addresses.is_empty() {
        println!("Addresses:");
        for address in &report.summary.addresses {
            println!("  {}", address);
        }
        println!();
    }
    print_summary(&report.summary);

    Ok(report.termination)
}
