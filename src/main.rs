//! Hashtag-Harvester main entry point
//!
//! This is the command-line interface for the hashtag listing crawler.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use hashtag_harvester::config::{load_config_with_hash, validate, Config, Overrides};
use hashtag_harvester::crawler::{enrich_records, harvest};
use hashtag_harvester::output::{
    generate_markdown_summary, generate_summary, print_statistics, read_csv, write_csv,
};
use hashtag_harvester::VideoRecord;
use hashtag_harvester::url::normalize_hashtag;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Hashtag-Harvester: collects video metadata from a hashtag listing
///
/// Pages through the listing with its "Load More" control, extracts and
/// deduplicates every video card, revisits truncated descriptions on their
/// detail pages and writes the result as CSV.
#[derive(Parser, Debug)]
#[command(name = "hashtag-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Collects video metadata from a hashtag listing", long_about = None)]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Hashtag to harvest, with or without the leading '#'
    #[arg(value_name = "HASHTAG", required = true)]
    hashtag: Option<String>,

    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// CSV output path
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Maximum number of Load-More cycles
    #[arg(long, value_name = "N")]
    max_loads: Option<u32>,

    /// Minimum delay between requests to the site, in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Detail pages fetched concurrently during enrichment
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Records per enrichment batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Skip detail-page enrichment of truncated descriptions
    #[arg(long)]
    no_enrich: bool,

    /// Keep only videos posted on or after this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    start_date: Option<String>,

    /// Keep only videos posted on or before this date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    end_date: Option<String>,

    /// Proxy URL for every request
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Also write a markdown run summary to this path
    #[arg(long, value_name = "FILE")]
    summary: Option<String>,

    /// Overall time budget for the run, in seconds
    #[arg(long, value_name = "SECS")]
    time_budget: Option<u64>,

    /// Periodically save partial results to <OUTPUT>.temp while paginating
    #[arg(long)]
    incremental_save: bool,

    #[command(flatten)]
    log: LogArgs,

    /// Validate the configuration and show what would be harvested
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich the truncated descriptions of an existing CSV export
    Enrich(EnrichArgs),
}

#[derive(Args, Debug)]
struct EnrichArgs {
    /// CSV file produced by an earlier harvest
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Enriched CSV output path
    #[arg(short, long, value_name = "FILE", default_value = "data/enriched_videos.csv")]
    output: String,

    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Records per enrichment batch
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Detail pages fetched concurrently
    #[arg(long, value_name = "N", alias = "max-concurrent")]
    concurrency: Option<usize>,

    /// Minimum delay between batches, in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    #[command(flatten)]
    log: LogArgs,
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            output: self.output.clone(),
            max_loads: self.max_loads,
            delay_secs: self.delay,
            concurrency: self.concurrency,
            batch_size: self.batch_size,
            no_enrich: self.no_enrich,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            proxy: self.proxy.clone(),
            summary: self.summary.clone(),
            time_budget_secs: self.time_budget,
            incremental_save: self.incremental_save,
        }
    }
}

impl EnrichArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            output: Some(self.output.clone()),
            delay_secs: self.delay,
            concurrency: self.concurrency,
            batch_size: self.batch_size,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Enrich(args)) = &cli.command {
        setup_logging(args.log.verbose, args.log.quiet);
        let (mut config, _) = load_configuration(args.config.as_deref())?;
        args.overrides().apply(&mut config);
        validate(&config).context("invalid configuration")?;
        return handle_enrich(config, &args.input, args.log.quiet).await;
    }

    // Setup logging based on verbosity
    setup_logging(cli.log.verbose, cli.log.quiet);

    let (mut config, config_hash) = load_configuration(cli.config.as_deref())?;
    cli.overrides().apply(&mut config);
    validate(&config).context("invalid configuration")?;

    let Some(hashtag) = cli.hashtag.as_deref().and_then(normalize_hashtag) else {
        bail!("hashtag cannot be empty");
    };

    if cli.dry_run {
        handle_dry_run(&config, &hashtag);
        return Ok(());
    }

    handle_harvest(config, &hashtag, &config_hash, cli.log.quiet).await
}

/// Loads the configuration file with its hash, or the defaults
fn load_configuration(path: Option<&Path>) -> anyhow::Result<(Config, String)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, hash))
        }
        None => Ok((Config::default(), String::new())),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hashtag_harvester=info,warn"),
            1 => EnvFilter::new("hashtag_harvester=debug,info"),
            2 => EnvFilter::new("hashtag_harvester=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, hashtag: &str) {
    println!("=== Hashtag-Harvester Dry Run ===\n");

    println!("Listing:");
    println!("  URL: {}", config.site.listing_url(hashtag));
    println!("  Items: {}", config.site.live_item_selector());
    println!("  Load-More endpoint: {}", config.site.load_more_endpoint);

    println!("\nPagination:");
    println!("  Max loads: {}", config.crawler.max_loads);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Min interval: {}ms", config.crawler.min_interval_ms);
    println!(
        "  Poll: every {}ms for up to {}ms",
        config.crawler.poll_interval_ms, config.crawler.poll_timeout_ms
    );
    match config.crawler.time_budget_secs {
        Some(budget) => println!("  Time budget: {}s", budget),
        None => println!("  Time budget: none"),
    }
    if let Some(proxy) = &config.crawler.proxy {
        println!("  Proxy: {}", proxy);
    }

    println!("\nEnrichment:");
    if config.enrichment.enabled {
        println!(
            "  Batches of {} with {} concurrent fetches",
            config.enrichment.batch_size, config.enrichment.concurrency
        );
    } else {
        println!("  Disabled");
    }

    if config.filter.start_date.is_some() || config.filter.end_date.is_some() {
        println!("\nDate range:");
        println!(
            "  {} .. {}",
            config.filter.start_date.as_deref().unwrap_or("*"),
            config.filter.end_date.as_deref().unwrap_or("*")
        );
    }

    println!("\nOutput:");
    println!("  CSV: {}", config.output.path);
    println!("  Diagnostics: {}", config.output.diagnostics_dir);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }
    if config.output.incremental_save {
        println!(
            "  Partial saves: {} every {} snapshots",
            config.output.temp_path(),
            config.output.save_every
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: Config,
    hashtag: &str,
    config_hash: &str,
    quiet: bool,
) -> anyhow::Result<()> {
    let started_at = Utc::now();
    let output_path = config.output.path.clone();
    let summary_path = config.output.summary_path.clone();
    let temp_path = config.output.temp_path();

    tracing::info!(
        "Harvesting #{} (max loads: {}, enrichment: {})",
        hashtag,
        config.crawler.max_loads,
        if config.enrichment.enabled { "on" } else { "off" }
    );

    let outcome = harvest(config, hashtag)
        .await
        .context("failed to start the harvest")?;

    if outcome.records.is_empty() {
        tracing::warn!("No records collected for #{}", hashtag);
    }

    write_csv(Path::new(&output_path), &outcome.records)
        .with_context(|| format!("failed to write {}", output_path))?;

    if outcome.stats.incremental_saves > 0 {
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::warn!("Could not remove {}: {}", temp_path, e);
        }
    }

    let summary = generate_summary(&outcome, started_at, config_hash, &output_path);
    if !quiet {
        print_statistics(&summary);
    }

    if let Some(path) = summary_path {
        generate_markdown_summary(&summary, Path::new(&path))
            .with_context(|| format!("failed to write summary {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    Ok(())
}

/// Handles the `enrich` subcommand: revisits truncated rows of an export
async fn handle_enrich(config: Config, input: &Path, quiet: bool) -> anyhow::Result<()> {
    let output_path = config.output.path.clone();

    let mut records =
        read_csv(input).with_context(|| format!("failed to read {}", input.display()))?;
    if records.is_empty() {
        tracing::warn!("No records found in {}", input.display());
    }

    let report = enrich_records(&config, &mut records)
        .await
        .context("failed to start enrichment")?;

    let records: Vec<VideoRecord> = records.into_iter().map(VideoRecord::from).collect();
    write_csv(Path::new(&output_path), &records)
        .with_context(|| format!("failed to write {}", output_path))?;

    if !quiet {
        if report.attempted == 0 {
            println!("No records needed enrichment; {} rows copied to {}", records.len(), output_path);
        } else {
            println!(
                "Enriched {} of {} truncated records ({} failed, {} skipped) and saved {} rows to {}",
                report.succeeded,
                report.attempted,
                report.failed,
                report.skipped,
                records.len(),
                output_path
            );
        }
    }

    Ok(())
}
