//! Hojokin Harvester main entry point
//!
//! Command-line interface for running crawl targets, managing
//! checkpoints, and maintaining the page cache.

use clap::{Parser, Subcommand};
use hojokin_harvester::checkpoint::{CheckpointManager, DEFAULT_MAX_AGE};
use hojokin_harvester::config::{load_config_with_hash, Config, StorageConfig, TargetConfig};
use hojokin_harvester::engine::{CrawlEvent, CrawlResult, CrawlerEngine};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Hojokin Harvester: a polite crawler for Japanese subsidy listings
#[derive(Parser, Debug)]
#[command(name = "hojokin-harvester")]
#[command(version = "1.0.0")]
#[command(about = "Harvests subsidy listings from public-sector websites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
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
    /// Crawl one configured target
    Run {
        /// Target id from the configuration file
        target: String,

        /// Run extraction but do not hand records to persistence
        #[arg(long)]
        dry_run: bool,
    },

    /// Crawl every configured target in order
    RunAll {
        #[arg(long)]
        dry_run: bool,
    },

    /// Crawl an ad hoc URL outside the configured targets
    Crawl {
        url: String,

        #[arg(long)]
        max_depth: Option<u32>,

        #[arg(long)]
        max_pages: Option<usize>,

        #[arg(long)]
        dry_run: bool,
    },

    /// Manage crawl checkpoints
    Checkpoints {
        #[command(subcommand)]
        command: CheckpointCommand,
    },

    /// Delete the persisted page cache
    ClearCache,
}

#[derive(Subcommand, Debug)]
enum CheckpointCommand {
    /// List saved checkpoints, newest first
    List,

    /// Resume a crawl from a checkpoint
    Resume { id: String },

    /// Delete one checkpoint
    Delete { id: String },

    /// Delete checkpoints older than the given age
    Clean {
        #[arg(long, default_value_t = 7)]
        max_age_days: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::debug!("Configuration hash: {}", config_hash);

    match cli.command {
        Command::Run { target, dry_run } => {
            let target = config
                .find_target(&target)
                .ok_or_else(|| anyhow::anyhow!("Unknown target: {}", target))?
                .clone();
            run_target(&config, &target, &config_hash, dry_run).await?;
        }
        Command::RunAll { dry_run } => {
            for target in config.targets.clone() {
                if let Err(e) = run_target(&config, &target, &config_hash, dry_run).await {
                    tracing::error!("Target {} failed: {}", target.id, e);
                }
            }
        }
        Command::Crawl {
            url,
            max_depth,
            max_pages,
            dry_run,
        } => {
            run_ad_hoc(&config, &url, max_depth, max_pages, dry_run).await?;
        }
        Command::Checkpoints { command } => {
            handle_checkpoints(&config, command, &config_hash).await?;
        }
        Command::ClearCache => {
            handle_clear_cache(&config.storage)?;
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hojokin_harvester=info,warn"),
            1 => EnvFilter::new("hojokin_harvester=debug,info"),
            2 => EnvFilter::new("hojokin_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Crawls one configured target and reports the outcome
async fn run_target(
    config: &Config,
    target: &TargetConfig,
    config_hash: &str,
    dry_run: bool,
) -> anyhow::Result<()> {
    tracing::info!("Crawling target {} ({})", target.id, target.name);

    let mut crawler_config = config.crawler.merged_with(target);
    crawler_config.dry_run = dry_run;

    let mut engine = CrawlerEngine::new(crawler_config, &config.storage, &target.id)?
        .with_site_selectors(target.selectors.clone())
        .with_config_hash(Some(config_hash.to_string()));
    attach_progress_listener(&mut engine);

    let result = engine.crawl(&target.entry_urls).await?;
    report_result(&target.id, &result, dry_run)?;
    Ok(())
}

/// Crawls an ad hoc URL with optional depth/page overrides
async fn run_ad_hoc(
    config: &Config,
    url: &str,
    max_depth: Option<u32>,
    max_pages: Option<usize>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut crawler_config = config.crawler.clone();
    if let Some(depth) = max_depth {
        crawler_config.max_depth = depth;
    }
    if let Some(pages) = max_pages {
        crawler_config.max_pages = pages;
    }
    crawler_config.dry_run = dry_run;

    let mut engine = CrawlerEngine::new(crawler_config, &config.storage, "adhoc")?;
    attach_progress_listener(&mut engine);

    let result = engine.crawl(&[url.to_string()]).await?;
    report_result("adhoc", &result, dry_run)?;
    Ok(())
}

async fn handle_checkpoints(
    config: &Config,
    command: CheckpointCommand,
    config_hash: &str,
) -> anyhow::Result<()> {
    let manager = CheckpointManager::new(
        Path::new(&config.storage.checkpoint_dir),
        Duration::from_millis(config.storage.checkpoint_interval),
    );

    match command {
        CheckpointCommand::List => {
            let summaries = manager.list()?;
            if summaries.is_empty() {
                println!("No checkpoints found");
                return Ok(());
            }
            for summary in summaries {
                println!(
                    "{}  [{}]  visited={} queued={} subsidies={}  updated {}",
                    summary.id,
                    summary.name,
                    summary.visited,
                    summary.queued,
                    summary.subsidies,
                    summary.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        CheckpointCommand::Resume { id } => {
            let mut engine = CrawlerEngine::new(config.crawler.clone(), &config.storage, "resume")?
                .with_config_hash(Some(config_hash.to_string()));
            attach_progress_listener(&mut engine);

            let result = engine.resume_crawl(&id).await?;
            report_result(&id, &result, false)?;
        }
        CheckpointCommand::Delete { id } => {
            manager.delete(&id)?;
            println!("Deleted checkpoint {}", id);
        }
        CheckpointCommand::Clean { max_age_days } => {
            let max_age = if max_age_days == 7 {
                DEFAULT_MAX_AGE
            } else {
                Duration::from_secs(max_age_days * 24 * 60 * 60)
            };
            let deleted = manager.cleanup(max_age)?;
            println!("Deleted {} checkpoint(s)", deleted);
        }
    }

    Ok(())
}

fn handle_clear_cache(storage: &StorageConfig) -> anyhow::Result<()> {
    let path = Path::new(&storage.cache_path);
    if path.exists() {
        std::fs::remove_file(path)?;
        println!("Cleared page cache at {}", storage.cache_path);
    } else {
        println!("No page cache at {}", storage.cache_path);
    }
    Ok(())
}

/// Logs lifecycle events as the crawl progresses
fn attach_progress_listener(engine: &mut CrawlerEngine) {
    engine.add_listener(|event| match event {
        CrawlEvent::PageVisited { url, depth } => {
            tracing::debug!("visited depth={} {}", depth, url);
        }
        CrawlEvent::PageSkipped { url, reason } => {
            tracing::debug!("skipped ({}) {}", reason, url);
        }
        CrawlEvent::SubsidyFound { title, .. } => {
            tracing::info!("found: {}", title);
        }
        CrawlEvent::PageError { url, message } => {
            tracing::warn!("error at {}: {}", url, message);
        }
        _ => {}
    });
}

/// Prints the run summary; without --dry-run the records go to stdout as
/// JSON for the persistence collaborator to consume
fn report_result(source: &str, result: &CrawlResult, dry_run: bool) -> anyhow::Result<()> {
    let stats = &result.stats;
    eprintln!(
        "[{}] visited={} skipped={} subsidies={} cache-hits={} errors={} ({} ms)",
        source,
        stats.visited_urls,
        stats.skipped_urls,
        stats.subsidies_found,
        stats.cache_hits,
        result.errors.len(),
        stats.duration_ms
    );

    if dry_run {
        for record in &result.subsidies {
            eprintln!(
                "  - {} | amount={} | rate={} | deadline={} | active={}",
                record.title,
                record
                    .max_amount
                    .map_or("-".to_string(), |a| format!("{}円", a)),
                record.subsidy_rate.as_deref().unwrap_or("-"),
                record
                    .application_end
                    .map_or("-".to_string(), |d| d.to_string()),
                record.is_active
            );
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&result.subsidies)?);
    }

    Ok(())
}
