use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rumah_scout::accumulator::combine_session_links;
use rumah_scout::config::{ExtractOptions, RetryPolicy, ScrapeConfig, DEFAULT_START_URL};
use rumah_scout::export::{deduplicate, read_spec_summary, save_records, save_spec_summary};
use rumah_scout::models::SpecFieldSet;
use rumah_scout::scrapers::{HttpFetcher, Rumah123Scraper, SearchParams};
use rumah_scout::session::{read_links, write_links, SessionDir};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Scrape property listings from rumah123
#[derive(Debug, Parser)]
#[command(name = "rumah-scout", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    scrape: ScrapeArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge the link files of every session into a new increment file
    Combine {
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Harvest listing links only
    Links,
    /// Scrape listings from --links-file
    Details,
    /// Harvest links, then scrape them
    Full,
}

#[derive(Debug, Args)]
struct ScrapeArgs {
    #[arg(long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,

    /// Number of index pages to walk
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    #[arg(long, default_value_t = 1)]
    start_page: u32,

    /// Minimum delay between requests (seconds)
    #[arg(long, default_value_t = 2.0)]
    delay_min: f64,

    /// Maximum delay between requests (seconds)
    #[arg(long, default_value_t = 5.0)]
    delay_max: f64,

    /// Search results URL to start from
    #[arg(long, default_value = DEFAULT_START_URL)]
    url: String,

    /// Link file (one URL per line) for details mode
    #[arg(long)]
    links_file: Option<PathBuf>,

    /// Where session directories are created
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Per-request timeout (seconds)
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    #[arg(long, default_value_t = 5)]
    max_retries: u32,

    /// Retry transient failures until interrupted
    #[arg(long)]
    retry_forever: bool,

    /// Save interim results every N listings
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Do not emit one spec_* column per specification
    #[arg(long)]
    no_split_details: bool,

    /// Do not emit facility_* / poi_* presence columns
    #[arg(long)]
    no_section_flags: bool,

    /// Earlier specification summary to merge into this run's summary
    #[arg(long)]
    known_fields: Option<PathBuf>,
}

impl ScrapeArgs {
    fn config(&self) -> ScrapeConfig {
        ScrapeConfig {
            min_delay: self.delay_min,
            max_delay: self.delay_max,
            timeout_secs: self.timeout,
            retry: RetryPolicy {
                max_retries: (!self.retry_forever).then_some(self.max_retries),
                ..RetryPolicy::default()
            },
            batch_size: self.batch_size,
            extract: ExtractOptions {
                split_details: !self.no_split_details,
                section_flags: !self.no_section_flags,
            },
        }
    }

    fn search(&self) -> SearchParams {
        SearchParams {
            start_url: self.url.clone(),
            start_page: self.start_page,
            pages: self.pages,
        }
    }
}

/// Console output plus, when given, a plain-text copy in `log_file`
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Combine { results_dir }) => {
            init_logging(None)?;
            info!("Combining session links under {}", results_dir.display());
            combine_session_links(&results_dir)?.log();
            Ok(())
        }
        None => run_session(cli.scrape).await,
    }
}

async fn run_session(args: ScrapeArgs) -> anyhow::Result<()> {
    if args.mode == Mode::Details && args.links_file.is_none() {
        anyhow::bail!("--links-file is required in details mode");
    }

    let session = SessionDir::create(&args.output_dir)?;
    init_logging(Some(&session.log_file()))?;

    info!("{}", "=".repeat(50));
    info!("🏠 Rumah123 Property Scraper");
    info!("{}", "=".repeat(50));
    info!("Starting scraper at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("Mode: {:?}, up to {} pages from {}", args.mode, args.pages, args.url);
    info!("Results will be saved to: {}", session.path().display());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current request");
            on_interrupt.cancel();
        }
    });

    let config = args.config();
    debug!("Configuration: {}", serde_json::to_string(&config)?);
    debug!("Search: {}", serde_json::to_string(&args.search())?);
    let fetcher = HttpFetcher::new(&config, cancel.clone())?;
    let scraper = Rumah123Scraper::new(fetcher, config, cancel.clone());

    if let Err(e) = run_pipeline(&scraper, &args, &session).await {
        error!("An error occurred during scraping: {:#}", e);
    }
    if cancel.is_cancelled() {
        info!("Scraping interrupted by user.");
    }

    info!("Scraping session completed at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

async fn run_pipeline(
    scraper: &Rumah123Scraper<HttpFetcher>,
    args: &ScrapeArgs,
    session: &SessionDir,
) -> anyhow::Result<()> {
    let links = match (&args.links_file, args.mode) {
        (Some(path), Mode::Details) => {
            let links = read_links(path)?;
            info!("Loaded {} links from {}", links.len(), path.display());
            links
        }
        _ => {
            let links = scraper.harvest_links(&args.search()).await?;
            write_links(&links, &session.links_file())?;
            links.into_vec()
        }
    };

    if args.mode == Mode::Links {
        return Ok(());
    }
    if links.is_empty() {
        warn!("No property links found to scrape.");
        return Ok(());
    }

    let mut fields = SpecFieldSet::new();
    let results = scraper.scrape_listings(&links, &mut fields, Some(session)).await;
    let results = deduplicate(results);
    if results.is_empty() {
        warn!("No property details could be scraped.");
        return Ok(());
    }

    if let Err(e) = session.save_raw(&results) {
        warn!("Failed to save raw listing dumps: {:#}", e);
    }

    match save_records(&results, &session.final_csv()) {
        Ok(Some(path)) => info!("Scraping completed successfully! Data saved to {}", path.display()),
        Ok(None) => {}
        Err(e) => error!("Failed to save final CSV file: {:#}", e),
    }

    if let Some(previous) = &args.known_fields {
        match read_spec_summary(previous) {
            Ok(known) => fields.merge(&known),
            Err(e) => warn!("Ignoring known fields file: {:#}", e),
        }
    }
    let summary = save_spec_summary(&fields, &session.specs_summary())?;
    info!("Specification fields summary saved to {}", summary.display());
    Ok(())
}
