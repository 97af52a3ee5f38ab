// ABOUTME: CLI binary for harvest: crawl job listings to JSON lines, or resolve one saved detail page.
// ABOUTME: Logs go to stderr through tracing so stdout carries only records.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use harvest_crawl::config::{clamp_request_delay, parse_max_pages, parse_results_wanted};
use harvest_crawl::{Crawler, FetchOptions, InputConfig, JsonLinesSink, RunConfig, RunSummary};
use harvest_extract::{merge, MergeContext, Page};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "harvest")]
#[command(about = "Crawl job/project listings and extract structured records", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a crawl and write one JSON record per line
    Crawl(CrawlArgs),
    /// Resolve a saved detail page into a record
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// JSON input document; flags override its values
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long)]
    keyword: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// Number of records to save, or "all" for no limit
    #[arg(long = "results-wanted")]
    results_wanted: Option<String>,

    /// Listing pages to follow per seed
    #[arg(long = "max-pages")]
    max_pages: Option<String>,

    /// Seed listing URL (repeatable)
    #[arg(long = "start-url")]
    start_urls: Vec<String>,

    /// Emit listing URLs only, without visiting detail pages
    #[arg(long = "no-details")]
    no_details: bool,

    #[arg(long = "no-dedupe")]
    no_dedupe: bool,

    /// Skip the listing API and parse listing markup
    #[arg(long = "no-api")]
    no_api: bool,

    #[arg(long = "site-base")]
    site_base: Option<String>,

    #[arg(long)]
    concurrency: Option<usize>,

    /// Delay before each request in ms (500-10000, 0 for the default)
    #[arg(long = "request-delay")]
    request_delay: Option<u64>,

    #[arg(long)]
    proxy: Option<String>,

    /// Allow fetching from private/local networks
    #[arg(long = "allow-private-networks")]
    allow_private_networks: bool,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// HTML file of a detail page
    #[arg(long)]
    html: PathBuf,

    /// URL the page was served from
    #[arg(long)]
    url: String,

    #[arg(long)]
    category: Option<String>,

    /// Output compact JSON instead of pretty
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "debug"
    } else {
        "info,harvest_crawl=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Crawl(args) => crawl(args).await,
        Command::Extract(args) => extract(args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

async fn crawl(args: CrawlArgs) -> Result<()> {
    let input = match &args.input {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading input {:?}", path))?;
            InputConfig::from_json(&json)?
        }
        None => InputConfig::default(),
    };

    let mut builder = input.apply(RunConfig::builder());
    if let Some(keyword) = args.keyword {
        builder = builder.keyword(keyword);
    }
    if let Some(category) = args.category {
        builder = builder.category(category);
    }
    if let Some(raw) = args.results_wanted.as_deref() {
        builder = builder.results_wanted(parse_results_wanted(raw));
    }
    if let Some(raw) = args.max_pages.as_deref() {
        builder = builder.max_pages_per_chain(parse_max_pages(raw));
    }
    for url in args.start_urls {
        builder = builder.seed_url(url);
    }
    if args.no_details {
        builder = builder.collect_details(false);
    }
    if args.no_dedupe {
        builder = builder.dedupe(false);
    }
    if args.no_api {
        builder = builder.use_remote_api_first(false);
    }
    if let Some(base) = args.site_base {
        builder = builder.site_base(base);
    }
    if let Some(n) = args.concurrency {
        builder = builder.concurrency(n);
    }
    let config = builder.build()?;

    let mut fetch_opts = FetchOptions {
        allow_private_networks: args.allow_private_networks,
        ..Default::default()
    };
    input.apply_fetch_options(&mut fetch_opts);
    if let Some(ms) = args.request_delay {
        fetch_opts.request_delay = clamp_request_delay(Duration::from_millis(ms));
    }
    if let Some(proxy) = args.proxy {
        fetch_opts.proxy = Some(proxy);
    }

    let crawler = Crawler::from_config(config, fetch_opts)?;
    let summary = match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
            crawler.run(&mut JsonLinesSink::new(BufWriter::new(file))).await?
        }
        None => {
            crawler
                .run(&mut JsonLinesSink::new(BufWriter::new(io::stdout())))
                .await?
        }
    };
    report(&summary)
}

fn report(summary: &RunSummary) -> Result<()> {
    info!(summary = %serde_json::to_string(summary)?, "run summary");
    if summary.saved == 0 {
        warn!("no records were saved");
    }
    Ok(())
}

fn extract(args: ExtractArgs) -> Result<()> {
    let html = fs::read_to_string(&args.html)
        .with_context(|| format!("reading file {:?}", args.html))?;
    let page = Page::parse(&args.url, &html)?;
    let ctx = MergeContext::new(args.url.as_str()).with_category(args.category);
    let record = merge::resolve(&page, &ctx);
    if !record.has_content() {
        bail!("no title or description found in {:?}", args.html);
    }

    let out = if args.compact {
        serde_json::to_string(&record)?
    } else {
        serde_json::to_string_pretty(&record)?
    };
    println!("{}", out);
    Ok(())
}
