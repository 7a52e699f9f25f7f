//! github-crawler CLI - search GitHub and print the results as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use github_crawler::{CrawlInput, Crawler, CrawlerConfig, EnrichmentPolicy, SearchKind};

/// Search GitHub and enrich repository results
#[derive(Parser)]
#[command(name = "github-crawler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Search keywords
    keywords: Vec<String>,

    /// Kind of search
    #[arg(short = 't', long, value_enum)]
    search_type: Option<KindArg>,

    /// Proxy endpoints as host:port (comma-separated or repeated)
    #[arg(short, long = "proxy", value_delimiter = ',')]
    proxies: Vec<String>,

    /// JSON input file with keywords, proxies and search_type
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON crawler configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Maximum number of repository pages fetched at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Keep results whose repository page failed instead of aborting
    #[arg(long)]
    degrade: bool,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    #[value(alias = "repository")]
    Repositories,
    #[value(alias = "issue")]
    Issues,
    #[value(alias = "wiki")]
    Wikis,
}

impl From<KindArg> for SearchKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Repositories => SearchKind::Repository,
            KindArg::Issues => SearchKind::Issue,
            KindArg::Wikis => SearchKind::Wiki,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays valid JSON.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => CrawlerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CrawlerConfig::default(),
    };

    let input = match &cli.input {
        Some(path) => Some(
            CrawlInput::from_file(path)
                .with_context(|| format!("failed to load input {}", path.display()))?,
        ),
        None => None,
    };

    let keywords = if !cli.keywords.is_empty() {
        cli.keywords
    } else if let Some(input) = &input {
        input.keywords.clone()
    } else {
        anyhow::bail!("No keywords given; pass them as arguments or via --input");
    };

    let kind = cli
        .search_type
        .map(SearchKind::from)
        .or(input.as_ref().map(|i| i.search_type))
        .unwrap_or_default();

    if let Some(input) = &input {
        config.proxies.extend(input.proxies.iter().cloned());
    }
    config.proxies.extend(cli.proxies);

    if let Some(concurrency) = cli.concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.degrade {
        config.enrichment = EnrichmentPolicy::Degrade;
    }

    let crawler = Crawler::from_config(&config)?;
    let items = crawler.crawl(keywords.as_slice(), kind).await?;

    let output = if cli.compact {
        serde_json::to_string(&items)?
    } else {
        serde_json::to_string_pretty(&items)?
    };
    println!("{}", output);

    Ok(())
}
