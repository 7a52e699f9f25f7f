//! # github-crawler
//!
//! Crawls the GitHub search page for a set of keywords and, for repository
//! searches, enriches each result with the repository owner and language
//! composition.
//!
//! - Per-request proxy rotation over a static pool
//! - Declarative selector table for the scraped markup
//! - Bounded concurrent enrichment that keeps listing order
//!
//! ## Example
//!
//! ```rust,no_run
//! use github_crawler::{Crawler, CrawlerConfig, SearchKind};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CrawlerConfig::default();
//!     let crawler = Crawler::from_config(&config)?;
//!
//!     let items = crawler.crawl(&["openstack", "nova"], SearchKind::Repository).await?;
//!     for item in &items {
//!         println!("{}", item.url);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod crawler;
mod error;
mod kind;
mod result;

pub mod extract;
pub mod fetcher;
pub mod fetcher_http;
pub mod proxy;

pub use config::{CrawlInput, CrawlerConfig, EnrichmentPolicy};
pub use crawler::{query_params, Crawler, Enrichment};
pub use error::{CrawlError, Result};
pub use extract::{extract_listing, extract_repository_info, Extractor, SelectorConfig};
pub use fetcher::PageFetcher;
pub use fetcher_http::HttpFetcher;
pub use kind::SearchKind;
pub use proxy::{ProxyPool, SelectedProxy};
pub use result::{LanguageStats, RepositoryInfo, ResultItem};
