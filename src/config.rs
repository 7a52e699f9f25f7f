//! Crawler configuration and crawl input documents.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::extract::{SelectorConfig, DEFAULT_BASE_URL};
use crate::fetcher_http::DEFAULT_USER_AGENT;
use crate::proxy::ProxyPool;
use crate::{CrawlError, Result, SearchKind};

/// What to do when a repository page cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPolicy {
    /// Abort the crawl on the first failed enrichment.
    #[default]
    FailFast,
    /// Keep the result without `extra` and continue.
    Degrade,
}

/// Configuration for a [`Crawler`](crate::Crawler).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Site origin; relative links and the search path resolve against it.
    pub base_url: String,
    /// Path of the search page, relative to `base_url`.
    pub search_path: String,
    /// Proxy endpoints as `host:port`.
    pub proxies: Vec<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of repository pages fetched at once.
    pub max_concurrency: usize,
    /// Failure handling for repository enrichment.
    pub enrichment: EnrichmentPolicy,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Markup selectors.
    pub selectors: SelectorConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            search_path: "search".to_string(),
            proxies: Vec::new(),
            timeout_secs: 30,
            max_concurrency: 8,
            enrichment: EnrichmentPolicy::FailFast,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl CrawlerConfig {
    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CrawlError::Config(format!("failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks values serde cannot.
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        if self.max_concurrency == 0 {
            return Err(CrawlError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(CrawlError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parsed site origin.
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.base_url)?)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Proxy pool built from the configured endpoints.
    pub fn proxy_pool(&self) -> ProxyPool {
        ProxyPool::with_proxies(&self.proxies)
    }

    /// Sets the proxy endpoints.
    pub fn with_proxies(mut self, proxies: Vec<String>) -> Self {
        self.proxies = proxies;
        self
    }

    /// Sets the site origin.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the enrichment failure policy.
    pub fn with_enrichment(mut self, policy: EnrichmentPolicy) -> Self {
        self.enrichment = policy;
        self
    }

    /// Sets the enrichment concurrency limit.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Sets the per-request timeout in seconds.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// One crawl request: `{"keywords": [...], "proxies": [...], "search_type": "repositories"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlInput {
    /// Search terms, joined with `+`.
    pub keywords: Vec<String>,
    /// Proxy endpoints as `host:port`.
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Kind of search.
    #[serde(default, alias = "type")]
    pub search_type: SearchKind,
}

impl CrawlInput {
    /// Parses a JSON input document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CrawlError::Config(format!("failed to parse crawl input: {}", e)))
    }

    /// Loads a JSON input file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
