//! HTTP-based page fetcher using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder};
use tracing::{error, info};
use url::Url;

use crate::config::CrawlerConfig;
use crate::fetcher::{PageFetcher, ACCEPT_HTML};
use crate::proxy::SelectedProxy;
use crate::{CrawlError, Result};

/// Default user agent for outbound requests.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; github-crawler/0.1)";

/// A page fetcher that issues plain HTTP GET requests via reqwest.
///
/// Direct requests share one client. A request routed through a proxy gets
/// a client of its own, since reqwest binds proxies at client construction.
pub struct HttpFetcher {
    base_url: Url,
    user_agent: String,
    timeout: Duration,
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher resolving relative targets against `base_url`.
    pub fn new(base_url: Url, user_agent: impl Into<String>, timeout: Duration) -> Result<Self> {
        let user_agent = user_agent.into();
        let client = Self::builder(&user_agent, timeout)
            .build()
            .map_err(|e| CrawlError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            base_url,
            user_agent,
            timeout,
            client,
        })
    }

    /// Creates a fetcher from crawler configuration.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Self::new(config.base_url()?, config.user_agent.clone(), config.timeout())
    }

    /// Creates a fetcher around a custom reqwest client for direct requests.
    ///
    /// Requests routed through a proxy do not use this client; they get a
    /// fresh one with the default user agent and timeout.
    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self {
            base_url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            client,
        }
    }

    /// Returns the origin relative targets are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn builder(user_agent: &str, timeout: Duration) -> ClientBuilder {
        Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
    }

    fn client_for(&self, proxy: Option<&SelectedProxy>) -> Result<Client> {
        match proxy {
            None => Ok(self.client.clone()),
            Some(proxy) => proxy
                .apply(Self::builder(&self.user_agent, self.timeout))?
                .build()
                .map_err(|e| CrawlError::Other(format!("Failed to create HTTP client: {}", e))),
        }
    }

    /// Resolves a target against the base URL and appends query parameters.
    pub fn resolve(&self, target: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.join(target)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        target: &str,
        params: &[(&str, &str)],
        proxy: Option<&SelectedProxy>,
    ) -> Result<String> {
        let url = self.resolve(target, params)?;
        let client = self.client_for(proxy)?;

        info!("Requesting {}", url);
        let response = client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(|source| {
                error!("Request to {} failed: {}", url, source);
                CrawlError::Network {
                    url: url.to_string(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Request to {} returned HTTP {}", url, status);
            return Err(CrawlError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| CrawlError::Network {
            url: url.to_string(),
            source,
        })
    }
}
