//! Crawl orchestration.
//!
//! A crawl fetches one listing page and, for repository searches, every
//! result's repository page. Repository pages are fetched concurrently up to
//! the configured limit; results keep listing order.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::config::{CrawlerConfig, EnrichmentPolicy};
use crate::extract::Extractor;
use crate::fetcher::PageFetcher;
use crate::fetcher_http::HttpFetcher;
use crate::proxy::ProxyPool;
use crate::result::{RepositoryInfo, ResultItem};
use crate::{CrawlError, Result, SearchKind};

/// Outcome of fetching and parsing one repository page.
#[derive(Debug)]
pub struct Enrichment {
    /// Repository URL from the listing.
    pub url: String,
    /// Parsed metadata, or the error that prevented it.
    pub outcome: Result<RepositoryInfo>,
}

impl Enrichment {
    /// Whether the repository page was fetched successfully.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Converts into a result item, dropping a failure to `extra: None`.
    pub fn into_degraded_item(self) -> ResultItem {
        match self.outcome {
            Ok(info) => ResultItem::new(self.url).with_extra(info),
            Err(e) => {
                warn!("Enrichment of {} failed, keeping bare result: {}", self.url, e);
                ResultItem::new(self.url)
            }
        }
    }
}

/// Builds the search query parameters: keywords joined with `+`, plus the kind.
pub fn query_params<S: AsRef<str>>(keywords: &[S], kind: SearchKind) -> Result<Vec<(&'static str, String)>> {
    let terms: Vec<&str> = keywords
        .iter()
        .map(|k| k.as_ref().trim())
        .filter(|k| !k.is_empty())
        .collect();

    if terms.is_empty() {
        return Err(CrawlError::InvalidQuery(
            "at least one non-empty keyword is required".into(),
        ));
    }

    Ok(vec![
        ("q", terms.join("+")),
        ("type", kind.value().to_lowercase()),
    ])
}

/// Search crawler for a single site.
pub struct Crawler {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Extractor,
    proxies: Arc<ProxyPool>,
    search_path: String,
    max_concurrency: usize,
    policy: EnrichmentPolicy,
}

impl Crawler {
    /// Creates a crawler using the given fetcher.
    pub fn new(config: &CrawlerConfig, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetcher,
            extractor: Extractor::new(&config.selectors, config.base_url()?)?,
            proxies: Arc::new(config.proxy_pool()),
            search_path: config.search_path.clone(),
            max_concurrency: config.max_concurrency,
            policy: config.enrichment,
        })
    }

    /// Creates a crawler backed by an [`HttpFetcher`].
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        let fetcher = HttpFetcher::from_config(config)?;
        Self::new(config, Arc::new(fetcher))
    }

    /// Returns the proxy pool shared by all requests.
    pub fn proxy_pool(&self) -> &Arc<ProxyPool> {
        &self.proxies
    }

    /// Returns the enrichment failure policy.
    pub fn policy(&self) -> EnrichmentPolicy {
        self.policy
    }

    /// Runs one search and, for repository searches, enriches every result.
    pub async fn crawl<S: AsRef<str>>(&self, keywords: &[S], kind: SearchKind) -> Result<Vec<ResultItem>> {
        let start = Instant::now();
        let urls = self.listing(keywords, kind).await?;
        info!("Listing for {} returned {} results", kind, urls.len());

        if !kind.is_enriched() {
            return Ok(urls.into_iter().map(ResultItem::new).collect());
        }

        let items = match self.policy {
            EnrichmentPolicy::FailFast => {
                // Dropping the stream on the first error cancels in-flight fetches.
                stream::iter(urls)
                    .map(|url| async move {
                        let info = self.repository_info(&url).await?;
                        Ok::<_, CrawlError>(ResultItem::new(url).with_extra(info))
                    })
                    .buffered(self.max_concurrency)
                    .try_collect::<Vec<_>>()
                    .await?
            }
            EnrichmentPolicy::Degrade => self
                .enrich(urls)
                .await
                .into_iter()
                .map(Enrichment::into_degraded_item)
                .collect(),
        };

        info!(
            "Crawl finished with {} results in {}ms",
            items.len(),
            start.elapsed().as_millis()
        );
        Ok(items)
    }

    /// Fetches the listing page and extracts result URLs.
    pub async fn listing<S: AsRef<str>>(&self, keywords: &[S], kind: SearchKind) -> Result<Vec<String>> {
        let params = query_params(keywords, kind)?;
        let params: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        let proxy = self.proxies.select(None);
        let body = self
            .fetcher
            .fetch(&self.search_path, &params, proxy.as_ref())
            .await?;

        Ok(self.extractor.listing(&body, kind))
    }

    /// Fetches one repository page, through its own proxy, and parses it.
    pub async fn repository_info(&self, url: &str) -> Result<RepositoryInfo> {
        let proxy = self.proxies.select(None);
        let body = self.fetcher.fetch(url, &[], proxy.as_ref()).await?;
        let info = self.extractor.repository_info(&body);
        debug!(
            "Repository {} owner={:?} languages={}",
            url,
            info.owner,
            info.language_stats.len()
        );
        Ok(info)
    }

    /// Enriches every URL, isolating failures per item.
    ///
    /// The returned list is index-aligned with `urls`.
    pub async fn enrich(&self, urls: Vec<String>) -> Vec<Enrichment> {
        stream::iter(urls)
            .map(|url| async move {
                let outcome = self.repository_info(&url).await;
                Enrichment { url, outcome }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::SelectedProxy;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const LISTING: &str = r#"
        <div class="search-title"><a href="/atuldjadhav/DropBox-Cloud-Storage">one</a></div>
        <div class="search-title"><a href="/michealbalogun/Horizon-dashboard">two</a></div>
    "#;

    const REPO_ONE: &str = r#"
        <span class="author flex-self-stretch">atuldjadhav</span>
        <a data-ga-click="Repository, language stats search click, location:repo overview">
            <span>CSS</span><span>52.0%</span>
        </a>
        <a data-ga-click="Repository, language stats search click, location:repo overview">
            <span>JavaScript</span><span>47.2%</span>
        </a>
        <a data-ga-click="Repository, language stats search click, location:repo overview">
            <span>HTML</span><span>0.8%</span>
        </a>
    "#;

    const URL_ONE: &str = "https://github.com/atuldjadhav/DropBox-Cloud-Storage";
    const URL_TWO: &str = "https://github.com/michealbalogun/Horizon-dashboard";

    #[derive(Clone)]
    enum Page {
        Body(&'static str, u64),
        Failing(u64),
        Missing,
    }

    #[derive(Debug, Clone)]
    struct Request {
        target: String,
        params: Vec<(String, String)>,
        proxy: Option<SelectedProxy>,
    }

    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, Page>,
        requests: Mutex<Vec<Request>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        completed: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn new() -> Self {
            Self::default()
        }

        fn page(mut self, target: &str, body: &'static str) -> Self {
            self.pages.insert(target.to_string(), Page::Body(body, 0));
            self
        }

        fn slow_page(mut self, target: &str, body: &'static str, delay_ms: u64) -> Self {
            self.pages.insert(target.to_string(), Page::Body(body, delay_ms));
            self
        }

        fn failing_after(mut self, target: &str, delay_ms: u64) -> Self {
            self.pages.insert(target.to_string(), Page::Failing(delay_ms));
            self
        }

        fn missing(mut self, target: &str) -> Self {
            self.pages.insert(target.to_string(), Page::Missing);
            self
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }

        fn completed(&self) -> Vec<String> {
            self.completed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for MockFetcher {
        async fn fetch(
            &self,
            target: &str,
            params: &[(&str, &str)],
            proxy: Option<&SelectedProxy>,
        ) -> Result<String> {
            self.requests.lock().unwrap().push(Request {
                target: target.to_string(),
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                proxy: proxy.cloned(),
            });

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            let page = self.pages.get(target).cloned().unwrap_or(Page::Missing);
            let result = match page {
                Page::Body(body, delay_ms) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    self.completed.lock().unwrap().push(target.to_string());
                    Ok(body.to_string())
                }
                Page::Failing(delay_ms) => {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Err(CrawlError::Status {
                        url: target.to_string(),
                        status: StatusCode::INTERNAL_SERVER_ERROR,
                    })
                }
                Page::Missing => Err(CrawlError::Status {
                    url: target.to_string(),
                    status: StatusCode::NOT_FOUND,
                }),
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn crawler(fetcher: Arc<MockFetcher>, config: CrawlerConfig) -> Crawler {
        Crawler::new(&config, fetcher).unwrap()
    }

    #[test]
    fn test_query_params() {
        let params = query_params(&["openstack", "nova", "css"], SearchKind::Repository).unwrap();
        assert_eq!(
            params,
            vec![
                ("q", "openstack+nova+css".to_string()),
                ("type", "repositories".to_string())
            ]
        );
    }

    #[test]
    fn test_query_params_skips_blank_keywords() {
        let params = query_params(&[" nova ", "", "  "], SearchKind::Wiki).unwrap();
        assert_eq!(params[0].1, "nova");
        assert_eq!(params[1].1, "wikis");
    }

    #[test]
    fn test_query_params_rejects_empty() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            query_params(&empty, SearchKind::Issue),
            Err(CrawlError::InvalidQuery(_))
        ));
        assert!(matches!(
            query_params(&["   "], SearchKind::Issue),
            Err(CrawlError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_crawler_rejects_invalid_config() {
        let config = CrawlerConfig::default().with_max_concurrency(0);
        let result = Crawler::new(&config, Arc::new(MockFetcher::new()));
        assert!(matches!(result, Err(CrawlError::Config(_))));
    }

    #[tokio::test]
    async fn test_crawl_repository_enriches_in_listing_order() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("search", LISTING)
                .slow_page(URL_ONE, REPO_ONE, 80)
                .page(URL_TWO, ""),
        );
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

        let items = assert_ok!(crawler.crawl(&["nova"], SearchKind::Repository).await);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, URL_ONE);
        assert_eq!(items[1].url, URL_TWO);

        let first = items[0].extra.as_ref().unwrap();
        assert_eq!(first.owner, "atuldjadhav");
        assert_eq!(first.language_stats.languages(), vec!["CSS", "JavaScript", "HTML"]);
        assert_eq!(items[1].extra, Some(RepositoryInfo::default()));

        assert_eq!(fetcher.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_crawl_issue_never_enriches() {
        for kind in [SearchKind::Issue, SearchKind::Wiki] {
            let fetcher = Arc::new(
                MockFetcher::new()
                    .page("search", LISTING)
                    .page(URL_ONE, REPO_ONE)
                    .page(URL_TWO, REPO_ONE),
            );
            let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

            let items = assert_ok!(crawler.crawl(&["nova"], kind).await);

            assert_eq!(items.len(), 2);
            assert!(items.iter().all(|item| item.extra.is_none()));
            let requests = fetcher.requests();
            assert_eq!(requests.len(), 1);
            assert_eq!(requests[0].target, "search");
        }
    }

    #[tokio::test]
    async fn test_crawl_sends_query_params() {
        let fetcher = Arc::new(MockFetcher::new().page("search", ""));
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

        let items = assert_ok!(crawler.crawl(&["openstack", "nova"], SearchKind::Issue).await);
        assert!(items.is_empty());

        let requests = fetcher.requests();
        assert_eq!(
            requests[0].params,
            vec![
                ("q".to_string(), "openstack+nova".to_string()),
                ("type".to_string(), "issues".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_crawl_empty_listing_repository() {
        let fetcher = Arc::new(MockFetcher::new().page("search", "<html></html>"));
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

        let items = assert_ok!(crawler.crawl(&["nova"], SearchKind::Repository).await);
        assert!(items.is_empty());
        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_crawl_invalid_query_sends_nothing() {
        let fetcher = Arc::new(MockFetcher::new().page("search", LISTING));
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

        let result = crawler.crawl(&[""], SearchKind::Repository).await;
        assert!(matches!(result, Err(CrawlError::InvalidQuery(_))));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_crawl_listing_failure_propagates() {
        let fetcher = Arc::new(MockFetcher::new().missing("search"));
        let crawler = crawler(fetcher, CrawlerConfig::default());

        let err = assert_err!(crawler.crawl(&["nova"], SearchKind::Issue).await);
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_crawl_fail_fast_on_enrichment_error() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("search", LISTING)
                .page(URL_ONE, REPO_ONE)
                .missing(URL_TWO),
        );
        let crawler = crawler(fetcher, CrawlerConfig::default());
        assert_eq!(crawler.policy(), EnrichmentPolicy::FailFast);

        let err = assert_err!(crawler.crawl(&["nova"], SearchKind::Repository).await);
        assert_eq!(err.url(), Some(URL_TWO));
    }

    #[tokio::test]
    async fn test_fail_fast_cancels_pending_enrichments() {
        const LISTING_THREE: &str = r#"
            <div class="search-title"><a href="/a/1">1</a></div>
            <div class="search-title"><a href="/a/2">2</a></div>
            <div class="search-title"><a href="/a/3">3</a></div>
        "#;
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("search", LISTING_THREE)
                .failing_after("https://github.com/a/1", 20)
                .slow_page("https://github.com/a/2", REPO_ONE, 300)
                .slow_page("https://github.com/a/3", REPO_ONE, 300),
        );
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

        let err = assert_err!(crawler.crawl(&["nova"], SearchKind::Repository).await);
        assert_eq!(err.url(), Some("https://github.com/a/1"));

        // Give dropped fetches time to finish if they were still running.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(fetcher.requests().len(), 4);
        assert_eq!(fetcher.completed(), vec!["search".to_string()]);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_crawl_degrade_keeps_failed_item_bare() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("search", LISTING)
                .missing(URL_ONE)
                .page(URL_TWO, REPO_ONE),
        );
        let config = CrawlerConfig::default().with_enrichment(EnrichmentPolicy::Degrade);
        let crawler = crawler(fetcher, config);
        assert_eq!(crawler.policy(), EnrichmentPolicy::Degrade);

        let items = assert_ok!(crawler.crawl(&["nova"], SearchKind::Repository).await);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ResultItem::new(URL_ONE));
        assert_eq!(items[1].extra.as_ref().unwrap().owner, "atuldjadhav");
    }

    #[tokio::test]
    async fn test_enrich_reports_per_item_outcome() {
        let fetcher = Arc::new(MockFetcher::new().page(URL_ONE, REPO_ONE).missing(URL_TWO));
        let crawler = crawler(fetcher, CrawlerConfig::default());

        let enrichments = crawler
            .enrich(vec![URL_ONE.to_string(), URL_TWO.to_string()])
            .await;
        assert_eq!(enrichments.len(), 2);
        assert!(enrichments[0].is_ok());
        assert!(!enrichments[1].is_ok());
        assert_eq!(enrichments[1].url, URL_TWO);
    }

    #[tokio::test]
    async fn test_enrichment_respects_concurrency_limit() {
        const LISTING_FOUR: &str = r#"
            <div class="search-title"><a href="/a/1">1</a><a href="/a/2">2</a></div>
            <div class="search-title"><a href="/a/3">3</a><a href="/a/4">4</a></div>
        "#;
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("search", LISTING_FOUR)
                .slow_page("https://github.com/a/1", "", 40)
                .slow_page("https://github.com/a/2", "", 30)
                .slow_page("https://github.com/a/3", "", 20)
                .slow_page("https://github.com/a/4", "", 10),
        );
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default().with_max_concurrency(2));

        let items = assert_ok!(crawler.crawl(&["a"], SearchKind::Repository).await);
        let urls: Vec<_> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://github.com/a/1",
                "https://github.com/a/2",
                "https://github.com/a/3",
                "https://github.com/a/4"
            ]
        );
        assert!(fetcher.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_each_request_selects_a_proxy() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .page("search", LISTING)
                .page(URL_ONE, "")
                .page(URL_TWO, ""),
        );
        let pool = vec!["10.0.0.1:3128".to_string(), "10.0.0.2:3128".to_string()];
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default().with_proxies(pool.clone()));

        assert_ok!(crawler.crawl(&["nova"], SearchKind::Repository).await);

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 3);
        for request in requests {
            let proxy = request.proxy.expect("proxy selected");
            assert!(pool.iter().any(|p| proxy.http == format!("http://{}", p)));
        }
    }

    #[tokio::test]
    async fn test_no_proxies_means_direct_requests() {
        let fetcher = Arc::new(MockFetcher::new().page("search", LISTING));
        let crawler = crawler(fetcher.clone(), CrawlerConfig::default());

        assert!(crawler.proxy_pool().is_empty());
        assert_ok!(crawler.crawl(&["nova"], SearchKind::Wiki).await);
        assert!(fetcher.requests()[0].proxy.is_none());
    }
}
