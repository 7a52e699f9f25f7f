//! HTML extraction for listing and repository pages.
//!
//! The literal selectors describe the site's current markup. They live in
//! [`SelectorConfig`] so a markup change only touches configuration.

use std::sync::OnceLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::result::{LanguageStats, RepositoryInfo};
use crate::{CrawlError, Result, SearchKind};

/// Origin that relative links are resolved against by default.
pub const DEFAULT_BASE_URL: &str = "https://github.com";

const LANGUAGE_STATS_MARKER: &str =
    "Repository, language stats search click, location:repo overview";

/// Declarative selector table used by [`Extractor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Result container on a repository search page.
    pub repository_block: String,
    /// Result container on an issue search page.
    pub issue_block: String,
    /// Result container on a wiki search page.
    pub wiki_block: String,
    /// Link inside a result container.
    pub listing_link: String,
    /// Language-stat anchor on a repository page.
    pub language_stat: String,
    /// Text spans inside a language-stat anchor: name, then percentage.
    pub language_stat_span: String,
    /// Owner display on a repository page.
    pub owner: String,
}

impl SelectorConfig {
    /// Returns the container selector for a search kind.
    pub fn block_for(&self, kind: SearchKind) -> &str {
        match kind {
            SearchKind::Repository => &self.repository_block,
            SearchKind::Issue => &self.issue_block,
            SearchKind::Wiki => &self.wiki_block,
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            repository_block: format!("div.{}", SearchKind::Repository.block_identifier()),
            issue_block: format!("div.{}", SearchKind::Issue.block_identifier()),
            wiki_block: format!("div.{}", SearchKind::Wiki.block_identifier()),
            listing_link: "a[href]".to_string(),
            language_stat: format!("a[data-ga-click=\"{}\"]", LANGUAGE_STATS_MARKER),
            language_stat_span: "span".to_string(),
            owner: "span.author.flex-self-stretch".to_string(),
        }
    }
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::InvalidSelector(format!("{}: {:?}", css, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Compiled selectors plus the origin used to absolutize links.
///
/// Extraction never fails on the document itself: missing elements degrade
/// to empty values.
#[derive(Debug, Clone)]
pub struct Extractor {
    base_url: Url,
    repository_block: Selector,
    issue_block: Selector,
    wiki_block: Selector,
    listing_link: Selector,
    language_stat: Selector,
    language_stat_span: Selector,
    owner: Selector,
}

impl Extractor {
    /// Compiles a selector table.
    pub fn new(selectors: &SelectorConfig, base_url: Url) -> Result<Self> {
        Ok(Self {
            base_url,
            repository_block: compile(&selectors.repository_block)?,
            issue_block: compile(&selectors.issue_block)?,
            wiki_block: compile(&selectors.wiki_block)?,
            listing_link: compile(&selectors.listing_link)?,
            language_stat: compile(&selectors.language_stat)?,
            language_stat_span: compile(&selectors.language_stat_span)?,
            owner: compile(&selectors.owner)?,
        })
    }

    /// Returns the origin links are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn block(&self, kind: SearchKind) -> &Selector {
        match kind {
            SearchKind::Repository => &self.repository_block,
            SearchKind::Issue => &self.issue_block,
            SearchKind::Wiki => &self.wiki_block,
        }
    }

    /// Extracts result URLs from a listing page, in document order.
    ///
    /// Duplicates are kept. A page without result containers yields an
    /// empty list.
    pub fn listing(&self, html: &str, kind: SearchKind) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut urls = Vec::new();

        for block in document.select(self.block(kind)) {
            for link in block.select(&self.listing_link) {
                let Some(href) = link.value().attr("href") else {
                    continue;
                };
                match self.base_url.join(href.trim()) {
                    Ok(url) => urls.push(url.to_string()),
                    Err(e) => debug!("Skipping unresolvable href {:?}: {}", href, e),
                }
            }
        }

        urls
    }

    /// Extracts owner and language composition from a repository page.
    pub fn repository_info(&self, html: &str) -> RepositoryInfo {
        let document = Html::parse_document(html);
        let mut language_stats = LanguageStats::new();

        for anchor in document.select(&self.language_stat) {
            let mut spans = anchor.select(&self.language_stat_span);
            let (Some(language), Some(percentage)) = (spans.next(), spans.next()) else {
                debug!("Skipping language stat without name and percentage");
                continue;
            };

            let language = element_text(language);
            if language.is_empty() {
                continue;
            }
            language_stats.insert(language, element_text(percentage));
        }

        let owner = document
            .select(&self.owner)
            .next()
            .map(element_text)
            .unwrap_or_default();

        RepositoryInfo {
            owner,
            language_stats,
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        let base = Url::parse(DEFAULT_BASE_URL).expect("Default base URL is valid");
        Self::new(&SelectorConfig::default(), base).expect("Default selectors are valid")
    }
}

static DEFAULT_EXTRACTOR: OnceLock<Extractor> = OnceLock::new();

fn default_extractor() -> &'static Extractor {
    DEFAULT_EXTRACTOR.get_or_init(Extractor::default)
}

/// Extracts listing URLs with the default selectors, resolved against GitHub.
pub fn extract_listing(html: &str, kind: SearchKind) -> Vec<String> {
    default_extractor().listing(html, kind)
}

/// Extracts repository metadata with the default selectors.
pub fn extract_repository_info(html: &str) -> RepositoryInfo {
    default_extractor().repository_info(html)
}
