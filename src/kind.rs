//! Search kinds supported by the site's search page.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CrawlError;

/// Kind of search to run.
///
/// Only [`SearchKind::Repository`] results are enriched with detail pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchKind {
    #[default]
    #[serde(rename = "repositories", alias = "repository")]
    Repository,
    #[serde(rename = "issues", alias = "issue")]
    Issue,
    #[serde(rename = "wikis", alias = "wiki")]
    Wiki,
}

impl SearchKind {
    /// All kinds, in declaration order.
    pub const ALL: [SearchKind; 3] = [SearchKind::Repository, SearchKind::Issue, SearchKind::Wiki];

    /// Value sent as the `type` query parameter.
    pub fn value(&self) -> &'static str {
        match self {
            SearchKind::Repository => "repositories",
            SearchKind::Issue => "issues",
            SearchKind::Wiki => "wikis",
        }
    }

    /// Class marking the result containers on the listing page.
    pub fn block_identifier(&self) -> &'static str {
        match self {
            SearchKind::Repository | SearchKind::Issue | SearchKind::Wiki => "search-title",
        }
    }

    /// Whether listing results of this kind get a detail-page fetch.
    pub fn is_enriched(&self) -> bool {
        matches!(self, SearchKind::Repository)
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for SearchKind {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "repository" | "repositories" => Ok(SearchKind::Repository),
            "issue" | "issues" => Ok(SearchKind::Issue),
            "wiki" | "wikis" => Ok(SearchKind::Wiki),
            other => Err(CrawlError::Config(format!("unknown search type '{}'", other))),
        }
    }
}
