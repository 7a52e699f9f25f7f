//! Crawl result types.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Language composition of a repository, in the order the page lists it.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageStats {
    entries: Vec<(String, String)>,
}

impl LanguageStats {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a language, replacing the percentage in place if it is already present.
    pub fn insert(&mut self, language: impl Into<String>, percentage: impl Into<String>) {
        let language = language.into();
        let percentage = percentage.into();
        match self.entries.iter_mut().find(|(name, _)| *name == language) {
            Some(entry) => entry.1 = percentage,
            None => self.entries.push((language, percentage)),
        }
    }

    /// Returns the percentage recorded for a language.
    pub fn get(&self, language: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, pct)| pct.as_str())
    }

    /// Iterates over `(language, percentage)` pairs in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, p)| (l.as_str(), p.as_str()))
    }

    /// Returns the language names in document order.
    pub fn languages(&self) -> Vec<&str> {
        self.entries.iter().map(|(l, _)| l.as_str()).collect()
    }

    /// Number of languages recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no language was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L, P> FromIterator<(L, P)> for LanguageStats
where
    L: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, P)>>(iter: I) -> Self {
        let mut stats = LanguageStats::new();
        for (language, percentage) in iter {
            stats.insert(language, percentage);
        }
        stats
    }
}

impl Serialize for LanguageStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (language, percentage) in &self.entries {
            map.serialize_entry(language, percentage)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LanguageStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatsVisitor;

        impl<'de> Visitor<'de> for StatsVisitor {
            type Value = LanguageStats;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of language names to percentages")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut stats = LanguageStats::new();
                while let Some((language, percentage)) = access.next_entry::<String, String>()? {
                    stats.insert(language, percentage);
                }
                Ok(stats)
            }
        }

        deserializer.deserialize_map(StatsVisitor)
    }
}

/// Metadata scraped from a repository page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Owner display name; empty when the page does not show one.
    pub owner: String,
    /// Language composition.
    pub language_stats: LanguageStats,
}

impl RepositoryInfo {
    /// Creates a record with the given owner and no language data.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            language_stats: LanguageStats::new(),
        }
    }

    /// Sets the language composition.
    pub fn with_language_stats(mut self, stats: LanguageStats) -> Self {
        self.language_stats = stats;
        self
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Absolute URL of the result.
    pub url: String,
    /// Repository metadata, present only for enriched repository results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RepositoryInfo>,
}

impl ResultItem {
    /// Creates a result without enrichment.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: None,
        }
    }

    /// Attaches repository metadata.
    pub fn with_extra(mut self, extra: RepositoryInfo) -> Self {
        self.extra = Some(extra);
        self
    }
}
