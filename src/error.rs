//! Error types for the crawler.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Errors that can occur while crawling.
#[derive(Error, Debug)]
pub enum CrawlError {
    /// The request could not be sent or its body could not be read.
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    /// A selector in the extraction table could not be compiled.
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Invalid query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// URL parsing error.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid configuration or input document.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to read a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl CrawlError {
    /// Returns true for transport failures and non-success statuses.
    pub fn is_network(&self) -> bool {
        matches!(self, CrawlError::Network { .. } | CrawlError::Status { .. })
    }

    /// Returns the URL of the failing request, if any.
    pub fn url(&self) -> Option<&str> {
        match self {
            CrawlError::Network { url, .. } | CrawlError::Status { url, .. } => Some(url),
            _ => None,
        }
    }
}
