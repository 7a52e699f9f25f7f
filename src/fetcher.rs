//! Page fetcher abstraction for retrieving HTML content.

use async_trait::async_trait;

use crate::proxy::SelectedProxy;
use crate::Result;

/// `Accept` header sent with every page request.
pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";

/// Trait for fetching the HTML body of a page.
///
/// `target` may be absolute or relative to the fetcher's base URL. A
/// non-success status is an error, never an empty or partial body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `target` with optional query parameters, through `proxy` when given.
    async fn fetch(
        &self,
        target: &str,
        params: &[(&str, &str)],
        proxy: Option<&SelectedProxy>,
    ) -> Result<String>;
}
