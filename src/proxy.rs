//! Proxy pool for spreading requests across egress endpoints.
//!
//! Each outbound request picks its own proxy. Selection never mutates the
//! pool, so one pool can be shared by every concurrent fetch of a crawl.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{ClientBuilder, Proxy as ReqwestProxy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{CrawlError, Result};

/// Proxy URLs chosen for one request, keyed by transport scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedProxy {
    /// Proxy for plain HTTP traffic.
    pub http: String,
    /// Proxy for TLS traffic.
    pub https: String,
}

impl SelectedProxy {
    /// Builds the scheme mapping for a `host:port` endpoint.
    pub fn from_endpoint(endpoint: &str) -> Self {
        Self {
            http: format!("http://{}", endpoint),
            https: format!("https://{}", endpoint),
        }
    }

    /// Routes a client builder through this proxy.
    pub fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder> {
        let http = ReqwestProxy::http(&self.http)
            .map_err(|e| CrawlError::Other(format!("Failed to create proxy: {}", e)))?;
        let https = ReqwestProxy::https(&self.https)
            .map_err(|e| CrawlError::Other(format!("Failed to create proxy: {}", e)))?;
        Ok(builder.proxy(http).proxy(https))
    }
}

/// An immutable pool of `host:port` proxy endpoints.
#[derive(Debug, Clone, Default)]
pub struct ProxyPool {
    endpoints: Vec<String>,
}

impl ProxyPool {
    /// Creates an empty pool. Every selection yields a direct connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool from endpoint strings; blank entries are dropped.
    pub fn with_proxies<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = endpoints
            .into_iter()
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self { endpoints }
    }

    /// Returns the endpoints in configuration order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Returns the number of proxies in the pool.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Picks a proxy uniformly at random, skipping `excluded`.
    ///
    /// Returns `None` when no candidate is left; callers then connect directly.
    pub fn select(&self, excluded: Option<&str>) -> Option<SelectedProxy> {
        self.select_with(excluded, random_index)
    }

    /// Like [`ProxyPool::select`], with the index picker supplied by the caller.
    ///
    /// `pick` receives the number of candidates (always non-zero) and must
    /// return an index below it.
    pub fn select_with<F>(&self, excluded: Option<&str>, pick: F) -> Option<SelectedProxy>
    where
        F: FnOnce(usize) -> usize,
    {
        let candidates: Vec<&String> = self
            .endpoints
            .iter()
            .filter(|endpoint| Some(endpoint.as_str()) != excluded)
            .collect();

        if candidates.is_empty() {
            warn!("No proxies available");
            return None;
        }

        let endpoint = candidates[pick(candidates.len()) % candidates.len()];
        info!("Using proxy: {}", endpoint);
        Some(SelectedProxy::from_endpoint(endpoint))
    }
}

static PICK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Clock-seeded index in `0..len`.
///
/// A per-call counter is mixed in so selections made in the same instant by
/// concurrent fetches still spread over the pool.
fn random_index(len: usize) -> usize {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let count = PICK_COUNTER.fetch_add(1, Ordering::Relaxed);

    // splitmix64 finalizer
    let mut z = nanos ^ count.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;

    (z % len as u64) as usize
}
