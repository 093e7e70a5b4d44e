pub mod http_fetcher;
pub mod retry;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::app::FetchError;
use crate::domain::ParsedFeed;

pub use http_fetcher::HttpFetcher;
pub use retry::RetryPolicy;

/// Fetches and parses one Atom/OPDS document.
#[async_trait]
pub trait FeedFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed, FetchError>;
}

/// Fetches one URL and decodes the body as JSON.
#[async_trait]
pub trait JsonFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}

/// Everything the catalog commands need from the network.
pub trait CatalogFetcher: FeedFetcher + JsonFetcher + Send + Sync {}

impl<T: FeedFetcher + JsonFetcher + Send + Sync> CatalogFetcher for T {}
