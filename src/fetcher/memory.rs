use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::FetchError;
use crate::domain::ParsedFeed;
use crate::fetcher::{FeedFetcher, JsonFetcher};

/// Serves canned documents by URL and records every request.
#[derive(Default)]
pub(crate) struct MemoryFetcher {
    feeds: HashMap<String, ParsedFeed>,
    json: HashMap<String, serde_json::Value>,
    requests: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, feed: ParsedFeed) -> Self {
        self.feeds.insert(url.to_string(), feed);
        self
    }

    pub fn with_json(mut self, url: &str, body: serde_json::Value) -> Self {
        self.json.insert(url.to_string(), body);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn record(&self, url: &str) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
    }
}

#[async_trait]
impl FeedFetcher for MemoryFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        self.record(url);
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

#[async_trait]
impl JsonFetcher for MemoryFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        self.record(url);
        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
