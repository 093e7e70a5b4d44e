use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::parser;
use html_escape::decode_html_entities;
use reqwest::Client;
use url::Url;

use crate::app::FetchError;
use crate::domain::{ParsedFeed, RawEntry, RawLink};
use crate::fetcher::{FeedFetcher, JsonFetcher, RetryPolicy};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

struct Fetched {
    url: Url,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

/// reqwest-backed fetcher with a per-request timeout and retry on transient
/// failures.
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(DEFAULT_TIMEOUT, RetryPolicy::default())
    }

    pub fn with_settings(timeout: Duration, retry: RetryPolicy) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("opds-reader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, retry })
    }

    async fn get(&self, url: &str) -> Result<Fetched, FetchError> {
        let mut retry = 0;
        loop {
            match self.get_once(url).await {
                Ok(fetched) => return Ok(fetched),
                Err(err) => {
                    retry += 1;
                    match self.retry.delay_for(&err, retry) {
                        Some(delay) => {
                            tracing::warn!("Fetching {} failed ({}), retrying in {:?}", url, err, delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(err),
                    }
                }
            }
        }
    }

    async fn get_once(&self, url: &str) -> Result<Fetched, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        response.error_for_status_ref()?;

        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(Fetched {
            url: final_url,
            headers,
            body,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        let fetched = self.get(url).await?;
        parse_feed(&fetched.body, &fetched.url, fetched.headers)
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let fetched = self.get(url).await?;
        Ok(serde_json::from_slice(&fetched.body)?)
    }
}

/// Parses an Atom/OPDS body. Relative hrefs are resolved against `base`.
///
/// `updated` values are handed out verbatim and entries without an id keep
/// an empty one; interpreting both is up to the normalizer.
pub fn parse_feed(
    body: &[u8],
    base: &Url,
    headers: HashMap<String, String>,
) -> Result<ParsedFeed, FetchError> {
    let captured = Rc::new(RefCell::new(Vec::<String>::new()));
    let parser = {
        let captured = Rc::clone(&captured);
        parser::Builder::new()
            .timestamp_parser(move |raw| capture_timestamp(&captured, raw))
            .id_generator(|_, _, _| String::new())
            .build()
    };
    let feed = parser
        .parse(body)
        .map_err(|e| FetchError::FeedParse(e.to_string()))?;
    let captured = captured.borrow();

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            title: entry
                .title
                .map(|t| decode_html_entities(&t.content).to_string()),
            author: entry
                .authors
                .first()
                .map(|a| decode_html_entities(&a.name).to_string()),
            id: Some(entry.id).filter(|id| !id.is_empty()),
            updated: entry
                .updated
                .and_then(|marker| captured_timestamp(&captured, marker)),
            summary: entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|s| decode_html_entities(&s).to_string()),
            links: entry
                .links
                .into_iter()
                .map(|link| raw_link(link, base))
                .collect(),
        })
        .collect();

    let links = feed
        .links
        .into_iter()
        .map(|link| raw_link(link, base))
        .collect();

    Ok(ParsedFeed {
        entries,
        links,
        headers,
    })
}

/// Stores the raw text and returns a marker instant whose offset from the
/// epoch, in seconds, indexes the stored text.
fn capture_timestamp(captured: &RefCell<Vec<String>>, raw: &str) -> Option<DateTime<Utc>> {
    let mut captured = captured.borrow_mut();
    let index = i64::try_from(captured.len()).ok()?;
    captured.push(raw.trim().to_string());
    DateTime::from_timestamp(index, 0)
}

fn captured_timestamp(captured: &[String], marker: DateTime<Utc>) -> Option<String> {
    let index = usize::try_from(marker.timestamp()).ok()?;
    captured.get(index).cloned()
}

fn raw_link(link: feed_rs::model::Link, base: &Url) -> RawLink {
    let href = base
        .join(&link.href)
        .map(String::from)
        .unwrap_or(link.href);
    RawLink {
        href,
        rel: link.rel,
        media_type: link.media_type,
    }
}
