use std::collections::HashSet;

use crate::app::{OpdsError, Result};
use crate::domain::RawEntry;
use crate::fetcher::FeedFetcher;

pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Upper bound on the number of pages a walk may fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLimit {
    Pages(usize),
    Unbounded,
}

impl Default for PageLimit {
    fn default() -> Self {
        Self::Pages(DEFAULT_MAX_PAGES)
    }
}

impl PageLimit {
    fn allows(&self, fetched: usize) -> bool {
        match self {
            Self::Pages(max) => fetched < *max,
            Self::Unbounded => true,
        }
    }
}

/// Follows the `next` links of a paginated feed one page at a time.
///
/// Pages are fetched strictly in sequence. Entries are handed out as they
/// arrive, so a caller keeps whatever it received before a failure.
pub struct PageWalker<'a, F: FeedFetcher + ?Sized> {
    fetcher: &'a F,
    next: Option<String>,
    visited: HashSet<String>,
    pages: usize,
    limit: PageLimit,
}

impl<'a, F: FeedFetcher + ?Sized> PageWalker<'a, F> {
    pub fn new(fetcher: &'a F, start_url: &str, limit: PageLimit) -> Self {
        Self {
            fetcher,
            next: Some(start_url.to_string()),
            visited: HashSet::new(),
            pages: 0,
            limit,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Fetches the next page. `Ok(None)` once the feed is exhausted or the
    /// page limit is reached.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawEntry>>> {
        let Some(url) = self.next.take() else {
            return Ok(None);
        };

        if !self.limit.allows(self.pages) {
            tracing::warn!(
                "Stopping pagination after {} pages, {} not fetched",
                self.pages,
                url
            );
            return Ok(None);
        }

        let feed = match self.fetcher.fetch_feed(&url).await {
            Ok(feed) => feed,
            Err(source) => return Err(OpdsError::FeedUnreachable { url, source }),
        };
        self.pages += 1;

        let next = feed.next_url().map(String::from);
        self.visited.insert(url);
        self.next = match next {
            Some(next) if self.visited.contains(&next) => {
                tracing::warn!("Feed links back to already fetched page {}", next);
                None
            }
            other => other,
        };

        tracing::debug!(
            "Fetched page {} with {} entries",
            self.pages,
            feed.entries.len()
        );
        Ok(Some(feed.entries))
    }
}

/// Fetches `start_url` and every page reachable through `next` links,
/// returning all entries in page order.
pub async fn walk<F: FeedFetcher + ?Sized>(
    start_url: &str,
    fetcher: &F,
    limit: PageLimit,
) -> Result<Vec<RawEntry>> {
    let mut walker = PageWalker::new(fetcher, start_url, limit);
    let mut entries = Vec::new();
    while let Some(mut page) = walker.next_page().await? {
        entries.append(&mut page);
    }
    Ok(entries)
}
