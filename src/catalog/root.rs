use crate::app::{OpdsError, Result};
use crate::domain::{RootCatalog, NO_SERVER_HEADER};
use crate::fetcher::FeedFetcher;

/// Title recorded for root entries that have none.
pub const NO_TITLE: &str = "No title";

/// Fetches the top-level OPDS feed and collects its sub-catalogs.
///
/// Only the first page is read. The first entry's title becomes
/// `first_title` even when that entry has no link and so is absent from the
/// map.
pub async fn resolve_root<F: FeedFetcher + ?Sized>(url: &str, fetcher: &F) -> Result<RootCatalog> {
    let feed = fetcher
        .fetch_feed(url)
        .await
        .map_err(|source| OpdsError::FeedUnreachable {
            url: url.to_string(),
            source,
        })?;

    let server = feed.header("server").unwrap_or(NO_SERVER_HEADER);
    tracing::debug!("Root feed server header: {}", server);

    let mut root = RootCatalog::new(server);
    for entry in &feed.entries {
        let title = entry.title.as_deref().unwrap_or(NO_TITLE);
        if root.first_title.is_none() {
            root.first_title = Some(title.to_string());
        }
        if let Some(link) = entry.links.first() {
            tracing::debug!("Catalog {:?} at {}", title, link.href);
            root.insert(title, link.href.clone());
        }
    }

    tracing::info!("Root catalog {} lists {} catalogs", url, root.len());
    Ok(root)
}
