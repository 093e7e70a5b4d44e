//! Timestamp reconciliation against the calibre content server.
//!
//! calibre stamps every OPDS entry with the same `updated` value, the last
//! modification time of the whole library. The per-book timestamps are only
//! available from its REST endpoints:
//!
//! ```text
//! GET /ajax/search                  -> {"total_num": N}
//! GET /ajax/search?num=N&offset=0   -> {"book_ids": [..]}
//! GET /ajax/books?ids=1,2,3         -> {"1": {"uuid": .., "timestamp": ..}, ..}
//! ```
//!
//! Nothing is written to the catalog until every request has succeeded and
//! every timestamp has parsed.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app::{FetchError, OpdsError, Result};
use crate::catalog::CatalogModel;
use crate::fetcher::JsonFetcher;
use crate::normalizer::{parse_timestamp, TimestampMode};

pub const SEARCH_PATH: &str = "/ajax/search";
pub const BOOKS_PATH: &str = "/ajax/books";

/// What to do with a held book the server has no record for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownUuidPolicy {
    /// Leave the book's timestamp alone and report it.
    #[default]
    Skip,
    /// Fail the whole pass with [`OpdsError::UnknownBookUuid`].
    Abort,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: usize,
    /// Uuids with no authoritative record.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RestBookRecord {
    pub uuid: String,
    pub timestamp: String,
}

#[derive(Deserialize)]
struct SearchCount {
    total_num: u64,
}

#[derive(Deserialize)]
struct SearchIds {
    book_ids: Vec<u64>,
}

/// URL on the same scheme and host as `opds_url`, with the path replaced
/// and the query and fragment dropped or replaced.
pub fn sibling_url(opds_url: &str, path: &str, query: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(opds_url)?;
    url.set_path(path);
    url.set_query(query);
    url.set_fragment(None);
    Ok(url)
}

async fn get_json<T, F>(fetcher: &F, url: &Url) -> Result<T>
where
    T: DeserializeOwned,
    F: JsonFetcher + ?Sized,
{
    tracing::debug!("Calibre REST request: {}", url);
    let value = fetcher
        .fetch_json(url.as_str())
        .await
        .map_err(|source| OpdsError::RestEndpoint {
            url: url.to_string(),
            source,
        })?;

    serde_json::from_value(value).map_err(|e| OpdsError::RestEndpoint {
        url: url.to_string(),
        source: FetchError::Json(e),
    })
}

/// Fetches the authoritative record of every book on the server, keyed by
/// uuid.
pub async fn fetch_authoritative_records<F: JsonFetcher + ?Sized>(
    opds_url: &str,
    fetcher: &F,
) -> Result<HashMap<String, RestBookRecord>> {
    let count_url = sibling_url(opds_url, SEARCH_PATH, None)?;
    let count: SearchCount = get_json(fetcher, &count_url).await?;

    let ids_query = format!("num={}&offset=0", count.total_num);
    let ids_url = sibling_url(opds_url, SEARCH_PATH, Some(&ids_query))?;
    let ids: SearchIds = get_json(fetcher, &ids_url).await?;

    if ids.book_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let joined = ids
        .book_ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    let books_url = sibling_url(opds_url, BOOKS_PATH, Some(&format!("ids={}", joined)))?;
    let books: HashMap<String, Option<RestBookRecord>> = get_json(fetcher, &books_url).await?;

    let mut by_uuid = HashMap::with_capacity(books.len());
    for id in &ids.book_ids {
        match books.get(&id.to_string()) {
            Some(Some(record)) => {
                by_uuid.insert(record.uuid.clone(), record.clone());
            }
            _ => tracing::warn!("No metadata returned for calibre book id {}", id),
        }
    }

    tracing::debug!("Fetched {} authoritative book records", by_uuid.len());
    Ok(by_uuid)
}

/// Rewrites the timestamps of the held books from `records`.
///
/// All timestamps are parsed before any is applied, so an error leaves the
/// model untouched.
pub fn apply_records(
    model: &mut CatalogModel,
    records: &HashMap<String, RestBookRecord>,
    mode: TimestampMode,
    policy: UnknownUuidPolicy,
) -> Result<ReconcileReport> {
    let mut updates = Vec::with_capacity(model.books().len());
    let mut skipped = Vec::new();

    for (index, book) in model.books().iter().enumerate() {
        match records.get(book.uuid()) {
            Some(record) => updates.push((index, parse_timestamp(&record.timestamp, mode)?)),
            None => match policy {
                UnknownUuidPolicy::Abort => {
                    return Err(OpdsError::UnknownBookUuid {
                        uuid: book.uuid().to_string(),
                    })
                }
                UnknownUuidPolicy::Skip => {
                    tracing::warn!(
                        "No authoritative timestamp for {:?} ({})",
                        book.title(),
                        book.uuid()
                    );
                    skipped.push(book.uuid().to_string());
                }
            },
        }
    }

    model.apply_timestamps(&updates);

    Ok(ReconcileReport {
        updated: updates.len(),
        skipped,
    })
}

/// Replaces the timestamps of every held book with the values reported by
/// the calibre server behind `opds_url`, then rebuilds the filtered view.
///
/// Only meaningful when [`RootCatalog::is_calibre`](crate::domain::RootCatalog::is_calibre)
/// holds for the server.
pub async fn reconcile_timestamps<F: JsonFetcher + ?Sized>(
    model: &mut CatalogModel,
    opds_url: &str,
    fetcher: &F,
    mode: TimestampMode,
    policy: UnknownUuidPolicy,
) -> Result<ReconcileReport> {
    let records = fetch_authoritative_records(opds_url, fetcher).await?;
    let report = apply_records(model, &records, mode, policy)?;
    tracing::info!(
        "Reconciled {} timestamps, {} books without record",
        report.updated,
        report.skipped.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveDateTime};
    use serde_json::json;

    use super::*;
    use crate::domain::Book;
    use crate::fetcher::memory::MemoryFetcher;
    use crate::library::stub::StubLibrary;
    use crate::normalizer::default_timestamp;

    const OPDS: &str = "http://calibre.local:8080/opds?lang=en#top";
    const SEARCH: &str = "http://calibre.local:8080/ajax/search";
    const SEARCH_ALL: &str = "http://calibre.local:8080/ajax/search?num=3&offset=0";
    const BOOKS: &str = "http://calibre.local:8080/ajax/books?ids=1,2,3";

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn model(uuids: &[&str]) -> CatalogModel {
        let mut model = CatalogModel::new(Arc::new(StubLibrary::new()));
        model.set_books(
            uuids
                .iter()
                .map(|u| Book::new(format!("Book {u}"), vec![], *u, default_timestamp(), vec![], vec![]))
                .collect(),
        );
        model
    }

    fn server() -> MemoryFetcher {
        MemoryFetcher::new()
            .with_json(SEARCH, json!({"total_num": 3, "offset": 0, "num": 0}))
            .with_json(SEARCH_ALL, json!({"total_num": 3, "book_ids": [1, 2, 3]}))
            .with_json(
                BOOKS,
                json!({
                    "1": {"uuid": "A", "timestamp": "2011-01-01T12:00:00+00:00", "title": "x"},
                    "2": {"uuid": "B", "timestamp": "2012-02-02T12:00:00.000000+00:00"},
                    "3": null
                }),
            )
    }

    #[test]
    fn test_sibling_url_replaces_path_and_query() {
        assert_eq!(sibling_url(OPDS, SEARCH_PATH, None).unwrap().as_str(), SEARCH);
        assert_eq!(
            sibling_url(OPDS, BOOKS_PATH, Some("ids=1,2,3")).unwrap().as_str(),
            BOOKS
        );
    }

    #[tokio::test]
    async fn test_reconcile_rewrites_timestamps_by_uuid() {
        let fetcher = server();
        let mut model = model(&["A", "B"]);
        let order = model.filtered_indices().to_vec();

        let report = reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::Legacy,
            UnknownUuidPolicy::Abort,
        )
        .await
        .unwrap();

        assert_eq!(report.updated, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(model.books()[0].timestamp(), at(2011, 1, 1));
        assert_eq!(model.books()[1].timestamp(), at(2012, 2, 2));
        assert_eq!(model.filtered_indices(), order.as_slice());
        assert_eq!(fetcher.requests(), vec![SEARCH, SEARCH_ALL, BOOKS]);
    }

    #[tokio::test]
    async fn test_unknown_uuid_skipped() {
        let fetcher = server();
        let mut model = model(&["A", "Z"]);

        let report = reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::Legacy,
            UnknownUuidPolicy::Skip,
        )
        .await
        .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, vec!["Z".to_string()]);
        assert_eq!(model.books()[0].timestamp(), at(2011, 1, 1));
        assert_eq!(model.books()[1].timestamp(), default_timestamp());
    }

    #[tokio::test]
    async fn test_unknown_uuid_abort_changes_nothing() {
        let fetcher = server();
        let mut model = model(&["A", "Z"]);

        let err = reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::Legacy,
            UnknownUuidPolicy::Abort,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OpdsError::UnknownBookUuid { ref uuid } if uuid == "Z"));
        assert_eq!(model.books()[0].timestamp(), default_timestamp());
    }

    #[tokio::test]
    async fn test_rest_failure_changes_nothing() {
        let fetcher = MemoryFetcher::new()
            .with_json(SEARCH, json!({"total_num": 3}))
            .with_json(SEARCH_ALL, json!({"book_ids": [1, 2, 3]}));
        let mut model = model(&["A"]);
        let generation = model.generation();

        let err = reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::Legacy,
            UnknownUuidPolicy::Skip,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OpdsError::RestEndpoint { ref url, .. } if url == BOOKS));
        assert_eq!(model.books()[0].timestamp(), default_timestamp());
        assert_eq!(model.generation(), generation);
    }

    #[tokio::test]
    async fn test_unexpected_json_shape_is_rest_error() {
        let fetcher = MemoryFetcher::new().with_json(SEARCH, json!({"count": "many"}));
        let mut model = model(&["A"]);

        let err = reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::Legacy,
            UnknownUuidPolicy::Skip,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            OpdsError::RestEndpoint {
                source: FetchError::Json(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_malformed_authoritative_timestamp_changes_nothing() {
        let fetcher = MemoryFetcher::new()
            .with_json(SEARCH, json!({"total_num": 2}))
            .with_json(
                "http://calibre.local:8080/ajax/search?num=2&offset=0",
                json!({"book_ids": [1, 2]}),
            )
            .with_json(
                "http://calibre.local:8080/ajax/books?ids=1,2",
                json!({
                    "1": {"uuid": "A", "timestamp": "2011-01-01T12:00:00+00:00"},
                    "2": {"uuid": "B", "timestamp": "soon"}
                }),
            );
        let mut model = model(&["A", "B"]);

        let err = reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::Legacy,
            UnknownUuidPolicy::Skip,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, OpdsError::MalformedTimestamp { .. }));
        assert_eq!(model.books()[0].timestamp(), default_timestamp());
    }

    #[tokio::test]
    async fn test_empty_server_skips_books_request() {
        let fetcher = MemoryFetcher::new()
            .with_json(SEARCH, json!({"total_num": 0}))
            .with_json(
                "http://calibre.local:8080/ajax/search?num=0&offset=0",
                json!({"book_ids": []}),
            );

        let records = fetch_authoritative_records(OPDS, &fetcher).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_offset_aware_mode() {
        let fetcher = MemoryFetcher::new()
            .with_json(SEARCH, json!({"total_num": 1}))
            .with_json(
                "http://calibre.local:8080/ajax/search?num=1&offset=0",
                json!({"book_ids": [1]}),
            )
            .with_json(
                "http://calibre.local:8080/ajax/books?ids=1",
                json!({"1": {"uuid": "A", "timestamp": "2011-01-01T14:00:00+02:00"}}),
            );
        let mut model = model(&["A"]);

        reconcile_timestamps(
            &mut model,
            OPDS,
            &fetcher,
            TimestampMode::OffsetAware,
            UnknownUuidPolicy::Abort,
        )
        .await
        .unwrap();

        assert_eq!(model.books()[0].timestamp(), at(2011, 1, 1));
    }
}
