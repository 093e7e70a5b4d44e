pub mod sqlite;

#[cfg(test)]
pub(crate) mod stub;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::Result;
use crate::domain::{Book, BookId, BookQuery};

pub use sqlite::SqliteLibrary;

/// The local library the catalog is compared against.
pub trait Library {
    /// Whether the library already holds this book.
    fn has_book(&self, book: &Book) -> bool;

    /// Ids of local books matching the query's title and authors.
    fn find_identical_books(&self, query: &BookQuery) -> HashSet<BookId>;

    /// Overwrites the timestamp of each listed book, returning how many
    /// were changed.
    fn set_timestamps(&self, updates: &HashMap<BookId, NaiveDateTime>) -> Result<usize>;
}

/// A book recorded in the local library index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalBook {
    pub id: BookId,
    pub title: String,
    pub authors: Vec<String>,
    pub uuid: String,
    pub timestamp: NaiveDateTime,
    pub source_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// Case- and whitespace-insensitive form of a title used for matching.
pub fn title_key(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether every named author of the query appears among `authors`.
/// Empty query names match anything.
pub fn authors_match(query: &[String], authors: &[String]) -> bool {
    let have: HashSet<String> = authors.iter().map(|a| title_key(a)).collect();
    query
        .iter()
        .map(|a| title_key(a))
        .filter(|a| !a.is_empty())
        .all(|a| have.contains(&a))
}
