use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Identifier of a book in the local library.
pub type BookId = i64;

/// Title used when a feed entry carries none.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Book metadata normalized from one catalog entry.
///
/// Every field is fixed at normalization time except `timestamp`, which the
/// timestamp reconciler may overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    title: String,
    authors: Vec<String>,
    uuid: String,
    timestamp: NaiveDateTime,
    tags: Vec<String>,
    links: Vec<String>,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        authors: Vec<String>,
        uuid: impl Into<String>,
        timestamp: NaiveDateTime,
        tags: Vec<String>,
        links: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            authors,
            uuid: uuid.into(),
            timestamp,
            tags,
            links,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Download URLs, best format first.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn download_url(&self) -> Option<&str> {
        self.links.first().map(String::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn display_authors(&self) -> String {
        self.authors.join(" & ")
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: NaiveDateTime) {
        self.timestamp = timestamp;
    }
}

/// Title and authors used to look a book up in the local library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookQuery {
    pub title: String,
    pub authors: Vec<String>,
}

impl BookQuery {
    pub fn for_book(book: &Book) -> Self {
        Self {
            title: book.title().to_string(),
            authors: book.authors().to_vec(),
        }
    }

    pub fn single_author(book: &Book, author: &str) -> Self {
        Self {
            title: book.title().to_string(),
            authors: vec![author.to_string()],
        }
    }
}
