use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::NaiveDateTime;

use crate::app::Result;
use crate::domain::{Book, BookId, BookQuery};
use crate::library::{authors_match, title_key, Library};

/// In-memory library that records the queries it receives.
#[derive(Default)]
pub(crate) struct StubLibrary {
    books: Vec<(BookId, String, Vec<String>)>,
    pub queries: Mutex<Vec<BookQuery>>,
    pub has_book_calls: Mutex<usize>,
    pub timestamps: Mutex<HashMap<BookId, NaiveDateTime>>,
}

impl StubLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_book(mut self, id: BookId, title: &str, authors: &[&str]) -> Self {
        self.books.push((
            id,
            title.to_string(),
            authors.iter().map(|a| a.to_string()).collect(),
        ));
        self
    }
}

impl Library for StubLibrary {
    fn has_book(&self, book: &Book) -> bool {
        if let Ok(mut calls) = self.has_book_calls.lock() {
            *calls += 1;
        }
        let key = title_key(book.title());
        self.books.iter().any(|(_, title, _)| title_key(title) == key)
    }

    fn find_identical_books(&self, query: &BookQuery) -> HashSet<BookId> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.clone());
        }
        let key = title_key(&query.title);
        self.books
            .iter()
            .filter(|(_, title, authors)| {
                title_key(title) == key && authors_match(&query.authors, authors)
            })
            .map(|(id, _, _)| *id)
            .collect()
    }

    fn set_timestamps(&self, updates: &HashMap<BookId, NaiveDateTime>) -> Result<usize> {
        if let Ok(mut timestamps) = self.timestamps.lock() {
            timestamps.extend(updates.iter().map(|(id, ts)| (*id, *ts)));
        }
        Ok(updates.len())
    }
}
