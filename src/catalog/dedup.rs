//! Matching catalog books against identical books in the local library.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::app::Result;
use crate::domain::{Book, BookId, BookQuery};
use crate::library::Library;

/// Ids of local books identical to `book`.
///
/// A book with several authors may be filed locally under a different
/// combination of them, so each author is queried on its own and the
/// results are unioned. With zero or one author a single query is issued.
pub fn find_identical_books<L: Library + ?Sized>(library: &L, book: &Book) -> HashSet<BookId> {
    if book.authors().len() < 2 {
        return library.find_identical_books(&BookQuery::for_book(book));
    }

    book.authors()
        .iter()
        .flat_map(|author| library.find_identical_books(&BookQuery::single_author(book, author)))
        .collect()
}

/// Copies the catalog timestamp of `book` onto every identical local book.
/// Returns the number of local books changed.
pub fn fix_book_timestamp<L: Library + ?Sized>(library: &L, book: &Book) -> Result<usize> {
    let ids = find_identical_books(library, book);
    if ids.is_empty() {
        tracing::warn!("Failed to set timestamp of book: {}", book.title());
        return Ok(0);
    }

    let updates: HashMap<BookId, NaiveDateTime> =
        ids.into_iter().map(|id| (id, book.timestamp())).collect();
    library.set_timestamps(&updates)
}

/// [`fix_book_timestamp`] over a selection, last selected first.
pub fn fix_book_timestamps<L: Library + ?Sized>(library: &L, books: &[&Book]) -> Result<usize> {
    let mut changed = 0;
    for book in books.iter().rev() {
        changed += fix_book_timestamp(library, book)?;
    }
    Ok(changed)
}
