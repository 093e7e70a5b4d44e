use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::app::Result;
use crate::catalog::walker::{PageLimit, PageWalker};
use crate::domain::Book;
use crate::fetcher::FeedFetcher;
use crate::library::Library;
use crate::normalizer::Normalizer;

/// Tag carried by newspaper entries.
pub const NEWS_TAG: &str = "News";

/// The books of the current catalog plus a filtered view over them.
///
/// The view is a list of indices into `books`, rebuilt by a full pass
/// whenever the books or a filter flag change.
pub struct CatalogModel {
    library: Arc<dyn Library + Send + Sync>,
    books: Vec<Book>,
    filtered: Vec<usize>,
    hide_newspapers: bool,
    hide_already_in_library: bool,
    generation: u64,
}

impl std::fmt::Debug for CatalogModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogModel")
            .field("books", &self.books)
            .field("filtered", &self.filtered)
            .field("hide_newspapers", &self.hide_newspapers)
            .field("hide_already_in_library", &self.hide_already_in_library)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl CatalogModel {
    pub fn new(library: Arc<dyn Library + Send + Sync>) -> Self {
        Self {
            library,
            books: Vec::new(),
            filtered: Vec::new(),
            hide_newspapers: false,
            hide_already_in_library: false,
            generation: 0,
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Books passing both filters, in catalog order.
    pub fn filtered(&self) -> impl Iterator<Item = &Book> + '_ {
        self.filtered.iter().map(move |&i| &self.books[i])
    }

    pub fn filtered_indices(&self) -> &[usize] {
        &self.filtered
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    /// Number of times the filtered view has been rebuilt.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn hide_newspapers(&self) -> bool {
        self.hide_newspapers
    }

    pub fn hide_already_in_library(&self) -> bool {
        self.hide_already_in_library
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.uuid() == uuid)
    }

    pub fn set_books(&mut self, books: Vec<Book>) {
        self.books = books;
        self.refilter();
    }

    pub fn append_books(&mut self, mut books: Vec<Book>) {
        self.books.append(&mut books);
        self.refilter();
    }

    pub fn set_hide_newspapers(&mut self, value: bool) {
        if value != self.hide_newspapers {
            self.hide_newspapers = value;
            self.refilter();
        }
    }

    pub fn set_hide_already_in_library(&mut self, value: bool) {
        if value != self.hide_already_in_library {
            self.hide_already_in_library = value;
            self.refilter();
        }
    }

    pub fn refilter(&mut self) {
        let filtered: Vec<usize> = self
            .books
            .iter()
            .enumerate()
            .filter(|(_, book)| !self.is_filtered_news(book) && !self.is_filtered_in_library(book))
            .map(|(i, _)| i)
            .collect();
        self.filtered = filtered;
        self.generation += 1;
    }

    fn is_filtered_news(&self, book: &Book) -> bool {
        self.hide_newspapers && book.has_tag(NEWS_TAG)
    }

    fn is_filtered_in_library(&self, book: &Book) -> bool {
        self.hide_already_in_library && self.library.has_book(book)
    }

    /// Overwrites timestamps by book index, then rebuilds the view.
    pub(crate) fn apply_timestamps(&mut self, updates: &[(usize, NaiveDateTime)]) {
        for &(index, timestamp) in updates {
            if let Some(book) = self.books.get_mut(index) {
                book.set_timestamp(timestamp);
            }
        }
        self.refilter();
    }

    /// Replaces the held books with the catalog at `url`, page by page.
    ///
    /// Each page is appended and filtered as soon as it arrives. If a later
    /// page fails, the books already appended stay in the model and the
    /// error is returned.
    pub async fn download_catalog<F: FeedFetcher + ?Sized>(
        &mut self,
        url: &str,
        fetcher: &F,
        normalizer: &Normalizer,
        limit: PageLimit,
    ) -> Result<usize> {
        tracing::debug!("Downloading catalog: {}", url);
        self.set_books(Vec::new());

        let mut walker = PageWalker::new(fetcher, url, limit);
        while let Some(entries) = walker.next_page().await? {
            let books = normalizer.normalize_all(&entries)?;
            self.append_books(books);
        }

        tracing::info!(
            "Downloaded {} books in {} pages from {}",
            self.books.len(),
            walker.pages_fetched(),
            url
        );
        Ok(self.books.len())
    }
}
