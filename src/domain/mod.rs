pub mod book;
pub mod catalog;
pub mod feed;

pub use book::{Book, BookId, BookQuery, UNKNOWN_TITLE};
pub use catalog::{CatalogLink, RootCatalog, NO_SERVER_HEADER};
pub use feed::{ParsedFeed, RawEntry, RawLink, REL_NEXT};
