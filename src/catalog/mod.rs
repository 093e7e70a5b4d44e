pub mod dedup;
pub mod model;
pub mod root;
pub mod walker;

pub use dedup::{find_identical_books, fix_book_timestamp, fix_book_timestamps};
pub use model::{CatalogModel, NEWS_TAG};
pub use root::{resolve_root, NO_TITLE};
pub use walker::{walk, PageLimit, PageWalker, DEFAULT_MAX_PAGES};
