//! # opds-reader
//!
//! A command-line OPDS catalog client with calibre timestamp reconciliation.
//!
//! ## Architecture
//!
//! opds-reader follows a pipeline architecture:
//!
//! ```text
//! Fetcher → Walker → Normalizer → Catalog Model → Reconciler
//!                                      ↕
//!                                   Library
//! ```
//!
//! - [`fetcher`]: HTTP client returning parsed Atom pages and JSON
//! - [`catalog`]: root feed resolution, pagination, filtering and dedup
//! - [`normalizer`]: converts raw entries into [`Book`](domain::Book)s
//! - [`reconcile`]: pulls authoritative timestamps from calibre's REST API
//! - [`library`]: the local library index, SQLite backed
//!
//! ## Quick Start
//!
//! ```bash
//! # List the catalogs of a server (the URL is remembered)
//! opds-reader --url http://localhost:8080/opds catalogs
//!
//! # List the books of a catalog
//! opds-reader books --catalog "By Newest"
//!
//! # Hand a book to the system opener
//! opds-reader download 0f9b0ff1-3b3a-4d6a-8a3c-6b2f7b9d1e22
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// configuration, library, fetcher, normalizer.
pub mod app;

/// Catalog browsing.
///
/// - [`resolve_root`](catalog::resolve_root): the sub-catalogs of a root feed
/// - [`PageWalker`](catalog::PageWalker): follows `next` links page by page
/// - [`CatalogModel`](catalog::CatalogModel): the books plus a filtered view
/// - [`find_identical_books`](catalog::find_identical_books): matching against the library
pub mod catalog;

/// Command-line interface using clap.
///
/// - `catalogs` - List the catalogs of the root feed
/// - `books` - List the books of a catalog
/// - `download <uuid>...` - Hand books to the system opener
/// - `fix-timestamps <uuid>...` - Copy catalog timestamps onto local books
/// - `urls` - Show the URL history
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/opds-reader/config.toml`.
pub mod config;

/// Core domain models.
pub mod domain;

/// Fetch capabilities.
///
/// - [`FeedFetcher`](fetcher::FeedFetcher) and [`JsonFetcher`](fetcher::JsonFetcher): async traits
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation with retries
pub mod fetcher;

/// The local library index.
///
/// - [`Library`](library::Library): trait consumed by the catalog
/// - [`SqliteLibrary`](library::sqlite::SqliteLibrary): SQLite implementation
pub mod library;

/// Entry normalization and timestamp parsing.
pub mod normalizer;

/// Timestamp reconciliation against calibre's REST endpoints.
pub mod reconcile;
