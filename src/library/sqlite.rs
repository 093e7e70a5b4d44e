use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{OpdsError, Result};
use crate::domain::{Book, BookId, BookQuery};
use crate::library::{authors_match, title_key, Library, LocalBook};
use crate::normalizer::default_timestamp;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Local library index backed by SQLite. Only metadata is stored.
pub struct SqliteLibrary {
    conn: Mutex<Connection>,
}

impl SqliteLibrary {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let library = Self {
            conn: Mutex::new(conn),
        };
        library.run_migrations()?;
        Ok(library)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let library = Self {
            conn: Mutex::new(conn),
        };
        library.run_migrations()?;
        Ok(library)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| OpdsError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            OpdsError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn format_timestamp(ts: NaiveDateTime) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }

    fn parse_timestamp(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_else(|_| default_timestamp())
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    fn row_to_book(row: &Row<'_>) -> rusqlite::Result<LocalBook> {
        let authors: String = row.get(2)?;
        Ok(LocalBook {
            id: row.get(0)?,
            title: row.get(1)?,
            authors: serde_json::from_str(&authors).unwrap_or_default(),
            uuid: row.get(3)?,
            timestamp: Self::parse_timestamp(&row.get::<_, String>(4)?),
            source_url: row.get(5)?,
            added_at: row
                .get::<_, String>(6)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }

    /// Records a catalog book in the index and returns its id.
    pub fn add_book(&self, book: &Book, source_url: Option<&str>) -> Result<BookId> {
        let authors = serde_json::to_string(book.authors())?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO books (title, title_key, authors, uuid, timestamp, source_url, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                book.title(),
                title_key(book.title()),
                authors,
                book.uuid(),
                Self::format_timestamp(book.timestamp()),
                source_url,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_book(&self, id: BookId) -> Result<Option<LocalBook>> {
        let conn = self.lock()?;
        let book = conn
            .query_row(
                "SELECT id, title, authors, uuid, timestamp, source_url, added_at
                 FROM books WHERE id = ?1",
                params![id],
                Self::row_to_book,
            )
            .optional()?;
        Ok(book)
    }

    pub fn get_all_books(&self) -> Result<Vec<LocalBook>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, authors, uuid, timestamp, source_url, added_at
             FROM books ORDER BY title_key, id",
        )?;
        let books = stmt
            .query_map([], Self::row_to_book)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(books)
    }

    /// A book is held when its uuid is known or a book with the same title
    /// is indexed.
    pub fn contains(&self, book: &Book) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM books WHERE (uuid != '' AND uuid = ?1) OR title_key = ?2",
            params![book.uuid(), title_key(book.title())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn identical_ids(&self, query: &BookQuery) -> Result<HashSet<BookId>> {
        let candidates = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, title, authors, uuid, timestamp, source_url, added_at
                 FROM books WHERE title_key = ?1",
            )?;
            let rows = stmt
                .query_map(params![title_key(&query.title)], Self::row_to_book)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        Ok(candidates
            .into_iter()
            .filter(|book| authors_match(&query.authors, &book.authors))
            .map(|book| book.id)
            .collect())
    }

    pub fn update_timestamps(&self, updates: &HashMap<BookId, NaiveDateTime>) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare("UPDATE books SET timestamp = ?1 WHERE id = ?2")?;
            for (id, timestamp) in updates {
                changed += stmt.execute(params![Self::format_timestamp(*timestamp), id])?;
            }
        }
        tx.commit()?;
        Ok(changed)
    }
}

impl Library for SqliteLibrary {
    fn has_book(&self, book: &Book) -> bool {
        self.contains(book).unwrap_or_else(|e| {
            tracing::warn!("Library lookup for {:?} failed: {}", book.title(), e);
            false
        })
    }

    fn find_identical_books(&self, query: &BookQuery) -> HashSet<BookId> {
        self.identical_ids(query).unwrap_or_else(|e| {
            tracing::warn!("Identical book lookup for {:?} failed: {}", query.title, e);
            HashSet::new()
        })
    }

    fn set_timestamps(&self, updates: &HashMap<BookId, NaiveDateTime>) -> Result<usize> {
        self.update_timestamps(updates)
    }
}
