pub mod timestamp;

pub use timestamp::{default_timestamp, parse_timestamp, TimestampMode};

use crate::app::Result;
use crate::domain::{Book, RawEntry, RawLink, UNKNOWN_TITLE};

const UUID_PREFIX: &str = "urn:uuid:";
const TAGS_PREFIX: &str = "TAGS: ";
const EPUB_MEDIA_TYPE: &str = "application/epub+zip";

/// Turns raw feed entries into [`Book`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    mode: TimestampMode,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: TimestampMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> TimestampMode {
        self.mode
    }

    /// Missing fields fall back to defaults. The only failure is an `updated`
    /// value that is present but unparseable.
    pub fn normalize(&self, entry: &RawEntry) -> Result<Book> {
        let title = entry.title.as_deref().unwrap_or(UNKNOWN_TITLE);
        let authors = split_authors(entry.author.as_deref().unwrap_or(""));
        let uuid = entry.id.as_deref().map(strip_uuid_prefix).unwrap_or("");
        let timestamp = match entry.updated.as_deref() {
            Some(raw) => parse_timestamp(raw, self.mode)?,
            None => default_timestamp(),
        };
        let tags = extract_tags(entry.summary.as_deref().unwrap_or(""));
        let links = rank_links(&entry.links);

        Ok(Book::new(title, authors, uuid, timestamp, tags, links))
    }

    pub fn normalize_all(&self, entries: &[RawEntry]) -> Result<Vec<Book>> {
        entries.iter().map(|entry| self.normalize(entry)).collect()
    }
}

/// Splits `"A & B"` into `["A", "B"]`.
///
/// `"& "` is collapsed to `"&"` before splitting. An empty string gives a
/// single empty author.
pub fn split_authors(raw: &str) -> Vec<String> {
    raw.replace("& ", "&")
        .split('&')
        .map(|author| author.trim().to_string())
        .collect()
}

pub fn strip_uuid_prefix(id: &str) -> &str {
    id.strip_prefix(UUID_PREFIX).unwrap_or(id)
}

/// Reads tags from the `TAGS: ` line of an entry summary. When several lines
/// match, the last one wins.
pub fn extract_tags(summary: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for line in summary.lines() {
        if let Some(raw) = line.strip_prefix(TAGS_PREFIX) {
            tags = raw
                .replace("<br />", "")
                .replace(", ", ",")
                .split(',')
                .map(String::from)
                .collect();
        }
    }
    tags
}

/// Download URLs ordered by preference: EPUB first, other formats in feed
/// order, images (covers and thumbnails) dropped.
pub fn rank_links(links: &[RawLink]) -> Vec<String> {
    let mut ranked = Vec::new();
    for link in links {
        let media_type = link.media_type.as_deref().unwrap_or("");
        if media_type.starts_with("image/") {
            continue;
        }
        if media_type == EPUB_MEDIA_TYPE {
            ranked.insert(0, link.href.clone());
        } else {
            ranked.push(link.href.clone());
        }
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::OpdsError;
    use chrono::NaiveDate;

    fn entry() -> RawEntry {
        RawEntry {
            title: Some("The Hobbit".into()),
            author: Some("J. R. R. Tolkien".into()),
            id: Some("urn:uuid:6f1c1d2e-0000-4000-8000-000000000001".into()),
            updated: Some("2019-05-04T10:11:12+00:00".into()),
            summary: Some("RATING: ★★★★\nTAGS: Fantasy, Classics\nSERIES: Middle-earth".into()),
            links: vec![
                RawLink::new("/get/cover/1").with_type("image/jpeg"),
                RawLink::new("/get/epub/1").with_type(EPUB_MEDIA_TYPE),
            ],
        }
    }

    #[test]
    fn test_split_authors_with_space() {
        assert_eq!(split_authors("X & Y"), vec!["X", "Y"]);
    }

    #[test]
    fn test_split_authors_without_space() {
        assert_eq!(split_authors("X&Y"), vec!["X", "Y"]);
    }

    #[test]
    fn test_split_three_authors() {
        assert_eq!(split_authors("X & Y & Z"), vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_split_empty_author() {
        assert_eq!(split_authors(""), vec![""]);
    }

    #[test]
    fn test_strip_uuid_prefix_once() {
        assert_eq!(strip_uuid_prefix("urn:uuid:abc"), "abc");
        assert_eq!(strip_uuid_prefix("urn:uuid:urn:uuid:abc"), "urn:uuid:abc");
        assert_eq!(strip_uuid_prefix("tag:example.com,1"), "tag:example.com,1");
    }

    #[test]
    fn test_extract_tags() {
        let tags = extract_tags("line1\nTAGS: Fiction, <br />Drama\nline3");
        assert_eq!(tags, vec!["Fiction", "Drama"]);
    }

    #[test]
    fn test_extract_tags_last_line_wins() {
        let tags = extract_tags("TAGS: A, B\nsomething\nTAGS: C");
        assert_eq!(tags, vec!["C"]);
    }

    #[test]
    fn test_extract_tags_without_tag_line() {
        assert!(extract_tags("just a description").is_empty());
        assert!(extract_tags("").is_empty());
    }

    #[test]
    fn test_rank_links_promotes_epub_and_drops_images() {
        let links = vec![
            RawLink::new("cover.jpg").with_type("image/jpeg"),
            RawLink::new("book.mobi").with_type("application/x-mobipocket-ebook"),
            RawLink::new("book.epub").with_type(EPUB_MEDIA_TYPE),
        ];
        assert_eq!(rank_links(&links), vec!["book.epub", "book.mobi"]);
    }

    #[test]
    fn test_rank_links_keeps_untyped_links_in_order() {
        let links = vec![
            RawLink::new("a"),
            RawLink::new("thumb.png").with_type("image/png"),
            RawLink::new("b.azw3").with_type("application/x-mobi8-ebook"),
        ];
        assert_eq!(rank_links(&links), vec!["a", "b.azw3"]);
    }

    #[test]
    fn test_normalize_full_entry() {
        let book = Normalizer::new().normalize(&entry()).unwrap();

        assert_eq!(book.title(), "The Hobbit");
        assert_eq!(book.authors(), ["J. R. R. Tolkien"]);
        assert_eq!(book.uuid(), "6f1c1d2e-0000-4000-8000-000000000001");
        assert_eq!(
            book.timestamp(),
            NaiveDate::from_ymd_opt(2019, 5, 4)
                .unwrap()
                .and_hms_opt(10, 11, 12)
                .unwrap()
        );
        assert_eq!(book.tags(), ["Fantasy", "Classics"]);
        assert_eq!(book.links(), ["/get/epub/1"]);
    }

    #[test]
    fn test_normalize_empty_entry_uses_defaults() {
        let book = Normalizer::new().normalize(&RawEntry::default()).unwrap();

        assert_eq!(book.title(), UNKNOWN_TITLE);
        assert_eq!(book.authors(), [""]);
        assert_eq!(book.uuid(), "");
        assert_eq!(book.timestamp(), default_timestamp());
        assert!(book.tags().is_empty());
        assert!(book.links().is_empty());
    }

    #[test]
    fn test_normalize_utc_updated() {
        let mut raw = entry();
        raw.updated = Some("2020-01-01T12:00:00Z".into());
        let book = Normalizer::new().normalize(&raw).unwrap();
        assert_eq!(
            book.timestamp(),
            NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_normalize_malformed_updated_fails() {
        let mut raw = entry();
        raw.updated = Some("last tuesday".into());
        let err = Normalizer::new().normalize(&raw).unwrap_err();
        assert!(matches!(err, OpdsError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_normalize_all_keeps_order() {
        let mut second = entry();
        second.title = Some("The Silmarillion".into());
        let books = Normalizer::new().normalize_all(&[entry(), second]).unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title()).collect();
        assert_eq!(titles, vec!["The Hobbit", "The Silmarillion"]);
    }
}
