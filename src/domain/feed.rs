use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Link relation marking the following page of a paginated feed.
pub const REL_NEXT: &str = "next";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub href: String,
    pub rel: Option<String>,
    pub media_type: Option<String>,
}

impl RawLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: None,
            media_type: None,
        }
    }

    pub fn with_rel(mut self, rel: impl Into<String>) -> Self {
        self.rel = Some(rel.into());
        self
    }

    pub fn with_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// One entry of an OPDS feed, as extracted from the document.
///
/// `updated` keeps the textual timestamp so the normalizer decides how it is
/// interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub title: Option<String>,
    pub author: Option<String>,
    pub id: Option<String>,
    pub updated: Option<String>,
    pub summary: Option<String>,
    pub links: Vec<RawLink>,
}

/// A fetched feed page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub entries: Vec<RawEntry>,
    pub links: Vec<RawLink>,
    /// Response headers, names lower-cased.
    pub headers: HashMap<String, String>,
}

impl ParsedFeed {
    pub fn next_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel.as_deref() == Some(REL_NEXT))
            .map(|link| link.href.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
