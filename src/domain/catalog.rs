use serde::Serialize;

/// Value recorded when the root feed response carries no `server` header.
pub const NO_SERVER_HEADER: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogLink {
    pub title: String,
    pub url: String,
}

/// Sub-catalogs announced by a root OPDS feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootCatalog {
    pub first_title: Option<String>,
    catalogs: Vec<CatalogLink>,
    pub server: String,
}

impl Default for RootCatalog {
    fn default() -> Self {
        Self {
            first_title: None,
            catalogs: Vec::new(),
            server: NO_SERVER_HEADER.to_string(),
        }
    }
}

impl RootCatalog {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Default::default()
        }
    }

    /// Records `title -> url`. A repeated title replaces the earlier URL but
    /// keeps its position.
    pub fn insert(&mut self, title: impl Into<String>, url: impl Into<String>) {
        let title = title.into();
        let url = url.into();
        match self.catalogs.iter_mut().find(|c| c.title == title) {
            Some(existing) => existing.url = url,
            None => self.catalogs.push(CatalogLink { title, url }),
        }
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.catalogs
            .iter()
            .find(|c| c.title == title)
            .map(|c| c.url.as_str())
    }

    /// URL of the first catalog title, if that entry had a link.
    pub fn first_url(&self) -> Option<&str> {
        self.first_title.as_deref().and_then(|t| self.get(t))
    }

    pub fn catalogs(&self) -> &[CatalogLink] {
        &self.catalogs
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.catalogs.iter().map(|c| c.title.as_str())
    }

    pub fn len(&self) -> usize {
        self.catalogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogs.is_empty()
    }

    /// Whether the server is a calibre content server, which exposes the
    /// REST endpoints used for timestamp reconciliation.
    pub fn is_calibre(&self) -> bool {
        self.server.starts_with("calibre")
    }
}
