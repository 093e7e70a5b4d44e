use thiserror::Error;

/// Failure of a single fetch through a [`FeedFetcher`](crate::fetcher::FeedFetcher)
/// or [`JsonFetcher`](crate::fetcher::JsonFetcher).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("JSON decoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("No document at {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum OpdsError {
    #[error("Failed opening the OPDS URL {url}: {source}")]
    FeedUnreachable {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Malformed timestamp: {value:?}")]
    MalformedTimestamp { value: String },

    #[error("No authoritative record for book uuid {uuid:?}")]
    UnknownBookUuid { uuid: String },

    #[error("REST request to {url} failed: {source}")]
    RestEndpoint {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog not found: {0}")]
    CatalogNotFound(String),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] crate::config::ConfigError),

    #[error("Failed to hand off {url}: {message}")]
    Launch { url: String, message: String },
}

pub type Result<T> = std::result::Result<T, OpdsError>;
