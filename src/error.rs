//! Error types for the crawler.
//!
//! Each failure says whether retrying the same unit of work can help, and the
//! caller decides whether to skip it or escalate.

use thiserror::Error;

/// Fetching a document failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("server refused the request with status {status}")]
    Rejected { status: u16 },
}

impl FetchError {
    /// Client errors (4xx) will not go away on a second request.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(err) => !err.status().is_some_and(|s| s.is_client_error()),
            FetchError::Browser(_) => true,
            FetchError::Rejected { .. } => false,
        }
    }
}

/// Retrieving the listing URLs of a search results page failed.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("invalid listing URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("no listing URLs after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// Not one attempt produced a document.
    #[error("no document after {attempts} attempts: {source}")]
    Unreachable { attempts: u32, source: FetchError },
}

/// Extracting a job record from a detail page failed.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("missing element `{selector}`")]
    MissingElement { selector: &'static str },

    #[error("no job data after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl ExtractionError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractionError::Fetch(err) => err.is_retryable(),
            ExtractionError::MissingElement { .. } => true,
            ExtractionError::Exhausted { .. } => false,
        }
    }
}

/// A frontier or ingestion store operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A failure that stops the whole run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("listing error: {0}")]
    Listing(#[from] ListingError),
}
