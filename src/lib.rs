//! A crawler that collects job postings from a job board and grows its own
//! list of search terms from the titles it finds.

pub mod crawler;
pub mod error;
pub mod extract;
pub mod frontier;
pub mod ingest;
pub mod listing;
pub mod options;
mod record;
pub mod store;

pub use crawler::{Crawler, Statistics};
pub use error::{CrawlError, ExtractionError, FetchError, ListingError, StoreError};
pub use options::CrawlerOptions;
pub use record::{JobRecord, SearchTerm};
