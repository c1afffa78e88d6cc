//! The crawl driver.
//!
//! One term at a time is taken from the frontier and its result pages are
//! walked in order. Every listing on a page is extracted and stored, and the
//! words of its title become new terms. A term is marked checked once its
//! last page has been processed, and the run ends when every term in the
//! frontier is checked.
//!
//! All progress lives in the stores, so a killed run can simply be started
//! again.

use std::sync::Arc;

use tokio::time::Instant;

use crate::error::{CrawlError, ListingError};
use crate::extract::{DocumentFetcher, RecordExtractor};
use crate::frontier::{add_terms, FrontierStore};
use crate::ingest::{ingest, Ingested, IngestionStore};
use crate::listing::{BrowserClient, ListingRetriever};
use crate::options::CrawlerOptions;

mod statistics;

pub use statistics::Statistics;

/// What the frontier offers next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Term(String),
    /// The frontier is empty; crawl the unqualified search.
    Seed,
    /// Every term has been checked.
    Exhausted,
}

pub struct Crawler {
    options: CrawlerOptions,
    listing: ListingRetriever,
    extractor: RecordExtractor,
    frontier: Arc<dyn FrontierStore>,
    ingestion: Arc<dyn IngestionStore>,
}

impl Crawler {
    pub fn new(
        options: CrawlerOptions,
        browser: Arc<dyn BrowserClient>,
        fetcher: Arc<dyn DocumentFetcher>,
        frontier: Arc<dyn FrontierStore>,
        ingestion: Arc<dyn IngestionStore>,
    ) -> Self {
        Self {
            listing: ListingRetriever::new(browser, &options),
            extractor: RecordExtractor::new(fetcher, &options),
            options,
            frontier,
            ingestion,
        }
    }

    /// Crawls until every term in the frontier is checked.
    ///
    /// Only frontier bookkeeping failures and a browser that renders nothing
    /// end the run early; anything else skips the page or listing it
    /// happened on.
    pub async fn run(&self) -> Result<Statistics, CrawlError> {
        tracing::info!(base_url = %self.options.base_url, "crawler: starting");
        let starting_time = Instant::now();
        let mut stats = Statistics::default();

        loop {
            let term = match self.select_term().await? {
                Selection::Term(term) => term,
                Selection::Seed => {
                    tracing::info!("crawler: frontier is empty, starting with an unqualified search");
                    String::new()
                }
                Selection::Exhausted => {
                    tracing::info!("crawler: all search terms are checked, stopping");
                    break;
                }
            };
            self.crawl_term(&term, &mut stats).await?;
        }

        stats.write_to_log(starting_time.elapsed());
        Ok(stats)
    }

    /// Picks the next term. The empty seed term is recorded in the frontier
    /// so that it is crawled only once.
    pub async fn select_term(&self) -> Result<Selection, CrawlError> {
        if self.frontier.is_empty().await? {
            self.frontier.add_if_absent("").await?;
            return Ok(Selection::Seed);
        }
        Ok(match self.frontier.next_unchecked().await? {
            Some(term) => Selection::Term(term),
            None => Selection::Exhausted,
        })
    }

    /// Walks the result pages of `term`, then marks it checked. A term whose
    /// pages the browser cannot load at all stays unchecked.
    pub async fn crawl_term(&self, term: &str, stats: &mut Statistics) -> Result<(), CrawlError> {
        tracing::info!(term, "crawler: crawling term");

        for page in 1..=self.options.max_pages {
            let urls = match self.listing.retrieve(term, page).await {
                Ok(urls) => urls,
                Err(err @ ListingError::Unreachable { .. }) => {
                    tracing::error!(term, page, "crawler: browser unusable, leaving term unchecked");
                    return Err(err.into());
                }
                Err(err) => {
                    stats.num_listing_errors += 1;
                    tracing::warn!(term, page, "crawler: skipping page: {}", err);
                    continue;
                }
            };
            stats.num_pages += 1;

            for (index, url) in urls.iter().enumerate() {
                self.process_listing(url, index, urls.len(), stats).await;
            }

            if urls.len() < self.options.page_size {
                tracing::info!(
                    term,
                    page,
                    count = urls.len(),
                    "crawler: short page, skipping the remaining pages"
                );
                break;
            }
        }

        self.frontier.mark_checked(term).await?;
        stats.num_terms += 1;
        tracing::info!(term, "crawler: term checked");
        Ok(())
    }

    async fn process_listing(&self, url: &str, index: usize, total: usize, stats: &mut Statistics) {
        let record = match self.extractor.extract(url).await {
            Ok(record) => record,
            Err(err) => {
                stats.num_extraction_errors += 1;
                tracing::warn!(url, "crawler: skipping listing {} of {}: {}", index + 1, total, err);
                return;
            }
        };
        stats.num_extractions += 1;

        match ingest(self.ingestion.as_ref(), &record).await {
            Some(Ingested::Inserted) => stats.num_jobs_inserted += 1,
            Some(Ingested::Duplicate) => stats.num_duplicate_jobs += 1,
            None => stats.num_store_errors += 1,
        }

        let insertions = add_terms(self.frontier.as_ref(), &record).await;
        stats.num_new_terms += insertions.created;
        stats.num_store_errors += insertions.failed;
    }
}
