use std::time::Duration;

use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.dice.com";
/// Hard cap on the number of result pages requested per term.
pub const MAX_PAGES: u32 = 100;
/// Results per listing page; a shorter page is the last one.
pub const PAGE_SIZE: usize = 100;
pub const MAX_TRIES_JOB_LISTING_URLS: u32 = 50;
pub const MAX_TRIES_JOB_DATA: u32 = 10;

#[derive(Debug, Clone)]
pub struct CrawlerOptions {
    pub base_url: Url,
    pub max_pages: u32,
    pub page_size: usize,
    /// Total fetches of a listing page, the first one included.
    pub max_listing_tries: u32,
    /// Highest attempt index for a detail page, counting from 0.
    pub max_extraction_tries: u32,
    pub retry_delay: Duration,
}

impl CrawlerOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            max_pages: MAX_PAGES,
            page_size: PAGE_SIZE,
            max_listing_tries: MAX_TRIES_JOB_LISTING_URLS,
            max_extraction_tries: MAX_TRIES_JOB_DATA,
            retry_delay: Duration::ZERO,
        }
    }
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        // the constant is a valid absolute URL
        let base_url = Url::parse(DEFAULT_BASE_URL).expect("default base URL");
        Self::new(base_url)
    }
}
