use std::time::Duration;

/// Counters for one run of the crawler.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    pub num_terms: usize,
    pub num_pages: usize,
    pub num_listing_errors: usize,
    pub num_extractions: usize,
    pub num_extraction_errors: usize,
    pub num_jobs_inserted: usize,
    pub num_duplicate_jobs: usize,
    pub num_new_terms: usize,
    pub num_store_errors: usize,
}

impl Statistics {
    pub fn write_to_log(&self, running_time: Duration) {
        tracing::info!(
            num_terms = self.num_terms,
            num_pages = self.num_pages,
            num_listing_errors = self.num_listing_errors,
            num_extractions = self.num_extractions,
            num_extraction_errors = self.num_extraction_errors,
            num_jobs_inserted = self.num_jobs_inserted,
            num_duplicate_jobs = self.num_duplicate_jobs,
            num_new_terms = self.num_new_terms,
            num_store_errors = self.num_store_errors,
            running_time = ?running_time,
            "statistics"
        );
    }
}
