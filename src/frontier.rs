//! The frontier: search terms still to be crawled.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::JobRecord;

#[async_trait]
pub trait FrontierStore: Send + Sync {
    /// True iff the store holds no terms at all, checked or not.
    async fn is_empty(&self) -> Result<bool, StoreError>;

    /// Any one term that has not been checked yet.
    async fn next_unchecked(&self) -> Result<Option<String>, StoreError>;

    /// Inserts an unchecked term unless one with that name exists.
    /// Returns whether a row was created.
    async fn add_if_absent(&self, name: &str) -> Result<bool, StoreError>;

    async fn mark_checked(&self, name: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TermInsertions {
    pub created: usize,
    pub failed: usize,
}

/// Feeds the title tokens of `record` back into the frontier, one term at a
/// time. Failures are logged and skipped.
pub async fn add_terms(frontier: &dyn FrontierStore, record: &JobRecord) -> TermInsertions {
    let mut insertions = TermInsertions::default();
    for term in record.search_terms() {
        match frontier.add_if_absent(term).await {
            Ok(true) => {
                tracing::debug!(term, "frontier: new search term");
                insertions.created += 1;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::error!(term, "frontier: failed to add search term: {}", err);
                insertions.failed += 1;
            }
        }
    }
    insertions
}
