use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::frontier::FrontierStore;
use crate::ingest::{IngestionStore, Ingested};
use crate::record::{JobRecord, SearchTerm};

/// An in-process store, for dry runs and tests. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    terms: RwLock<BTreeMap<String, bool>>,
    jobs: RwLock<Vec<JobRecord>>,
    fail_term_inserts: bool,
    fail_job_inserts: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every frontier insert fail.
    pub fn failing_term_inserts(mut self) -> Self {
        self.fail_term_inserts = true;
        self
    }

    /// Makes every job insert fail.
    pub fn failing_job_inserts(mut self) -> Self {
        self.fail_job_inserts = true;
        self
    }

    pub async fn terms(&self) -> Vec<SearchTerm> {
        self.terms
            .read()
            .await
            .iter()
            .map(|(name, checked)| SearchTerm {
                name: name.clone(),
                checked: *checked,
            })
            .collect()
    }

    pub async fn jobs(&self) -> Vec<JobRecord> {
        self.jobs.read().await.clone()
    }
}

#[async_trait]
impl FrontierStore for MemoryStore {
    async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.terms.read().await.is_empty())
    }

    async fn next_unchecked(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .terms
            .read()
            .await
            .iter()
            .find(|(_, checked)| !**checked)
            .map(|(name, _)| name.clone()))
    }

    async fn add_if_absent(&self, name: &str) -> Result<bool, StoreError> {
        if self.fail_term_inserts {
            return Err(StoreError::Unavailable(format!(
                "refusing to insert term '{name}'"
            )));
        }
        let mut terms = self.terms.write().await;
        if terms.contains_key(name) {
            return Ok(false);
        }
        terms.insert(name.to_string(), false);
        Ok(true)
    }

    async fn mark_checked(&self, name: &str) -> Result<(), StoreError> {
        if let Some(checked) = self.terms.write().await.get_mut(name) {
            *checked = true;
        }
        Ok(())
    }
}

#[async_trait]
impl IngestionStore for MemoryStore {
    async fn add_if_absent(&self, record: &JobRecord) -> Result<Ingested, StoreError> {
        if self.fail_job_inserts {
            return Err(StoreError::Unavailable("refusing to insert job".into()));
        }
        // holding the write guard across check and insert
        let mut jobs = self.jobs.write().await;
        if jobs.iter().any(|job| job.description == record.description) {
            return Ok(Ingested::Duplicate);
        }
        jobs.push(record.clone());
        Ok(Ingested::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn adding_a_term_twice_leaves_one_row() {
        let store = MemoryStore::new();
        assert!(FrontierStore::add_if_absent(&store, "Rust").await.unwrap());
        assert!(!FrontierStore::add_if_absent(&store, "Rust").await.unwrap());
        assert_eq!(store.terms().await, vec![SearchTerm {
                name: "Rust".to_string(),
                checked: false
            }]);
    }

    #[tokio::test]
    async fn re_adding_a_checked_term_keeps_it_checked() {
        let store = MemoryStore::new();
        FrontierStore::add_if_absent(&store, "Rust").await.unwrap();
        store.mark_checked("Rust").await.unwrap();
        FrontierStore::add_if_absent(&store, "Rust").await.unwrap();
        assert_eq!(store.next_unchecked().await.unwrap(), None);
    }

    #[tokio::test]
    async fn fully_checked_frontier_is_not_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await.unwrap());

        FrontierStore::add_if_absent(&store, "Rust").await.unwrap();
        store.mark_checked("Rust").await.unwrap();

        assert!(!store.is_empty().await.unwrap());
        assert_eq!(store.next_unchecked().await.unwrap(), None);
    }

    #[tokio::test]
    async fn next_unchecked_skips_checked_terms() {
        let store = MemoryStore::new();
        FrontierStore::add_if_absent(&store, "Data").await.unwrap();
        FrontierStore::add_if_absent(&store, "Engineer").await.unwrap();
        store.mark_checked("Data").await.unwrap();

        assert_eq!(
            store.next_unchecked().await.unwrap().as_deref(),
            Some("Engineer")
        );
    }

    #[tokio::test]
    async fn marking_an_unknown_term_is_a_no_op() {
        let store = MemoryStore::new();
        store.mark_checked("Rust").await.unwrap();
        assert!(store.is_empty().await.unwrap());
    }
}
