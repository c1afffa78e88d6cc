use async_trait::async_trait;

use crate::error::StoreError;
use crate::record::JobRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Inserted,
    /// A job with the same description is already stored.
    Duplicate,
}

#[async_trait]
pub trait IngestionStore: Send + Sync {
    /// Stores `record` unless a job with the exact same description exists.
    /// The existence check and the insert run in one transaction.
    async fn add_if_absent(&self, record: &JobRecord) -> Result<Ingested, StoreError>;
}

/// Stores `record`, logging instead of returning a failure.
pub async fn ingest(store: &dyn IngestionStore, record: &JobRecord) -> Option<Ingested> {
    match store.add_if_absent(record).await {
        Ok(ingested) => {
            tracing::debug!(
                position_title = %record.position_title,
                outcome = ?ingested,
                "ingest: job stored"
            );
            Some(ingested)
        }
        Err(err) => {
            tracing::error!(
                position_title = %record.position_title,
                "ingest: failed to add job data: {}",
                err
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn record(description: &str) -> JobRecord {
        JobRecord {
            job_id: 0,
            position_title: "Data Engineer".to_string(),
            company_title: "Acme".to_string(),
            description: description.to_string(),
            skills: "SQL, Rust".to_string(),
        }
    }

    #[tokio::test]
    async fn same_description_is_stored_once() {
        let store = MemoryStore::new();
        assert_eq!(
            ingest(&store, &record("Build pipelines")).await,
            Some(Ingested::Inserted)
        );
        assert_eq!(
            ingest(&store, &record("Build pipelines")).await,
            Some(Ingested::Duplicate)
        );
        assert_eq!(store.jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn job_id_is_not_a_dedup_key() {
        let store = MemoryStore::new();
        let mut first = record("Build pipelines");
        first.job_id = 7;
        let mut second = record("Maintain dashboards");
        second.job_id = 7;

        ingest(&store, &first).await;
        ingest(&store, &second).await;
        assert_eq!(store.jobs().await.len(), 2);
    }

    #[tokio::test]
    async fn whitespace_variants_are_distinct() {
        let store = MemoryStore::new();
        ingest(&store, &record("Build pipelines")).await;
        ingest(&store, &record("Build pipelines ")).await;
        assert_eq!(store.jobs().await.len(), 2);
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let store = MemoryStore::new().failing_job_inserts();
        assert_eq!(ingest(&store, &record("Build pipelines")).await, None);
        assert!(store.jobs().await.is_empty());
    }
}
