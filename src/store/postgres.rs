use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::StoreError;
use crate::frontier::FrontierStore;
use crate::ingest::{IngestionStore, Ingested};
use crate::record::JobRecord;

/// Postgres-backed store for both the frontier and the jobs.
///
/// The pool holds a single connection. Every operation acquires it for the
/// duration of one statement (or one transaction) and returns it on drop,
/// whether the operation succeeded or not.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and applies the bundled migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("store: connected and migrated");
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl FrontierStore for PgStore {
    async fn is_empty(&self) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM searchterm)")
            .fetch_one(&self.pool)
            .await?;
        Ok(!exists)
    }

    async fn next_unchecked(&self) -> Result<Option<String>, StoreError> {
        let name: Option<String> =
            sqlx::query_scalar("SELECT name FROM searchterm WHERE checked = FALSE LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(name)
    }

    async fn add_if_absent(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO searchterm (name, checked) VALUES ($1, FALSE)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_checked(&self, name: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE searchterm SET checked = TRUE WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IngestionStore for PgStore {
    async fn add_if_absent(&self, record: &JobRecord) -> Result<Ingested, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM job WHERE description = $1)")
                .bind(&record.description)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            tx.rollback().await?;
            return Ok(Ingested::Duplicate);
        }

        sqlx::query(
            r#"
            INSERT INTO job (position_title, company_title, description, skills)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.position_title)
        .bind(&record.company_title)
        .bind(&record.description)
        .bind(&record.skills)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Ingested::Inserted)
    }
}
