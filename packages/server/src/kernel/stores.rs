//! PostgreSQL-backed implementations of the storage traits.
//!
//! Thin adapters that delegate to the model methods owning the SQL.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::{BaseAccountStore, BaseJobStore};
use crate::domains::accounts::{DebitOutcome, User};
use crate::domains::indexing::{IndexingError, IndexingJob, JobStatus, NewJob};

/// PostgreSQL-backed account store and credit ledger.
pub struct PostgresAccountStore {
    pool: PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseAccountStore for PostgresAccountStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        User::find_by_id_optional(user_id, &self.pool).await
    }

    async fn balance(&self, user_id: Uuid) -> Result<i64> {
        User::balance(user_id, &self.pool).await
    }

    async fn try_debit(&self, user_id: Uuid, amount: i64) -> Result<DebitOutcome> {
        User::try_debit(user_id, amount, &self.pool).await
    }

    async fn credit(&self, user_id: Uuid, amount: i64, ceiling: i64) -> Result<Option<i64>> {
        User::credit(user_id, amount, ceiling, &self.pool).await
    }

    async fn add_verified_sites(&self, user_id: Uuid, sites: &[String]) -> Result<User> {
        User::add_verified_sites(user_id, sites, &self.pool).await
    }
}

/// PostgreSQL-backed job store.
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseJobStore for PostgresJobStore {
    async fn insert(&self, job: NewJob) -> Result<IndexingJob, IndexingError> {
        IndexingJob::insert(job, &self.pool)
            .await
            .map_err(IndexingError::Internal)
    }

    async fn insert_many(&self, jobs: Vec<NewJob>) -> Result<Vec<IndexingJob>, IndexingError> {
        IndexingJob::insert_many(jobs, &self.pool)
            .await
            .map_err(IndexingError::Internal)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IndexingJob>, IndexingError> {
        IndexingJob::find_by_id_optional(id, &self.pool)
            .await
            .map_err(IndexingError::Internal)
    }

    async fn recent_for_user(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IndexingJob>, IndexingError> {
        IndexingJob::recent_for_user(user_id, limit, &self.pool)
            .await
            .map_err(IndexingError::Internal)
    }

    async fn status_counts(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<(String, i64)>, IndexingError> {
        IndexingJob::status_counts(user_id, &self.pool)
            .await
            .map_err(IndexingError::Internal)
    }

    async fn transition(&self, id: Uuid, next: JobStatus) -> Result<IndexingJob, IndexingError> {
        IndexingJob::transition(id, next, &self.pool).await
    }

    async fn append_log(
        &self,
        id: Uuid,
        entry: serde_json::Value,
    ) -> Result<IndexingJob, IndexingError> {
        IndexingJob::append_log(id, entry, &self.pool).await
    }
}
