//! Trait abstractions for external services (using traits for testability).
//!
//! Everything the admission pipeline reaches outside the process goes
//! through one of these traits so tests can swap in the in-memory doubles
//! from `test_dependencies`.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domains::accounts::{DebitOutcome, User};
use crate::domains::indexing::{IndexingError, IndexingJob, JobStatus, NewJob};

/// User storage and credit ledger operations.
///
/// Debits must be a single atomic conditional decrement per call; the sum
/// of successful debits never exceeds the balance observed by each check.
#[async_trait]
pub trait BaseAccountStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn balance(&self, user_id: Uuid) -> Result<i64>;

    /// Atomic check-and-debit. Never a separate read/write pair.
    async fn try_debit(&self, user_id: Uuid, amount: i64) -> Result<DebitOutcome>;

    /// Unconditional increase, refused (None) at or above `ceiling`.
    async fn credit(&self, user_id: Uuid, amount: i64, ceiling: i64) -> Result<Option<i64>>;

    /// Set-union new verified-site tokens into the user's stored set.
    async fn add_verified_sites(&self, user_id: Uuid, sites: &[String]) -> Result<User>;
}

/// Durable storage for indexing jobs and their append-only logs.
#[async_trait]
pub trait BaseJobStore: Send + Sync {
    async fn insert(&self, job: NewJob) -> Result<IndexingJob, IndexingError>;

    /// Batch insert; all or nothing, creation order follows input order.
    async fn insert_many(&self, jobs: Vec<NewJob>) -> Result<Vec<IndexingJob>, IndexingError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IndexingJob>, IndexingError>;

    /// Newest-first jobs for a user (or the anonymous pool).
    async fn recent_for_user(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IndexingJob>, IndexingError>;

    /// `(status, count)` pairs for a user's jobs.
    async fn status_counts(&self, user_id: Option<Uuid>) -> Result<Vec<(String, i64)>, IndexingError>;

    /// Advance a job's status; rejects backward or terminal moves.
    /// Driven exclusively by the external worker.
    async fn transition(&self, id: Uuid, next: JobStatus) -> Result<IndexingJob, IndexingError>;

    /// Append a raw log entry; `updated_at` advances.
    async fn append_log(
        &self,
        id: Uuid,
        entry: serde_json::Value,
    ) -> Result<IndexingJob, IndexingError>;
}

/// The sole producer boundary toward the external work queue.
///
/// Only the job id crosses this boundary; the worker re-reads the
/// authoritative job record so the job store stays the single source of
/// truth.
#[async_trait]
pub trait BaseDispatchQueue: Send + Sync {
    /// Hand a persisted job's id to the queue; returns once the queue has
    /// durably accepted it.
    async fn enqueue(&self, job_id: Uuid) -> Result<()>;
}

/// Ownership-verification provider (Search Console).
#[async_trait]
pub trait BaseSiteVerifier: Send + Sync {
    /// Site tokens the provider currently reports as verified, optionally
    /// narrowed to a target host.
    ///
    /// Read-only verification failures are non-fatal: provider errors and
    /// timeouts degrade to an empty set instead of failing the request.
    async fn confirm_sites(&self, target: Option<&str>) -> Vec<String>;
}
