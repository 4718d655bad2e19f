//! PostgreSQL-backed dispatch queue.
//!
//! The gateway hands a lightweight reference (job id only, never the full
//! job payload) to the `dispatch_queue` table that the external worker
//! consumes. Returning from `enqueue` means the queue row is committed.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::traits::BaseDispatchQueue;

/// A queued dispatch message awaiting the external worker.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DispatchMessage {
    pub id: Uuid,
    pub job_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DispatchMessage {
    /// Insert a pending message referencing `job_id`.
    pub async fn insert(job_id: Uuid, pool: &PgPool) -> Result<Self> {
        let message = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO dispatch_queue (id, job_id, status, created_at, updated_at)
            VALUES ($1, $2, 'pending', NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_id)
        .fetch_one(pool)
        .await?;
        Ok(message)
    }
}

/// PostgreSQL-backed producer boundary.
pub struct PostgresDispatchQueue {
    pool: PgPool,
}

impl PostgresDispatchQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseDispatchQueue for PostgresDispatchQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<()> {
        let message = DispatchMessage::insert(job_id, &self.pool).await?;
        debug!(job_id = %job_id, message_id = %message.id, "Job handed to dispatch queue");
        Ok(())
    }
}
