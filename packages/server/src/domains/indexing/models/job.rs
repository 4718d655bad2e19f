//! IndexingJob model - one durable unit of "signal this URL for indexing".
//!
//! Jobs are created in `queued` by the admission path and mutated only by
//! the external worker afterwards (status transitions, log appends). The
//! log sequence is append-only and heterogeneous; `normalize_log_entry`
//! resolves every entry to a uniform `{kind, message, timestamp}` shape.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domains::indexing::error::IndexingError;

/// Job status state machine.
///
/// `queued -> processing -> {submitted, signals_sent} -> done`, with
/// `failed` reachable from any non-terminal state. `done` and `failed`
/// are terminal; no transition moves a job backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Submitted,
    SignalsSent,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// Counted as "indexed" on the dashboard.
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            JobStatus::Submitted | JobStatus::SignalsSent | JobStatus::Done
        )
    }

    /// Counted as "pending" on the dashboard.
    pub fn is_pending(self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Processing)
    }

    /// Whether the worker may move a job from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == JobStatus::Failed {
            return true;
        }
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Submitted)
                | (JobStatus::Processing, JobStatus::SignalsSent)
                | (JobStatus::Submitted, JobStatus::Done)
                | (JobStatus::SignalsSent, JobStatus::Done)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::SignalsSent => write!(f, "signals_sent"),
            JobStatus::Done => write!(f, "done"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "submitted" => Ok(JobStatus::Submitted),
            "signals_sent" => Ok(JobStatus::SignalsSent),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Per-job submission options, immutable once created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    #[serde(default)]
    pub ping_search_console: bool,
    #[serde(default)]
    pub update_sitemap: bool,
}

/// A log entry after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Fields for a job that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: Option<Uuid>,
    pub url: String,
    pub options: JobOptions,
}

/// IndexingJob - a persisted unit of work for the external worker.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndexingJob {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub url: String,
    pub options: Json<JobOptions>,
    pub status: String,
    pub logs: Json<Vec<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndexingJob {
    /// Parse the stored status string.
    pub fn job_status(&self) -> Result<JobStatus> {
        self.status.parse()
    }

    /// Normalize the raw log sequence, in append order.
    pub fn normalized_logs(&self) -> Vec<JobLogEntry> {
        let now = Utc::now();
        self.logs
            .iter()
            .map(|entry| normalize_log_entry(entry, now))
            .collect()
    }

    /// Insert a new job in `queued` status.
    pub async fn insert(new: NewJob, pool: &PgPool) -> Result<Self> {
        let job = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO indexing_jobs (id, user_id, url, options, status, logs, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'queued', '[]'::jsonb, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(new.url)
        .bind(Json(new.options))
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    /// Insert a batch of jobs in one transaction, preserving input order.
    pub async fn insert_many(batch: Vec<NewJob>, pool: &PgPool) -> Result<Vec<Self>> {
        let mut tx = pool.begin().await?;
        let mut jobs = Vec::with_capacity(batch.len());
        for new in batch {
            let job = sqlx::query_as::<_, Self>(
                r#"
                INSERT INTO indexing_jobs (id, user_id, url, options, status, logs, created_at, updated_at)
                VALUES ($1, $2, $3, $4, 'queued', '[]'::jsonb, NOW(), NOW())
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.url)
            .bind(Json(new.options))
            .fetch_one(&mut *tx)
            .await?;
            jobs.push(job);
        }
        tx.commit().await?;
        Ok(jobs)
    }

    /// Find a job by ID (optional).
    pub async fn find_by_id_optional(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let job = sqlx::query_as::<_, Self>("SELECT * FROM indexing_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(job)
    }

    /// Most recently created jobs for a user (or the anonymous pool).
    pub async fn recent_for_user(
        user_id: Option<Uuid>,
        limit: i64,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let jobs = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM indexing_jobs
            WHERE user_id IS NOT DISTINCT FROM $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(jobs)
    }

    /// Job counts per status for a user.
    pub async fn status_counts(user_id: Option<Uuid>, pool: &PgPool) -> Result<Vec<(String, i64)>> {
        let counts = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM indexing_jobs
            WHERE user_id IS NOT DISTINCT FROM $1
            GROUP BY status
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(counts)
    }

    /// Advance a job's status, rejecting backward or terminal moves.
    ///
    /// The update is guarded on the current status so a concurrent worker
    /// cannot slip an illegal transition past the check.
    pub async fn transition(
        id: Uuid,
        next: JobStatus,
        pool: &PgPool,
    ) -> Result<Self, IndexingError> {
        let current = Self::find_by_id_optional(id, pool)
            .await
            .map_err(IndexingError::Internal)?
            .ok_or(IndexingError::NotFound)?;
        let from = current.job_status().map_err(IndexingError::Internal)?;
        if !from.can_transition_to(next) {
            return Err(IndexingError::IllegalTransition {
                from: from.to_string(),
                to: next.to_string(),
            });
        }

        let updated = sqlx::query_as::<_, Self>(
            r#"
            UPDATE indexing_jobs
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.to_string())
        .bind(from.to_string())
        .fetch_optional(pool)
        .await?;

        // No row means the status moved underneath us; report it as illegal
        // rather than retrying on the worker's behalf.
        updated.ok_or(IndexingError::IllegalTransition {
            from: from.to_string(),
            to: next.to_string(),
        })
    }

    /// Append a raw log entry and advance `updated_at`.
    pub async fn append_log(
        id: Uuid,
        entry: serde_json::Value,
        pool: &PgPool,
    ) -> Result<Self, IndexingError> {
        let updated = sqlx::query_as::<_, Self>(
            r#"
            UPDATE indexing_jobs
            SET logs = logs || $2::jsonb, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(vec![entry]))
        .fetch_optional(pool)
        .await?;
        updated.ok_or(IndexingError::NotFound)
    }
}

/// Resolve a heterogeneous log entry to the uniform log contract.
///
/// Fallback order for the message: explicit `message` field, then a string
/// `data` field, then a stringified structured `data` payload, then a fixed
/// placeholder. Timestamps are source-provided when parsable and otherwise
/// best-effort (the aggregation time), so they are not guaranteed monotonic
/// with respect to append order.
pub fn normalize_log_entry(entry: &serde_json::Value, now: DateTime<Utc>) -> JobLogEntry {
    let kind = entry
        .get("kind")
        .and_then(|k| k.as_str())
        .unwrap_or("info")
        .to_string();

    let message = match entry.get("message").and_then(|m| m.as_str()) {
        Some(message) => message.to_string(),
        None => match entry.get("data") {
            Some(serde_json::Value::String(data)) => data.clone(),
            Some(data) if data.is_object() || data.is_array() => data.to_string(),
            _ => "Log message unavailable".to_string(),
        },
    };

    let timestamp = entry
        .get("timestamp")
        .and_then(|t| t.as_str())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or(now);

    JobLogEntry {
        kind,
        message,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forward_transitions_are_legal() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Submitted));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::SignalsSent));
        assert!(JobStatus::Submitted.can_transition_to(JobStatus::Done));
        assert!(JobStatus::SignalsSent.can_transition_to(JobStatus::Done));
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Submitted,
            JobStatus::SignalsSent,
        ] {
            assert!(status.can_transition_to(JobStatus::Failed));
        }
    }

    #[test]
    fn backward_and_terminal_transitions_are_rejected() {
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Done.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Submitted.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Done));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Submitted,
            JobStatus::SignalsSent,
            JobStatus::Done,
            JobStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!("bogus".parse::<JobStatus>().is_err());
    }

    #[test]
    fn explicit_message_wins() {
        let now = Utc::now();
        let entry = json!({"kind": "error", "message": "boom", "data": "ignored"});
        let log = normalize_log_entry(&entry, now);
        assert_eq!(log.kind, "error");
        assert_eq!(log.message, "boom");
    }

    #[test]
    fn string_data_is_surfaced_as_message() {
        let now = Utc::now();
        let entry = json!({"data": "submitted to provider"});
        let log = normalize_log_entry(&entry, now);
        assert_eq!(log.kind, "info");
        assert_eq!(log.message, "submitted to provider");
        assert_eq!(log.timestamp, now);
    }

    #[test]
    fn structured_data_is_stringified() {
        let now = Utc::now();
        let entry = json!({"data": {"code": 200}});
        let log = normalize_log_entry(&entry, now);
        assert_eq!(log.message, r#"{"code":200}"#);
    }

    #[test]
    fn missing_message_and_data_uses_placeholder() {
        let now = Utc::now();
        let log = normalize_log_entry(&json!({}), now);
        assert_eq!(log.kind, "info");
        assert_eq!(log.message, "Log message unavailable");
    }

    #[test]
    fn source_timestamp_is_preserved() {
        let now = Utc::now();
        let entry = json!({"message": "x", "timestamp": "2024-05-01T12:00:00Z"});
        let log = normalize_log_entry(&entry, now);
        assert_eq!(log.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }
}
