//! Status aggregation: per-user dashboard counts and recent activity.

use uuid::Uuid;

use crate::kernel::ServerDeps;

use super::error::IndexingError;
use super::models::{IndexingJob, JobStatus};

/// How many recent jobs the dashboard surfaces.
const RECENT_ACTIVITY_LIMIT: i64 = 5;

/// Status buckets plus the credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardStats {
    pub indexed: i64,
    pub pending: i64,
    pub failed: i64,
    pub credits: i64,
}

/// Per-user dashboard view.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub verified_sites: Vec<String>,
    pub recent_activity: Vec<IndexingJob>,
}

/// Partition raw `(status, count)` pairs into the three dashboard buckets.
///
/// Unknown status strings are ignored rather than miscounted.
pub fn bucket_counts(counts: &[(String, i64)]) -> (i64, i64, i64) {
    let mut indexed = 0;
    let mut pending = 0;
    let mut failed = 0;
    for (status, count) in counts {
        let Ok(status) = status.parse::<JobStatus>() else {
            continue;
        };
        if status.is_indexed() {
            indexed += count;
        } else if status.is_pending() {
            pending += count;
        } else if status == JobStatus::Failed {
            failed += count;
        }
    }
    (indexed, pending, failed)
}

/// Share of completed attempts that were indexed, as a percentage.
/// Zero completed attempts counts as 100%.
pub fn success_rate(indexed: i64, failed: i64) -> f64 {
    let total = indexed + failed;
    if total == 0 {
        return 100.0;
    }
    indexed as f64 / total as f64 * 100.0
}

/// Load the dashboard view for a user.
pub async fn load_dashboard(deps: &ServerDeps, user_id: Uuid) -> Result<Dashboard, IndexingError> {
    let user = deps
        .accounts
        .find_user(user_id)
        .await?
        .ok_or(IndexingError::AuthenticationRequired)?;

    let counts = deps.jobs.status_counts(Some(user_id)).await?;
    let (indexed, pending, failed) = bucket_counts(&counts);

    let recent_activity = deps
        .jobs
        .recent_for_user(Some(user_id), RECENT_ACTIVITY_LIMIT)
        .await?;

    Ok(Dashboard {
        stats: DashboardStats {
            indexed,
            pending,
            failed,
            credits: user.credits,
        },
        verified_sites: user.verified_sites,
        recent_activity,
    })
}
