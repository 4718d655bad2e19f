//! Dashboard and credit refill endpoints. Both require a session.

use axum::extract::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::domains::indexing::{load_dashboard, success_rate, IndexingError};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

use super::indexing::JobSummary;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DashboardResponse {
    success: bool,
    stats: StatsBody,
    verified_sites: Vec<String>,
    recent_activity: Vec<JobSummary>,
    generated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsBody {
    indexed: i64,
    pending: i64,
    failed: i64,
    credits: i64,
    success_rate: f64,
}

/// Aggregated per-user view: status buckets, credits, verified sites, and
/// the latest activity.
pub async fn dashboard_handler(
    Extension(state): Extension<AxumAppState>,
    auth: Option<Extension<AuthUser>>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let Extension(auth) = auth.ok_or(IndexingError::AuthenticationRequired)?;
    let dashboard = load_dashboard(&state.deps, auth.user_id).await?;

    Ok(Json(DashboardResponse {
        success: true,
        stats: StatsBody {
            indexed: dashboard.stats.indexed,
            pending: dashboard.stats.pending,
            failed: dashboard.stats.failed,
            credits: dashboard.stats.credits,
            success_rate: success_rate(dashboard.stats.indexed, dashboard.stats.failed),
        },
        verified_sites: dashboard.verified_sites,
        recent_activity: dashboard
            .recent_activity
            .iter()
            .map(JobSummary::from)
            .collect(),
        generated_at: Utc::now(),
    }))
}

/// Top up the caller's credits, refused once the balance is at the ceiling.
pub async fn refill_handler(
    Extension(state): Extension<AxumAppState>,
    auth: Option<Extension<AuthUser>>,
) -> Result<Json<Value>, ApiError> {
    let Extension(auth) = auth.ok_or(IndexingError::AuthenticationRequired)?;
    let policy = &state.deps.policy;
    let credited = state
        .deps
        .accounts
        .credit(auth.user_id, policy.refill_amount, policy.credit_ceiling)
        .await
        .map_err(IndexingError::Internal)?;

    match credited {
        Some(credits) => {
            info!(user_id = %auth.user_id, credits, "Credits refilled");
            Ok(Json(json!({ "success": true, "credits": credits })))
        }
        None => {
            let balance = state
                .deps
                .accounts
                .balance(auth.user_id)
                .await
                .map_err(IndexingError::Internal)?;
            Err(IndexingError::CreditCeilingReached { balance }.into())
        }
    }
}
