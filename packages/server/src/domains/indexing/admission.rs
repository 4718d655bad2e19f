//! Admission controller for a single URL.
//!
//! Order matters: normalize, authorize, charge, persist, dispatch. The
//! ledger is only touched after authorization passes, and nothing is
//! persisted until the debit succeeds, so every failure branch before
//! persistence leaves zero side effects.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::kernel::ServerDeps;

use super::error::IndexingError;
use super::models::{IndexingJob, JobOptions, NewJob};
use super::normalize::normalize_url;
use super::ownership;

/// Result of a successful admission.
#[derive(Debug, Clone)]
pub struct Admission {
    pub job: IndexingJob,
    /// Remaining balance after the charge; `None` for the anonymous free path.
    pub credits_left: Option<i64>,
}

/// Admit one URL: normalize, authorize, charge one credit, persist the job
/// in `queued`, and hand its id to the dispatch queue.
///
/// A dispatch failure after persistence surfaces as `DispatchFailed`
/// without rolling back the job or the charge; the job stays `queued`.
pub async fn admit_url(
    deps: &ServerDeps,
    user_id: Option<Uuid>,
    raw_url: &str,
    options: JobOptions,
) -> Result<Admission, IndexingError> {
    let url = normalize_url(raw_url)?;

    let credits_left = match user_id {
        Some(user_id) => {
            // A token naming a user the store does not know is treated the
            // same as no session, whatever the ownership policy says.
            let user = deps
                .accounts
                .find_user(user_id)
                .await?
                .ok_or(IndexingError::AuthenticationRequired)?;
            if deps.policy.require_ownership {
                ownership::authorize(&url, &user.verified_sites)?;
            }
            Some(charge(deps, user_id, deps.policy.cost_per_url).await?)
        }
        None => {
            if !deps.policy.allow_anonymous {
                return Err(IndexingError::AuthenticationRequired);
            }
            None
        }
    };

    let new_job = NewJob {
        user_id,
        url: url.clone(),
        options,
    };
    let job = match deps.jobs.insert(new_job).await {
        Ok(job) => job,
        Err(e) => {
            refund_on_failure(deps, user_id, deps.policy.cost_per_url).await;
            return Err(e);
        }
    };

    if let Err(e) = deps.dispatch.enqueue(job.id).await {
        // Job and charge stand; the job remains queued for a later re-drive.
        error!(job_id = %job.id, error = %e, "Dispatch failed after persistence");
        return Err(IndexingError::DispatchFailed(e));
    }

    info!(job_id = %job.id, url = %job.url, "Indexing job queued");

    Ok(Admission { job, credits_left })
}

/// Debit the admission cost, translating a refusal into the typed error.
async fn charge(deps: &ServerDeps, user_id: Uuid, amount: i64) -> Result<i64, IndexingError> {
    use crate::domains::accounts::DebitOutcome;

    match deps.accounts.try_debit(user_id, amount).await? {
        DebitOutcome::Charged { remaining } => Ok(remaining),
        DebitOutcome::Insufficient { available } => Err(IndexingError::InsufficientCredits {
            required: amount,
            available,
        }),
    }
}

/// Best-effort compensation when persistence fails after a debit.
pub(crate) async fn refund_on_failure(deps: &ServerDeps, user_id: Option<Uuid>, amount: i64) {
    let Some(user_id) = user_id else {
        return;
    };
    // Ceiling is bypassed on purpose; this puts back money already taken.
    if let Err(e) = deps.accounts.credit(user_id, amount, i64::MAX).await {
        warn!(user_id = %user_id, amount, error = %e, "Failed to refund after persistence error");
    }
}
