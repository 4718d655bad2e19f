//! Bulk ingestion pipeline: CSV stream -> authorized, charged, queued jobs.
//!
//! Batch admission is all-or-nothing: one unverified host or a short
//! balance rejects the whole batch with zero jobs created and zero
//! credits spent. Dispatch, by contrast, is per-job: once the batch is
//! charged and persisted, one queue failure must not hold the others back
//! and is not a reason to refund.

use std::io::Read;

use futures::future::join_all;
use tracing::{error, info};
use uuid::Uuid;

use crate::kernel::ServerDeps;

use super::admission::refund_on_failure;
use super::error::IndexingError;
use super::models::{IndexingJob, JobOptions, NewJob};
use super::normalize::normalize_url;
use super::ownership;

/// Result of a successful bulk ingestion.
#[derive(Debug, Clone)]
pub struct BulkIngestion {
    /// Persisted jobs, in CSV row order.
    pub jobs: Vec<IndexingJob>,
    /// Remaining balance after the batch charge; `None` for anonymous.
    pub credits_left: Option<i64>,
    /// Jobs that were persisted and charged but could not be enqueued.
    pub dispatch_failures: Vec<Uuid>,
}

/// Extract candidate URLs from CSV content.
///
/// The URL column is the header named `url` (case-insensitive) when one
/// exists, otherwise the first column - in which case the first row is
/// data, not a header. Rows that do not normalize are discarded silently.
pub fn extract_urls<R: Read>(reader: R) -> Vec<String> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let records: Vec<csv::StringRecord> = csv_reader
        .records()
        .filter_map(|record| record.ok())
        .collect();

    let Some(first) = records.first() else {
        return Vec::new();
    };

    // Header named "url" selects the column; otherwise column 0 and the
    // first row counts as data.
    let url_column = first
        .iter()
        .position(|field| field.eq_ignore_ascii_case("url"));
    let (column, data_rows) = match url_column {
        Some(column) => (column, &records[1..]),
        None => (0, &records[..]),
    };

    data_rows
        .iter()
        .filter_map(|record| record.get(column))
        .filter_map(|field| normalize_url(field).ok())
        .collect()
}

/// Ingest a CSV of URLs as one atomic batch admission.
pub async fn ingest_csv<R: Read>(
    deps: &ServerDeps,
    user_id: Option<Uuid>,
    csv_reader: R,
    options: JobOptions,
) -> Result<BulkIngestion, IndexingError> {
    let urls = extract_urls(csv_reader);
    if urls.is_empty() {
        return Err(IndexingError::EmptyBatch);
    }
    if urls.len() > deps.policy.max_batch_size {
        return Err(IndexingError::InvalidInput(format!(
            "Batch of {} URLs exceeds the maximum of {}",
            urls.len(),
            deps.policy.max_batch_size
        )));
    }

    // Batch-wide authorization and a single batch-wide charge. Both run
    // before any row is persisted; there is no partial admission.
    let cost = urls.len() as i64 * deps.policy.cost_per_url;
    let credits_left = match user_id {
        Some(user_id) => {
            let user = deps
                .accounts
                .find_user(user_id)
                .await?
                .ok_or(IndexingError::AuthenticationRequired)?;
            if deps.policy.require_ownership {
                for url in &urls {
                    ownership::authorize(url, &user.verified_sites)?;
                }
            }

            use crate::domains::accounts::DebitOutcome;
            match deps.accounts.try_debit(user_id, cost).await? {
                DebitOutcome::Charged { remaining } => Some(remaining),
                DebitOutcome::Insufficient { available } => {
                    return Err(IndexingError::InsufficientCredits {
                        required: cost,
                        available,
                    })
                }
            }
        }
        None => {
            if !deps.policy.allow_anonymous {
                return Err(IndexingError::AuthenticationRequired);
            }
            None
        }
    };

    let batch: Vec<NewJob> = urls
        .into_iter()
        .map(|url| NewJob {
            user_id,
            url,
            options,
        })
        .collect();

    let jobs = match deps.jobs.insert_many(batch).await {
        Ok(jobs) => jobs,
        Err(e) => {
            refund_on_failure(deps, user_id, cost).await;
            return Err(e);
        }
    };

    // Each dispatch is independent; failures are reported, never rolled back.
    let results = join_all(jobs.iter().map(|job| deps.dispatch.enqueue(job.id))).await;
    let mut dispatch_failures = Vec::new();
    for (job, result) in jobs.iter().zip(results) {
        if let Err(e) = result {
            error!(job_id = %job.id, error = %e, "Dispatch failed for batch job");
            dispatch_failures.push(job.id);
        }
    }

    info!(
        count = jobs.len(),
        failures = dispatch_failures.len(),
        "Bulk indexing batch queued"
    );

    Ok(BulkIngestion {
        jobs,
        credits_left,
        dispatch_failures,
    })
}
