//! Submission, log query, and recent-jobs endpoints.
//!
//! POST /api/indexing/submit accepts either a JSON body (single URL) or a
//! multipart CSV upload (bulk), mirroring the one-endpoint shape the
//! dashboard client expects.

use std::io::Write;

use axum::{
    extract::{Extension, FromRequest, Multipart, Path, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;
use uuid::Uuid;

use crate::domains::indexing::{
    admit_url, ingest_csv, IndexingError, IndexingJob, JobLogEntry, JobOptions,
};
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

/// How many jobs the recent-jobs query returns.
const RECENT_JOBS_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub url: String,
    #[serde(default)]
    pub ping_search_console: bool,
    #[serde(default)]
    pub update_sitemap: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SingleSubmitResponse {
    success: bool,
    job_id: Uuid,
    status: String,
    url: String,
    credits_left: Option<i64>,
    mode: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkSubmitResponse {
    success: bool,
    message: String,
    count: usize,
    job_id: Uuid,
    credits_left: Option<i64>,
    submitted_urls: Vec<String>,
    dispatch_failures: usize,
    mode: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: Uuid,
    pub url: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&IndexingJob> for JobSummary {
    fn from(job: &IndexingJob) -> Self {
        Self {
            job_id: job.id,
            url: job.url.clone(),
            status: job.status.clone(),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LogsResponse {
    success: bool,
    job_id: Uuid,
    status: String,
    logs: Vec<JobLogEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecentJobsResponse {
    success: bool,
    jobs: Vec<JobSummary>,
}

/// Submission endpoint: JSON body for a single URL, multipart CSV for bulk.
pub async fn submit_handler(
    Extension(state): Extension<AxumAppState>,
    auth: Option<Extension<AuthUser>>,
    request: Request,
) -> Result<Response, ApiError> {
    let user_id = auth.map(|Extension(user)| user.user_id);

    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| IndexingError::InvalidInput(format!("Invalid multipart body: {}", e)))?;
        submit_bulk(&state, user_id, multipart).await
    } else {
        let Json(body) = Json::<SubmitRequest>::from_request(request, &())
            .await
            .map_err(|e| IndexingError::InvalidInput(format!("Invalid request body: {}", e)))?;
        submit_single(&state, user_id, body).await
    }
}

async fn submit_single(
    state: &AxumAppState,
    user_id: Option<Uuid>,
    body: SubmitRequest,
) -> Result<Response, ApiError> {
    let options = JobOptions {
        ping_search_console: body.ping_search_console,
        update_sitemap: body.update_sitemap,
    };

    let admission = admit_url(&state.deps, user_id, &body.url, options).await?;

    Ok((
        StatusCode::CREATED,
        Json(SingleSubmitResponse {
            success: true,
            job_id: admission.job.id,
            status: admission.job.status.clone(),
            url: admission.job.url.clone(),
            credits_left: admission.credits_left,
            mode: "single",
        }),
    )
        .into_response())
}

async fn submit_bulk(
    state: &AxumAppState,
    user_id: Option<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut options = JobOptions::default();
    let mut upload: Option<NamedTempFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| IndexingError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let bytes = field.bytes().await.map_err(|e| {
                    IndexingError::InvalidInput(format!("Failed to read upload: {}", e))
                })?;
                let mut file =
                    NamedTempFile::new().map_err(|e| IndexingError::Internal(e.into()))?;
                file.write_all(&bytes)
                    .map_err(|e| IndexingError::Internal(e.into()))?;
                upload = Some(file);
            }
            Some("pingSearchConsole") => {
                options.ping_search_console = flag_value(field.text().await.ok());
            }
            Some("updateSitemap") => {
                options.update_sitemap = flag_value(field.text().await.ok());
            }
            _ => {}
        }
    }

    let upload = upload
        .ok_or_else(|| IndexingError::InvalidInput("CSV file field is required".to_string()))?;
    let file = upload
        .reopen()
        .map_err(|e| IndexingError::Internal(e.into()))?;

    let result = ingest_csv(&state.deps, user_id, file, options).await;

    // The uploaded CSV is transient; remove it on every exit path.
    if let Err(e) = upload.close() {
        warn!(error = %e, "Failed to remove uploaded CSV");
    }

    let ingestion = result?;
    let submitted_urls: Vec<String> = ingestion.jobs.iter().map(|job| job.url.clone()).collect();
    let first_job_id = ingestion.jobs[0].id;

    Ok((
        StatusCode::CREATED,
        Json(BulkSubmitResponse {
            success: true,
            message: format!("Successfully queued {} URLs", ingestion.jobs.len()),
            count: ingestion.jobs.len(),
            job_id: first_job_id,
            credits_left: ingestion.credits_left,
            submitted_urls,
            dispatch_failures: ingestion.dispatch_failures.len(),
            mode: "bulk",
        }),
    )
        .into_response())
}

/// Multipart form flags arrive as the strings "true"/"false".
fn flag_value(text: Option<String>) -> bool {
    matches!(text.as_deref(), Some("true"))
}

/// Job log query: normalized logs plus the current status.
pub async fn logs_handler(
    Extension(state): Extension<AxumAppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<LogsResponse>, ApiError> {
    let job = state
        .deps
        .jobs
        .find_by_id(job_id)
        .await?
        .ok_or(IndexingError::NotFound)?;

    Ok(Json(LogsResponse {
        success: true,
        job_id: job.id,
        status: job.status.clone(),
        logs: job.normalized_logs(),
        created_at: job.created_at,
        updated_at: job.updated_at,
    }))
}

/// Recent jobs for the caller, newest first.
pub async fn recent_handler(
    Extension(state): Extension<AxumAppState>,
    auth: Option<Extension<AuthUser>>,
) -> Result<Json<RecentJobsResponse>, ApiError> {
    let user_id = auth.map(|Extension(user)| user.user_id);
    let jobs = state
        .deps
        .jobs
        .recent_for_user(user_id, RECENT_JOBS_LIMIT)
        .await?;

    Ok(Json(RecentJobsResponse {
        success: true,
        jobs: jobs.iter().map(JobSummary::from).collect(),
    }))
}
