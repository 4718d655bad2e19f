//! Indexing domain - the job admission, ingestion, and dispatch pipeline.
//!
//! A submission enters through `admission` (single URL) or `bulk` (CSV of
//! URLs). Both normalize the target, check domain ownership, charge the
//! credit ledger, persist jobs, and hand the job ids to the dispatch queue.
//! `dashboard` aggregates job history back out for the user.

pub mod admission;
pub mod bulk;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod normalize;
pub mod ownership;

pub use admission::{admit_url, Admission};
pub use bulk::{ingest_csv, BulkIngestion};
pub use dashboard::{load_dashboard, success_rate, Dashboard, DashboardStats};
pub use error::IndexingError;
pub use models::{IndexingJob, JobLogEntry, JobOptions, JobStatus, NewJob};
pub use normalize::normalize_url;
