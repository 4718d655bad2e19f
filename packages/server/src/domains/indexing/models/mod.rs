pub mod job;

pub use job::{normalize_log_entry, IndexingJob, JobLogEntry, JobOptions, JobStatus, NewJob};
