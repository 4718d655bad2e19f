use thiserror::Error;

/// Failure taxonomy for the indexing pipeline.
///
/// Every failure branch in admission and bulk ingestion resolves to one of
/// these variants; the server layer maps them onto HTTP status codes.
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("CSV contains no usable URLs")]
    EmptyBatch,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Domain not verified for this account: {host}")]
    Unauthorized { host: String },

    #[error("Insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("Job not found")]
    NotFound,

    #[error("Credit balance {balance} is already at the ceiling")]
    CreditCeilingReached { balance: i64 },

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Failed to hand job to the work queue")]
    DispatchFailed(#[source] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
