//! Server dependencies for the admission pipeline (using traits for testability)
//!
//! This module provides the central dependency container handed to the
//! domain logic. All external services sit behind trait abstractions so
//! tests can inject the in-memory doubles.

use std::sync::Arc;

use super::traits::{BaseAccountStore, BaseDispatchQueue, BaseJobStore, BaseSiteVerifier};

/// Policy knobs for the admission and ingestion paths.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Require the target host to be covered by the user's verified sites.
    pub require_ownership: bool,
    /// Permit unauthenticated submissions (free path, no debit).
    pub allow_anonymous: bool,
    /// Credits charged per admitted URL.
    pub cost_per_url: i64,
    /// Upper bound on CSV batch size; bounds memory and dispatch fan-out.
    pub max_batch_size: usize,
    /// Credits granted by a refill.
    pub refill_amount: i64,
    /// Refills are refused once the balance reaches this ceiling.
    pub credit_ceiling: i64,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            require_ownership: true,
            allow_anonymous: false,
            cost_per_url: 1,
            max_batch_size: 500,
            refill_amount: 10,
            credit_ceiling: 50,
        }
    }
}

/// Server dependencies accessible to the domain logic.
#[derive(Clone)]
pub struct ServerDeps {
    pub accounts: Arc<dyn BaseAccountStore>,
    pub jobs: Arc<dyn BaseJobStore>,
    pub dispatch: Arc<dyn BaseDispatchQueue>,
    pub site_verifier: Arc<dyn BaseSiteVerifier>,
    pub policy: AdmissionPolicy,
}

impl ServerDeps {
    pub fn new(
        accounts: Arc<dyn BaseAccountStore>,
        jobs: Arc<dyn BaseJobStore>,
        dispatch: Arc<dyn BaseDispatchQueue>,
        site_verifier: Arc<dyn BaseSiteVerifier>,
        policy: AdmissionPolicy,
    ) -> Self {
        Self {
            accounts,
            jobs,
            dispatch,
            site_verifier,
            policy,
        }
    }
}
