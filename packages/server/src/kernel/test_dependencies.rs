// In-memory implementations of the kernel traits for tests.
//
// The memory account store serializes ledger mutations behind a single
// mutex, which gives the same atomic check-and-debit guarantee the
// Postgres conditional UPDATE provides.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use super::traits::{BaseAccountStore, BaseDispatchQueue, BaseJobStore, BaseSiteVerifier};
use crate::domains::accounts::{DebitOutcome, User};
use crate::domains::indexing::{IndexingError, IndexingJob, JobStatus, NewJob};

// =============================================================================
// Memory Account Store
// =============================================================================

#[derive(Default)]
pub struct MemoryAccountStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user and return their id.
    pub fn insert_user(&self, email: &str, credits: i64, verified_sites: &[&str]) -> Uuid {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: None,
            credits,
            verified_sites: verified_sites.iter().map(|s| s.to_string()).collect(),
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        self.users.lock().unwrap().insert(id, user);
        id
    }
}

#[async_trait]
impl BaseAccountStore for MemoryAccountStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn balance(&self, user_id: Uuid) -> Result<i64> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|u| u.credits)
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", user_id))
    }

    async fn try_debit(&self, user_id: Uuid, amount: i64) -> Result<DebitOutcome> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", user_id))?;
        if user.credits >= amount {
            user.credits -= amount;
            user.updated_at = Utc::now();
            Ok(DebitOutcome::Charged {
                remaining: user.credits,
            })
        } else {
            Ok(DebitOutcome::Insufficient {
                available: user.credits,
            })
        }
    }

    async fn credit(&self, user_id: Uuid, amount: i64, ceiling: i64) -> Result<Option<i64>> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", user_id))?;
        if user.credits >= ceiling {
            return Ok(None);
        }
        user.credits += amount;
        user.updated_at = Utc::now();
        Ok(Some(user.credits))
    }

    async fn add_verified_sites(&self, user_id: Uuid, sites: &[String]) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| anyhow::anyhow!("Unknown user: {}", user_id))?;
        for site in sites {
            if !user.verified_sites.contains(site) {
                user.verified_sites.push(site.clone());
            }
        }
        user.verified_sites.sort();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

// =============================================================================
// Memory Job Store
// =============================================================================

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<Vec<IndexingJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored job, in creation order.
    pub fn all(&self) -> Vec<IndexingJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(new: NewJob) -> IndexingJob {
        let now = Utc::now();
        IndexingJob {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            url: new.url,
            options: Json(new.options),
            status: JobStatus::Queued.to_string(),
            logs: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl BaseJobStore for MemoryJobStore {
    async fn insert(&self, job: NewJob) -> Result<IndexingJob, IndexingError> {
        let job = Self::build(job);
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn insert_many(&self, batch: Vec<NewJob>) -> Result<Vec<IndexingJob>, IndexingError> {
        let jobs: Vec<IndexingJob> = batch.into_iter().map(Self::build).collect();
        self.jobs.lock().unwrap().extend(jobs.iter().cloned());
        Ok(jobs)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<IndexingJob>, IndexingError> {
        Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
    }

    async fn recent_for_user(
        &self,
        user_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<IndexingJob>, IndexingError> {
        let jobs = self.jobs.lock().unwrap();
        let mut matching: Vec<IndexingJob> = jobs
            .iter()
            .filter(|j| j.user_id == user_id)
            .cloned()
            .collect();
        matching.reverse(); // insertion order -> newest first
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn status_counts(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<Vec<(String, i64)>, IndexingError> {
        let jobs = self.jobs.lock().unwrap();
        let mut counts: HashMap<String, i64> = HashMap::new();
        for job in jobs.iter().filter(|j| j.user_id == user_id) {
            *counts.entry(job.status.clone()).or_insert(0) += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn transition(&self, id: Uuid, next: JobStatus) -> Result<IndexingJob, IndexingError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(IndexingError::NotFound)?;
        let from: JobStatus = job.status.parse().map_err(IndexingError::Internal)?;
        if !from.can_transition_to(next) {
            return Err(IndexingError::IllegalTransition {
                from: from.to_string(),
                to: next.to_string(),
            });
        }
        job.status = next.to_string();
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    async fn append_log(
        &self,
        id: Uuid,
        entry: serde_json::Value,
    ) -> Result<IndexingJob, IndexingError> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(IndexingError::NotFound)?;
        job.logs.push(entry);
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

// =============================================================================
// Mock Dispatch Queue
// =============================================================================

/// Records every enqueue call; can be told to fail all calls or specific
/// call positions (1-based) to exercise partial dispatch failure.
#[derive(Default)]
pub struct MockDispatchQueue {
    calls: Mutex<Vec<Uuid>>,
    call_count: AtomicUsize,
    fail_all: AtomicBool,
    fail_on_calls: Mutex<Vec<usize>>,
}

impl MockDispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Fail the nth enqueue call (1-based).
    pub fn fail_on_call(&self, n: usize) {
        self.fail_on_calls.lock().unwrap().push(n);
    }

    /// Job ids successfully handed to the queue, in call order.
    pub fn enqueued(&self) -> Vec<Uuid> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_enqueued(&self, job_id: Uuid) -> bool {
        self.calls.lock().unwrap().contains(&job_id)
    }
}

#[async_trait]
impl BaseDispatchQueue for MockDispatchQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<()> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_all.load(Ordering::SeqCst)
            || self.fail_on_calls.lock().unwrap().contains(&call)
        {
            return Err(anyhow::anyhow!("queue backend unavailable"));
        }
        self.calls.lock().unwrap().push(job_id);
        Ok(())
    }
}

// =============================================================================
// Static Site Verifier
// =============================================================================

/// Returns a fixed set of verified-site tokens.
pub struct StaticSiteVerifier {
    sites: Vec<String>,
}

impl StaticSiteVerifier {
    pub fn new(sites: &[&str]) -> Self {
        Self {
            sites: sites.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// A verifier that confirms nothing (provider unreachable).
    pub fn empty() -> Self {
        Self { sites: Vec::new() }
    }
}

#[async_trait]
impl BaseSiteVerifier for StaticSiteVerifier {
    async fn confirm_sites(&self, target: Option<&str>) -> Vec<String> {
        use crate::domains::indexing::ownership::canonical_token;
        match target {
            Some(target) => {
                let wanted = canonical_token(target);
                self.sites
                    .iter()
                    .filter(|site| canonical_token(site) == wanted)
                    .cloned()
                    .collect()
            }
            None => self.sites.clone(),
        }
    }
}
