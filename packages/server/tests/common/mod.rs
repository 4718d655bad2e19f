// Common test utilities

use std::sync::Arc;

use server_core::kernel::test_dependencies::{
    MemoryAccountStore, MemoryJobStore, MockDispatchQueue, StaticSiteVerifier,
};
use server_core::kernel::{AdmissionPolicy, ServerDeps};

/// Dependency container wired with in-memory doubles, plus direct handles
/// to the doubles for seeding and inspection.
pub struct TestDeps {
    pub deps: ServerDeps,
    pub accounts: Arc<MemoryAccountStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub dispatch: Arc<MockDispatchQueue>,
}

pub fn test_deps() -> TestDeps {
    build(AdmissionPolicy::default(), StaticSiteVerifier::empty())
}

pub fn test_deps_with_policy(policy: AdmissionPolicy) -> TestDeps {
    build(policy, StaticSiteVerifier::empty())
}

/// Container whose verification provider confirms the given site tokens.
pub fn test_deps_with_verifier(sites: &[&str]) -> TestDeps {
    build(AdmissionPolicy::default(), StaticSiteVerifier::new(sites))
}

fn build(policy: AdmissionPolicy, verifier: StaticSiteVerifier) -> TestDeps {
    let accounts = Arc::new(MemoryAccountStore::new());
    let jobs = Arc::new(MemoryJobStore::new());
    let dispatch = Arc::new(MockDispatchQueue::new());

    let deps = ServerDeps::new(
        accounts.clone(),
        jobs.clone(),
        dispatch.clone(),
        Arc::new(verifier),
        policy,
    );

    TestDeps {
        deps,
        accounts,
        jobs,
        dispatch,
    }
}
