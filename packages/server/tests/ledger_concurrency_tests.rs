//! Concurrency tests for the credit ledger.
//!
//! The ledger's guarantee: debits are atomic check-and-decrement, so a
//! burst of concurrent submissions can never admit more jobs than the
//! balance covers.

mod common;

use common::test_deps;
use server_core::domains::indexing::{admit_url, IndexingError, JobOptions};
use server_core::kernel::BaseAccountStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_submissions_never_overspend_the_balance() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 5, &["example.com"]);

    let mut handles = Vec::new();
    for i in 0..20 {
        let deps = ctx.deps.clone();
        handles.push(tokio::spawn(async move {
            admit_url(
                &deps,
                Some(user_id),
                &format!("https://example.com/page-{}", i),
                JobOptions::default(),
            )
            .await
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("task must not panic") {
            Ok(_) => admitted += 1,
            Err(IndexingError::InsufficientCredits { .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(admitted, 5);
    assert_eq!(rejected, 15);
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 0);
    assert_eq!(ctx.jobs.len(), 5);
    assert_eq!(ctx.dispatch.enqueued().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_refills_stop_at_the_ceiling() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 45, &[]);
    let policy = ctx.deps.policy.clone();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let accounts = ctx.accounts.clone();
        let policy = policy.clone();
        handles.push(tokio::spawn(async move {
            accounts
                .credit(user_id, policy.refill_amount, policy.credit_ceiling)
                .await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle
            .await
            .expect("task must not panic")
            .expect("credit must not error")
            .is_some()
        {
            granted += 1;
        }
    }

    // Starting below the ceiling, exactly one refill fits before the
    // balance crosses it.
    assert_eq!(granted, 1);
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 55);
}

#[tokio::test]
async fn refill_is_refused_at_the_ceiling() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 50, &[]);
    let policy = &ctx.deps.policy;

    let outcome = ctx
        .accounts
        .credit(user_id, policy.refill_amount, policy.credit_ceiling)
        .await
        .unwrap();

    assert_eq!(outcome, None);
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 50);
}
