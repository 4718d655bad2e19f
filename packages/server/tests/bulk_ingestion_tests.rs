//! Integration tests for bulk CSV ingestion.
//!
//! Admission of the batch is all-or-nothing; dispatch of the admitted
//! jobs is per-job and independent.

mod common;

use common::{test_deps, test_deps_with_policy};
use server_core::domains::indexing::{ingest_csv, IndexingError, JobOptions};
use server_core::kernel::{AdmissionPolicy, BaseAccountStore};

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn batch_is_charged_once_and_persisted_in_row_order() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &["example.com"]);

    let csv = "url\nexample.com/a\nexample.com/b\nexample.com/c\n";
    let ingestion = ingest_csv(
        &ctx.deps,
        Some(user_id),
        csv.as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect("batch should be admitted");

    let urls: Vec<&str> = ingestion.jobs.iter().map(|j| j.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c"
        ]
    );
    assert_eq!(ingestion.credits_left, Some(7));
    assert!(ingestion.dispatch_failures.is_empty());

    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 7);
    assert_eq!(ctx.dispatch.enqueued().len(), 3);
    for job in &ingestion.jobs {
        assert_eq!(job.status, "queued");
        assert!(ctx.dispatch.was_enqueued(job.id));
    }
}

#[tokio::test]
async fn malformed_rows_are_dropped_and_not_charged() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &["example.com"]);

    let csv = "url\nexample.com\nht tp://broken\n\nexample.com/ok\n";
    let ingestion = ingest_csv(
        &ctx.deps,
        Some(user_id),
        csv.as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect("valid rows should be admitted");

    assert_eq!(ingestion.jobs.len(), 2);
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 8);
}

// =============================================================================
// All-or-nothing rejection
// =============================================================================

#[tokio::test]
async fn one_unverified_host_rejects_the_whole_batch() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &["example.com"]);

    let csv = "url\nexample.com/a\nother.org/b\nexample.com/c\n";
    let err = ingest_csv(
        &ctx.deps,
        Some(user_id),
        csv.as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect_err("batch with a foreign host must be rejected");

    assert!(matches!(err, IndexingError::Unauthorized { ref host } if host == "other.org"));
    assert!(ctx.jobs.is_empty());
    assert!(ctx.dispatch.enqueued().is_empty());
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 10);
}

#[tokio::test]
async fn short_balance_rejects_the_whole_batch() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 2, &["example.com"]);

    let csv = "url\nexample.com/a\nexample.com/b\nexample.com/c\n";
    let err = ingest_csv(
        &ctx.deps,
        Some(user_id),
        csv.as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect_err("batch must not be partially admitted");

    assert!(matches!(
        err,
        IndexingError::InsufficientCredits {
            required: 3,
            available: 2
        }
    ));
    assert!(ctx.jobs.is_empty());
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 2);
}

#[tokio::test]
async fn empty_csv_is_rejected() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &["example.com"]);

    let err = ingest_csv(
        &ctx.deps,
        Some(user_id),
        "url\n".as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect_err("a CSV with no usable rows must be rejected");

    assert!(matches!(err, IndexingError::EmptyBatch));
}

#[tokio::test]
async fn oversized_batch_is_rejected() {
    let ctx = test_deps_with_policy(AdmissionPolicy {
        max_batch_size: 2,
        ..AdmissionPolicy::default()
    });
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &["example.com"]);

    let csv = "url\nexample.com/a\nexample.com/b\nexample.com/c\n";
    let err = ingest_csv(
        &ctx.deps,
        Some(user_id),
        csv.as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect_err("batch above the size cap must be rejected");

    assert!(matches!(err, IndexingError::InvalidInput(_)));
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 10);
}

#[tokio::test]
async fn unknown_user_bulk_is_rejected_even_without_ownership_checks() {
    let ctx = test_deps_with_policy(AdmissionPolicy {
        require_ownership: false,
        ..AdmissionPolicy::default()
    });

    let err = ingest_csv(
        &ctx.deps,
        Some(uuid::Uuid::new_v4()),
        "url\nexample.com\n".as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect_err("a session naming an unknown user must be rejected");

    assert!(matches!(err, IndexingError::AuthenticationRequired));
    assert!(ctx.jobs.is_empty());
}

#[tokio::test]
async fn anonymous_bulk_is_rejected_by_default() {
    let ctx = test_deps();

    let err = ingest_csv(
        &ctx.deps,
        None,
        "url\nexample.com\n".as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect_err("anonymous bulk must be rejected under the default policy");

    assert!(matches!(err, IndexingError::AuthenticationRequired));
}

// =============================================================================
// Per-job dispatch
// =============================================================================

#[tokio::test]
async fn one_dispatch_failure_does_not_hold_the_rest_back() {
    let ctx = test_deps();
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &["example.com"]);
    ctx.dispatch.fail_on_call(2);

    let csv = "url\nexample.com/a\nexample.com/b\nexample.com/c\n";
    let ingestion = ingest_csv(
        &ctx.deps,
        Some(user_id),
        csv.as_bytes(),
        JobOptions::default(),
    )
    .await
    .expect("dispatch failures do not fail the ingestion");

    assert_eq!(ingestion.jobs.len(), 3);
    assert_eq!(ingestion.dispatch_failures, vec![ingestion.jobs[1].id]);

    // The failed job is persisted and charged like the others.
    assert_eq!(ctx.jobs.len(), 3);
    assert_eq!(ctx.accounts.balance(user_id).await.unwrap(), 7);
    assert!(ctx.dispatch.was_enqueued(ingestion.jobs[0].id));
    assert!(!ctx.dispatch.was_enqueued(ingestion.jobs[1].id));
    assert!(ctx.dispatch.was_enqueued(ingestion.jobs[2].id));
}
