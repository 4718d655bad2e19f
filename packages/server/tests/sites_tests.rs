//! Integration tests for the site-verification flow: provider
//! confirmation, persistence of the confirmed set, and the saved
//! connection status.

mod common;

use common::{test_deps, test_deps_with_verifier};
use server_core::domains::indexing::{admit_url, IndexingError, JobOptions};
use server_core::kernel::{BaseAccountStore, BaseSiteVerifier};

#[tokio::test]
async fn saved_status_flips_after_verification() {
    let ctx = test_deps_with_verifier(&["sc-domain:example.com"]);
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &[]);

    // Nothing stored yet: not connected.
    let user = ctx.accounts.find_user(user_id).await.unwrap().unwrap();
    assert!(user.verified_sites.is_empty());

    // The verify flow: provider confirms, confirmed tokens are persisted.
    let confirmed = ctx
        .deps
        .site_verifier
        .confirm_sites(Some("example.com"))
        .await;
    assert_eq!(confirmed, vec!["sc-domain:example.com"]);
    ctx.accounts
        .add_verified_sites(user_id, &confirmed)
        .await
        .unwrap();

    // The same saved-status query now reports connected.
    let user = ctx.accounts.find_user(user_id).await.unwrap().unwrap();
    assert_eq!(user.verified_sites, vec!["sc-domain:example.com"]);
}

#[tokio::test]
async fn repeated_verification_does_not_duplicate_sites() {
    let ctx = test_deps_with_verifier(&["sc-domain:example.com"]);
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &[]);

    let confirmed = ctx.deps.site_verifier.confirm_sites(None).await;
    ctx.accounts
        .add_verified_sites(user_id, &confirmed)
        .await
        .unwrap();
    let user = ctx
        .accounts
        .add_verified_sites(user_id, &confirmed)
        .await
        .unwrap();

    assert_eq!(user.verified_sites, vec!["sc-domain:example.com"]);
}

#[tokio::test]
async fn target_narrows_the_confirmed_set() {
    let ctx = test_deps_with_verifier(&["sc-domain:example.com", "https://other.org/"]);

    let all = ctx.deps.site_verifier.confirm_sites(None).await;
    assert_eq!(all.len(), 2);

    let narrowed = ctx
        .deps
        .site_verifier
        .confirm_sites(Some("example.com"))
        .await;
    assert_eq!(narrowed, vec!["sc-domain:example.com"]);
}

#[tokio::test]
async fn unreachable_provider_confirms_nothing() {
    let ctx = test_deps();

    let confirmed = ctx
        .deps
        .site_verifier
        .confirm_sites(Some("example.com"))
        .await;
    assert!(confirmed.is_empty());
}

#[tokio::test]
async fn verification_unlocks_admission_for_the_domain() {
    let ctx = test_deps_with_verifier(&["sc-domain:example.com"]);
    let user_id = ctx.accounts.insert_user("ana@example.com", 10, &[]);

    let err = admit_url(
        &ctx.deps,
        Some(user_id),
        "https://example.com/page",
        JobOptions::default(),
    )
    .await
    .expect_err("unverified domain must be rejected");
    assert!(matches!(err, IndexingError::Unauthorized { .. }));

    let confirmed = ctx
        .deps
        .site_verifier
        .confirm_sites(Some("example.com"))
        .await;
    ctx.accounts
        .add_verified_sites(user_id, &confirmed)
        .await
        .unwrap();

    let admission = admit_url(
        &ctx.deps,
        Some(user_id),
        "https://example.com/page",
        JobOptions::default(),
    )
    .await
    .expect("verified domain must be admitted");
    assert_eq!(admission.credits_left, Some(9));
}
