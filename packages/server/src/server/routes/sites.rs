//! Site-verification endpoints backed by the ownership provider.
//!
//! `verify_access_handler` asks the provider live and persists whatever it
//! confirms; `saved_status_handler` answers from the stored set only.

use axum::extract::{Extension, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::domains::indexing::IndexingError;
use crate::server::app::AxumAppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

#[derive(Debug, Deserialize)]
pub struct VerifyAccessParams {
    /// Optional host to narrow the provider query to.
    pub target: Option<String>,
}

/// Query the verification provider and merge confirmed sites into the
/// user's stored set. Provider failures degrade to an empty result.
pub async fn verify_access_handler(
    Extension(state): Extension<AxumAppState>,
    auth: Option<Extension<AuthUser>>,
    Query(params): Query<VerifyAccessParams>,
) -> Result<Json<Value>, ApiError> {
    let Extension(auth) = auth.ok_or(IndexingError::AuthenticationRequired)?;

    let confirmed = state
        .deps
        .site_verifier
        .confirm_sites(params.target.as_deref())
        .await;

    let sites = if confirmed.is_empty() {
        confirmed
    } else {
        info!(user_id = %auth.user_id, count = confirmed.len(), "Verified sites confirmed");
        let user = state
            .deps
            .accounts
            .add_verified_sites(auth.user_id, &confirmed)
            .await
            .map_err(IndexingError::Internal)?;
        user.verified_sites
    };

    Ok(Json(json!({
        "success": true,
        "connected": !sites.is_empty(),
        "sites": sites,
    })))
}

/// Report the stored verification state without touching the provider.
pub async fn saved_status_handler(
    Extension(state): Extension<AxumAppState>,
    auth: Option<Extension<AuthUser>>,
) -> Result<Json<Value>, ApiError> {
    let Extension(auth) = auth.ok_or(IndexingError::AuthenticationRequired)?;

    let user = state
        .deps
        .accounts
        .find_user(auth.user_id)
        .await
        .map_err(IndexingError::Internal)?
        .ok_or(IndexingError::AuthenticationRequired)?;

    Ok(Json(json!({
        "success": true,
        "connected": !user.verified_sites.is_empty(),
        "sites": user.verified_sites,
    })))
}
