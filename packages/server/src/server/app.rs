//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::{
    PostgresAccountStore, PostgresDispatchQueue, PostgresJobStore, SearchConsoleClient, ServerDeps,
};
use crate::server::middleware::{jwt_auth_middleware, JwtService};
use crate::server::routes::{
    dashboard_handler, health_handler, logs_handler, recent_handler, refill_handler,
    saved_status_handler, submit_handler, verify_access_handler,
};
use crate::Config;

/// CSV uploads are capped at 5 MB.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub db_pool: PgPool,
    pub deps: ServerDeps,
    pub jwt_service: Arc<JwtService>,
}

/// Build the Axum application router
///
/// Wires the PostgreSQL-backed stores and the Search Console client into
/// the dependency container, then mounts the indexing API under
/// /api/indexing.
pub fn build_app(pool: PgPool, config: &Config) -> Result<Router> {
    let deps = ServerDeps::new(
        Arc::new(PostgresAccountStore::new(pool.clone())),
        Arc::new(PostgresJobStore::new(pool.clone())),
        Arc::new(PostgresDispatchQueue::new(pool.clone())),
        Arc::new(SearchConsoleClient::new(
            config.search_console_token.clone(),
        )?),
        config.policy.clone(),
    );

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_issuer.clone()));

    let app_state = AxumAppState {
        db_pool: pool,
        deps,
        jwt_service: jwt_service.clone(),
    };

    // CORS configuration - the dashboard client runs on a separate origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let router = Router::new()
        .route("/api/indexing/submit", post(submit_handler))
        .route("/api/indexing/logs/:job_id", get(logs_handler))
        .route("/api/indexing/recent", get(recent_handler))
        .route("/api/indexing/dashboard", get(dashboard_handler))
        .route("/api/indexing/refill", post(refill_handler))
        .route("/api/indexing/verify-access", get(verify_access_handler))
        .route("/api/indexing/status", get(saved_status_handler))
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
