use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::kernel::AdmissionPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    /// Bearer token for the Search Console verification provider.
    /// When absent, ownership verification degrades to "no sites verified".
    pub search_console_token: Option<String>,
    pub policy: AdmissionPolicy,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = AdmissionPolicy::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "indexbeam".to_string()),
            search_console_token: env::var("SEARCH_CONSOLE_TOKEN").ok(),
            policy: AdmissionPolicy {
                require_ownership: parse_env("REQUIRE_OWNERSHIP", defaults.require_ownership)?,
                allow_anonymous: parse_env("ALLOW_ANONYMOUS", defaults.allow_anonymous)?,
                cost_per_url: parse_env("COST_PER_URL", defaults.cost_per_url)?,
                max_batch_size: parse_env("MAX_BATCH_SIZE", defaults.max_batch_size)?,
                refill_amount: parse_env("REFILL_AMOUNT", defaults.refill_amount)?,
                credit_ceiling: parse_env("CREDIT_CEILING", defaults.credit_ceiling)?,
            },
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a valid value", name)),
        Err(_) => Ok(default),
    }
}
