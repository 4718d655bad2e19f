//! Search Console verification provider client.
//!
//! Read-only: asks the provider which site properties the configured
//! service account can see. Failures here must never fail the caller's
//! request, so every error path degrades to an empty site set.

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use super::traits::BaseSiteVerifier;
use crate::domains::indexing::ownership;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/webmasters/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SiteList {
    #[serde(rename = "siteEntry", default)]
    site_entry: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize)]
struct SiteEntry {
    #[serde(rename = "siteUrl")]
    site_url: String,
    #[serde(rename = "permissionLevel", default)]
    permission_level: String,
}

/// HTTP client for the Search Console sites API.
pub struct SearchConsoleClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SearchConsoleClient {
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(token: Option<String>, base_url: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build Search Console HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    async fn list_sites(&self) -> anyhow::Result<Vec<String>> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No Search Console token configured"))?;

        let response = self
            .http
            .get(format!("{}/sites", self.base_url))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;

        let list: SiteList = response.json().await?;
        Ok(list
            .site_entry
            .into_iter()
            .filter(|entry| entry.permission_level != "siteUnverifiedUser")
            .map(|entry| entry.site_url)
            .collect())
    }
}

#[async_trait]
impl BaseSiteVerifier for SearchConsoleClient {
    async fn confirm_sites(&self, target: Option<&str>) -> Vec<String> {
        let sites = match self.list_sites().await {
            Ok(sites) => sites,
            Err(e) => {
                // Non-fatal: verification reads degrade to "no sites verified".
                warn!(error = %e, "Search Console site listing failed");
                return Vec::new();
            }
        };

        match target {
            Some(target) => {
                let wanted = ownership::canonical_token(target);
                sites
                    .into_iter()
                    .filter(|site| ownership::canonical_token(site) == wanted)
                    .collect()
            }
            None => sites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_builds_with_the_request_timeout() {
        assert!(SearchConsoleClient::new(None).is_ok());
    }

    #[tokio::test]
    async fn missing_token_degrades_to_no_sites() {
        let client = SearchConsoleClient::new(None).unwrap();
        assert!(client.confirm_sites(None).await.is_empty());
        assert!(client.confirm_sites(Some("example.com")).await.is_empty());
    }
}
