//! Domain ownership guard.
//!
//! Decides whether a canonical URL is covered by a user's verified-site
//! set. Tokens come from the verification provider either as bare
//! hostnames or as `sc-domain:` property tokens.
//!
//! Matching uses domain-suffix semantics: a host is covered when it equals
//! a verified token or sits on a subdomain of it. A verified `shop.com`
//! covers `www.shop.com` and `blog.shop.com` but never `badshop.com`.

use url::Url;

use super::error::IndexingError;

/// Prefix used by provider-level "domain property" tokens.
const DOMAIN_PROPERTY_PREFIX: &str = "sc-domain:";

/// Extract the host of a canonical URL, minus any leading `www.`.
pub fn host_of(url: &str) -> Result<String, IndexingError> {
    let parsed =
        Url::parse(url).map_err(|_| IndexingError::InvalidInput(format!("Not a valid URL: {}", url)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| IndexingError::InvalidInput(format!("URL has no host: {}", url)))?;
    Ok(strip_www(host).to_ascii_lowercase())
}

/// Reduce a verified-site token to a comparable hostname.
///
/// Strips the `sc-domain:` property prefix, any scheme, and a leading
/// `www.`, and lowercases the remainder.
pub fn canonical_token(token: &str) -> String {
    let token = token.trim();
    let token = token.strip_prefix(DOMAIN_PROPERTY_PREFIX).unwrap_or(token);
    let token = token
        .strip_prefix("https://")
        .or_else(|| token.strip_prefix("http://"))
        .unwrap_or(token);
    let token = token.split('/').next().unwrap_or(token);
    strip_www(token).to_ascii_lowercase()
}

/// Test whether `host` is covered by any entry in the verified-site set.
pub fn is_covered(host: &str, verified_sites: &[String]) -> bool {
    verified_sites.iter().any(|site| {
        let token = canonical_token(site);
        !token.is_empty() && (host == token || host.ends_with(&format!(".{}", token)))
    })
}

/// Authorize a canonical URL against the verified-site set.
///
/// Returns the offending host inside `Unauthorized` when no token covers it.
pub fn authorize(url: &str, verified_sites: &[String]) -> Result<(), IndexingError> {
    let host = host_of(url)?;
    if is_covered(&host, verified_sites) {
        Ok(())
    } else {
        Err(IndexingError::Unauthorized { host })
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
