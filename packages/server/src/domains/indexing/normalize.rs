//! URL canonicalization for submitted targets.

use url::Url;

use super::error::IndexingError;

/// Canonicalize a raw URL or bare hostname into a scheme-qualified URL.
///
/// Trims surrounding whitespace and prefixes `https://` when no scheme is
/// present. Fails with `InvalidInput` when the token is empty or still
/// unparsable after normalization. Pure function, no side effects.
pub fn normalize_url(raw: &str) -> Result<String, IndexingError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IndexingError::InvalidInput("URL is required".to_string()));
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate)
        .map_err(|_| IndexingError::InvalidInput(format!("Not a valid URL: {}", trimmed)))?;
    if parsed.host_str().is_none() {
        return Err(IndexingError::InvalidInput(format!(
            "Not a valid URL: {}",
            trimmed
        )));
    }

    Ok(candidate)
}

fn has_http_scheme(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_https_for_bare_hosts() {
        assert_eq!(normalize_url("example.com").unwrap(), "https://example.com");
    }

    #[test]
    fn leaves_existing_scheme_alone() {
        assert_eq!(normalize_url("http://x.com").unwrap(), "http://x.com");
        assert_eq!(
            normalize_url("HTTPS://upper.example.com").unwrap(),
            "HTTPS://upper.example.com"
        );
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(
            normalize_url("  example.com/page \n").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            normalize_url(""),
            Err(IndexingError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_url("   "),
            Err(IndexingError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_unparsable_input() {
        assert!(matches!(
            normalize_url("ht tp://broken"),
            Err(IndexingError::InvalidInput(_))
        ));
    }
}
