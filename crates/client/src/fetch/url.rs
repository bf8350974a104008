//! Parsing of configured upstream URLs.

/// Error type for source URL parsing failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse a configured source URL.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an absolute `http` or `https` URL
/// 3. Remove fragment (#...)
/// 4. Keep query string intact
pub fn parse_source_url(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let url = parse_source_url("http://www.open-std.org/jtc1/sc22/wg21/docs/cwg_active.html").unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("www.open-std.org"));
        assert_eq!(url.path(), "/jtc1/sc22/wg21/docs/cwg_active.html");
    }

    #[test]
    fn test_parse_lowercases_host() {
        let url = parse_source_url("https://EXAMPLE.COM/a.html").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_parse_removes_fragment_keeps_query() {
        let url = parse_source_url("https://example.com/list.html?rev=2#1234").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("rev=2"));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let url = parse_source_url("  https://example.com  ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_requires_scheme() {
        assert!(matches!(parse_source_url("example.com/a.html"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_unsupported_scheme() {
        let result = parse_source_url("file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_source_url(""), Err(UrlError::Empty)));
        assert!(matches!(parse_source_url("   "), Err(UrlError::Empty)));
    }
}
