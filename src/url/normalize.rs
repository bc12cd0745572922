use crate::UrlError;
use url::Url;

/// Normalizes a URL into the canonical identity used by the queue's
/// visited/pending sets and the response cache keys.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject non-HTTP(S) schemes
/// 3. Remove the fragment (everything after #)
/// 4. Remove a single trailing slash from the path, except for the root path
///
/// Two URLs differing only in fragment or a single trailing slash are the
/// same entity. Query strings are kept as-is: government portals routinely
/// key distinct listings off query parameters.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(String)` - Normalized URL string
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use hojokin_harvester::url::normalize_url;
///
/// let url = normalize_url("https://example.go.jp/subsidy/#overview").unwrap();
/// assert_eq!(url, "https://example.go.jp/subsidy");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.go.jp/page#section").unwrap();
        assert_eq!(result, "https://example.go.jp/page");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.go.jp/page/").unwrap();
        assert_eq!(result, "https://example.go.jp/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.go.jp/").unwrap();
        assert_eq!(result, "https://example.go.jp/");
    }

    #[test]
    fn test_bare_host_gets_root_path() {
        let result = normalize_url("https://example.go.jp").unwrap();
        assert_eq!(result, "https://example.go.jp/");
    }

    #[test]
    fn test_fragment_and_slash_same_identity() {
        let a = normalize_url("https://example.go.jp/subsidy/").unwrap();
        let b = normalize_url("https://example.go.jp/subsidy#apply").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_query_preserved() {
        let result = normalize_url("https://example.go.jp/search?page=2&kw=補助金").unwrap();
        assert!(result.contains("page=2"));
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.go.jp/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_trailing_whitespace_trimmed() {
        let result = normalize_url("  https://example.go.jp/page \n").unwrap();
        assert_eq!(result, "https://example.go.jp/page");
    }
}
