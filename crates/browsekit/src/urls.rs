//! URL normalization for cache keys
//!
//! All functions here are permissive: a URL that does not parse is handed
//! back unchanged so the fetch can still be attempted downstream.

use url::Url;

/// Query parameters removed by [`strip_tracking_params`] when no explicit list
/// is given
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
    "source",
    "campaign",
];

/// Normalize a URL by removing its fragment
///
/// Two URLs that differ only in `#fragment` normalize to the same string.
pub fn normalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Remove tracking query parameters, keeping the order of the rest
pub fn strip_tracking_params(url: &str, params: Option<&[&str]>) -> String {
    let params = params.unwrap_or(DEFAULT_TRACKING_PARAMS);

    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };

    if parsed.query().is_none() {
        return parsed.to_string();
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !params.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    parsed.to_string()
}

/// Check that a URL has both a scheme and a host
pub fn is_valid(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.has_host() && !parsed.scheme().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_fragment() {
        assert_eq!(
            normalize("https://example.com/docs#install"),
            "https://example.com/docs"
        );
        assert_eq!(
            normalize("https://example.com/docs#usage"),
            normalize("https://example.com/docs")
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("https://Example.com/a/b?x=1#frag");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_keeps_query() {
        assert_eq!(
            normalize("https://example.com/search?q=rust#top"),
            "https://example.com/search?q=rust"
        );
    }

    #[test]
    fn test_normalize_invalid_passthrough() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_strip_tracking_params_default() {
        assert_eq!(
            strip_tracking_params(
                "https://example.com/post?id=7&utm_source=news&page=2&fbclid=abc",
                None
            ),
            "https://example.com/post?id=7&page=2"
        );
    }

    #[test]
    fn test_strip_tracking_params_all_removed() {
        assert_eq!(
            strip_tracking_params("https://example.com/post?utm_medium=email", None),
            "https://example.com/post"
        );
    }

    #[test]
    fn test_strip_tracking_params_custom_list() {
        assert_eq!(
            strip_tracking_params("https://example.com/?a=1&b=2&c=3", Some(&["b"])),
            "https://example.com/?a=1&c=3"
        );
    }

    #[test]
    fn test_strip_tracking_params_invalid_passthrough() {
        assert_eq!(strip_tracking_params("::bad::", None), "::bad::");
    }

    #[test]
    fn test_is_valid() {
        assert!(is_valid("https://example.com"));
        assert!(is_valid("http://localhost:8080/path"));
        assert!(!is_valid("example.com"));
        assert!(!is_valid("mailto:someone@example.com"));
        assert!(!is_valid(""));
    }
}
