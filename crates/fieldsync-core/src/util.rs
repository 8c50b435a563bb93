//! Small helpers shared by config parsing, the HTTP client and the stores.

const ERROR_SNIPPET_CHARS: usize = 180;

/// Trim an optional setting, treating blank values as unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Validate an API base URL and strip trailing slashes so paths can be appended.
///
/// Returns `None` for blank input or anything that is not `http://` / `https://`.
pub fn http_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let has_scheme = trimmed.starts_with("http://") || trimmed.starts_with("https://");
    has_scheme.then(|| trimmed.trim_end_matches('/').to_string())
}

/// First part of a response body, for embedding in error messages.
pub fn error_snippet(body: &str) -> String {
    body.trim().chars().take(ERROR_SNIPPET_CHARS).collect()
}

/// Milliseconds since the Unix epoch; every stored timestamp uses this unit.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_drops_blank_settings() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some(" \t ".to_string())), None);
        assert_eq!(
            non_empty(Some("  /var/lib/fieldsync ".to_string())),
            Some("/var/lib/fieldsync".to_string())
        );
    }

    #[test]
    fn http_base_url_requires_scheme_and_trims_slashes() {
        assert_eq!(
            http_base_url(" https://api.example.com// "),
            Some("https://api.example.com".to_string())
        );
        assert_eq!(
            http_base_url("http://localhost:8080"),
            Some("http://localhost:8080".to_string())
        );
        assert_eq!(http_base_url("ftp://example.com"), None);
        assert_eq!(http_base_url("api.example.com"), None);
        assert_eq!(http_base_url(""), None);
    }

    #[test]
    fn error_snippet_caps_long_bodies() {
        let page = "<html>".repeat(100);
        assert_eq!(error_snippet(&page).chars().count(), 180);
        assert_eq!(error_snippet("  bad gateway \n"), "bad gateway");
    }

    #[test]
    fn now_millis_is_after_2020() {
        assert!(now_millis() > 1_577_836_800_000);
    }
}
