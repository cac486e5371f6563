//! Website URL normalization

use url::{ParseError, Url};

/// Canonical form of a company website.
///
/// Scheme and host are lower-cased, trailing slashes are stripped and query
/// and fragment are dropped; the path is kept. Input without a scheme is read
/// as `https`. Returns `None` for anything that is not an http(s) URL with a
/// dotted host name.
pub fn normalize_website(input: &str) -> Option<String> {
    let text = input.trim();
    if text.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }

    let url = match Url::parse(text) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{}", text)).ok()?,
        Err(_) => return None,
    };
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    if !host.contains('.') || host.starts_with('.') || host.ends_with('.') {
        return None;
    }

    let mut normalized = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }
    normalized.push_str(url.path().trim_end_matches('/'));
    Some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_trailing_slash() {
        assert_eq!(normalize_website("HTTPS://Acme.COM/").as_deref(), Some("https://acme.com"));
        assert_eq!(normalize_website("https://acme.com").as_deref(), Some("https://acme.com"));
        assert_eq!(
            normalize_website("https://www.Klarna.com/").as_deref(),
            Some("https://www.klarna.com")
        );
    }

    #[test]
    fn test_path_kept_query_dropped() {
        assert_eq!(
            normalize_website("https://accenture.com/digital/?utm_source=x#top").as_deref(),
            Some("https://accenture.com/digital")
        );
        assert_eq!(
            normalize_website("http://example.org:8080/a").as_deref(),
            Some("http://example.org:8080/a")
        );
    }

    #[test]
    fn test_missing_scheme_defaults_to_https() {
        assert_eq!(normalize_website("scale.com").as_deref(), Some("https://scale.com"));
    }

    #[test]
    fn test_invalid_urls() {
        assert_eq!(normalize_website(""), None);
        assert_eq!(normalize_website("not a url"), None);
        assert_eq!(normalize_website("acme"), None);
        assert_eq!(normalize_website("ftp://files.acme.com"), None);
        assert_eq!(normalize_website("mailto:hello@acme.com"), None);
    }
}
