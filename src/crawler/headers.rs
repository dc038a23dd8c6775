use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT,
};

/// Browser-like user agent sent when none is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Accept-Language preferring Ukrainian, then Russian and English
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "uk,ru;q=0.8,en;q=0.6";

/// Build the fixed headers sent with every page request
///
/// Invalid header values fall back to the defaults above rather than
/// failing, so a bad config value never prevents a run.
///
/// # Examples
///
/// ```
/// use newsgate::crawler::headers::build_page_headers;
/// use reqwest::header::ACCEPT_LANGUAGE;
///
/// let headers = build_page_headers("newsgate-test/1.0", "uk");
/// assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), "uk");
/// ```
pub fn build_page_headers(user_agent: &str, accept_language: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(accept_language)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE)),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );

    headers
}

/// Add a referer to an existing header map, ignoring unusable values
pub fn with_referer(mut headers: HeaderMap, referer: Option<&str>) -> HeaderMap {
    if let Some(value) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
        headers.insert(REFERER, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_page_headers() {
        let headers = build_page_headers(DEFAULT_USER_AGENT, DEFAULT_ACCEPT_LANGUAGE);

        assert_eq!(
            headers.get(USER_AGENT).unwrap().to_str().unwrap(),
            DEFAULT_USER_AGENT
        );
        assert_eq!(
            headers.get(ACCEPT_LANGUAGE).unwrap().to_str().unwrap(),
            "uk,ru;q=0.8,en;q=0.6"
        );
        assert!(headers.contains_key(ACCEPT));
        assert!(!headers.contains_key(REFERER));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let headers = build_page_headers("bad\nagent", "uk\r\n");

        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
        assert_eq!(headers.get(ACCEPT_LANGUAGE).unwrap(), DEFAULT_ACCEPT_LANGUAGE);
    }

    #[test]
    fn test_with_referer() {
        let headers = with_referer(
            build_page_headers(DEFAULT_USER_AGENT, "uk"),
            Some("https://www.msp.gov.ua/press-center/news"),
        );
        assert_eq!(
            headers.get(REFERER).unwrap(),
            "https://www.msp.gov.ua/press-center/news"
        );

        let headers = with_referer(HeaderMap::new(), None);
        assert!(headers.is_empty());
    }
}
