//! URL canonicalization and resolution
//!
//! The canonical form of a URL is the sole deduplication key of the
//! collector: two links that differ only by fragment or by tracking query
//! parameters must canonicalize to the same string.

use url::Url;

/// Query parameters that carry campaign or click tracking and never select content
pub const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "dclid",
    "yclid",
    "msclkid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "_ga",
];

/// Link schemes that never lead to an article page
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Check whether a query key is a tracking parameter
pub fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key)
}

/// Canonicalize a URL for deduplication
///
/// Removes the fragment and every tracking parameter, keeping the remaining
/// query parameters in their original order and encoding. Parseable URLs are
/// also normalized by the URL parser (lowercase host, default path).
/// Unparseable input is cleaned textually; this function never fails.
///
/// # Examples
///
/// ```
/// use newsgate::crawler::url::canonicalize;
///
/// assert_eq!(
///     canonicalize("https://a.com/x?utm_source=foo&id=5#frag"),
///     "https://a.com/x?id=5"
/// );
/// ```
pub fn canonicalize(raw: &str) -> String {
    let raw = raw.trim();

    match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let filtered = parsed.query().map(filter_query);
            match filtered {
                Some(query) if !query.is_empty() => parsed.set_query(Some(&query)),
                _ => parsed.set_query(None),
            }
            parsed.to_string()
        }
        Err(_) => canonicalize_text(raw),
    }
}

/// Textual fallback for strings the URL parser rejects
fn canonicalize_text(raw: &str) -> String {
    let without_fragment = raw.split('#').next().unwrap_or_default();

    match without_fragment.split_once('?') {
        Some((base, query)) => {
            let query = filter_query(query);
            if query.is_empty() {
                base.to_string()
            } else {
                format!("{base}?{query}")
            }
        }
        None => without_fragment.to_string(),
    }
}

/// Drop tracking and empty pairs from a raw query string
fn filter_query(query: &str) -> String {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !is_tracking_param(key)
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolve an `href` against a base URL and canonicalize the result
///
/// Returns `None` for empty links, in-page anchors, non-navigational
/// schemes (`javascript:`, `mailto:`, ...) and anything that does not end up
/// as an absolute http(s) URL.
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    let base = Url::parse(base).ok()?;
    let joined = base.join(href).ok()?;

    if !is_http(&joined) {
        return None;
    }

    Some(canonicalize(joined.as_str()))
}

/// Origin key (`scheme://host[:port]`) used to cache per-host state such as robots.txt
pub fn origin_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    if !is_http(&parsed) {
        return None;
    }
    let host = parsed.host_str()?;

    Some(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fragment_and_tracking() {
        assert_eq!(
            canonicalize("https://a.com/x?utm_source=foo&id=5#frag"),
            canonicalize("https://a.com/x?id=5")
        );
        assert_eq!(
            canonicalize("https://a.com/x?utm_source=foo&id=5#frag"),
            "https://a.com/x?id=5"
        );
    }

    #[test]
    fn test_preserves_param_order() {
        assert_eq!(
            canonicalize("https://a.com/x?b=2&utm_medium=mail&a=1&gclid=zz"),
            "https://a.com/x?b=2&a=1"
        );
    }

    #[test]
    fn test_drops_empty_query() {
        assert_eq!(
            canonicalize("https://a.com/news?utm_campaign=x&fbclid=y"),
            "https://a.com/news"
        );
        assert_eq!(canonicalize("https://a.com/news?"), "https://a.com/news");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://A.com/x?utm_source=foo&id=5#frag",
            "https://a.com",
            "not a url?utm_source=1&x=2#z",
            "",
        ];
        for input in inputs {
            let once = canonicalize(input);
            assert_eq!(canonicalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        assert_eq!(canonicalize("/relative/path#top"), "/relative/path");
        assert_eq!(canonicalize("::::"), "::::");
        assert_eq!(canonicalize("/p?utm_term=a"), "/p");
    }

    #[test]
    fn test_resolve_relative() {
        assert_eq!(
            resolve("https://www.msp.gov.ua/press-center/news", "/news/123#comments"),
            Some("https://www.msp.gov.ua/news/123".to_string())
        );
        assert_eq!(
            resolve("https://site.ua/list/", "item?id=7&utm_source=tg"),
            Some("https://site.ua/list/item?id=7".to_string())
        );
    }

    #[test]
    fn test_resolve_skips_non_navigational() {
        let base = "https://site.ua/";
        assert_eq!(resolve(base, ""), None);
        assert_eq!(resolve(base, "#top"), None);
        assert_eq!(resolve(base, "javascript:void(0)"), None);
        assert_eq!(resolve(base, "mailto:press@site.ua"), None);
        assert_eq!(resolve(base, "ftp://site.ua/file"), None);
    }

    #[test]
    fn test_origin_key() {
        assert_eq!(
            origin_key("https://site.ua/a/b?c=1"),
            Some("https://site.ua".to_string())
        );
        assert_eq!(
            origin_key("http://127.0.0.1:8080/x"),
            Some("http://127.0.0.1:8080".to_string())
        );
        assert_eq!(origin_key("file:///etc/passwd"), None);
    }
}
