//! Integration tests for URL canonicalization and link discovery
//!
//! These tests validate tracking-parameter stripping, idempotence and
//! listing-page link extraction.

use newsgate::crawler::list::extract_links;
use newsgate::crawler::url::{canonicalize, is_tracking_param, resolve, TRACKING_PARAMS};
use proptest::prelude::*;
use scraper::Selector;

/// Test URL extraction from a listing page fixture
#[test]
fn test_link_extraction_from_fixture() {
    let html = include_str!("fixtures/html/list_page.html");
    let selector = Selector::parse(".news-list a[href]").unwrap();

    let links = extract_links(html, "https://www.msp.gov.ua/news", &selector, None);

    assert_eq!(
        links,
        vec![
            "https://www.msp.gov.ua/news/25601.html",
            "https://www.msp.gov.ua/news/25600.html",
            "https://www.msp.gov.ua/news/25599.html?page=2",
            "https://www.msp.gov.ua/news/archive/2019",
        ]
    );
}

/// Test that non-navigational anchors never become links
#[test]
fn test_fixture_skips_non_http_anchors() {
    let html = include_str!("fixtures/html/list_page.html");
    let selector = Selector::parse("a[href]").unwrap();

    let links = extract_links(html, "https://www.msp.gov.ua/news", &selector, None);

    assert!(links.iter().all(|l| l.starts_with("https://")));
    assert!(!links.iter().any(|l| l.contains('#')));
    assert!(!links.iter().any(|l| l.contains("mailto")));
}

/// Test relative resolution against a configured base
#[test]
fn test_configured_base_wins() {
    let html = r#"<a href="news/1">1</a>"#;
    let selector = Selector::parse("a[href]").unwrap();

    let links = extract_links(
        html,
        "https://site.ua/list/page",
        &selector,
        Some("https://cdn.site.ua/root/"),
    );

    assert_eq!(links, vec!["https://cdn.site.ua/root/news/1"]);
}

#[test]
fn test_tracking_params_known() {
    for param in ["utm_source", "utm_medium", "utm_campaign", "fbclid", "gclid", "mc_cid"] {
        assert!(is_tracking_param(param), "{param} should be tracking");
    }
    assert!(!is_tracking_param("page"));
    assert!(!is_tracking_param("id"));
}

#[test]
fn test_order_of_remaining_params_kept() {
    assert_eq!(
        canonicalize("https://a.ua/x?b=2&utm_source=x&a=1&gclid=9"),
        "https://a.ua/x?b=2&a=1"
    );
    assert_eq!(canonicalize("https://a.ua/x?utm_term=q#top"), "https://a.ua/x");
}

#[test]
fn test_resolve_relative() {
    assert_eq!(
        resolve("https://a.ua/news/", "../about?utm_medium=x").as_deref(),
        Some("https://a.ua/about")
    );
    assert_eq!(resolve("https://a.ua/", "tel:+380441234567"), None);
    assert_eq!(resolve("https://a.ua/", "ftp://a.ua/file"), None);
}

fn url_strategy() -> impl Strategy<Value = String> {
    "https://[a-z]{1,10}\\.ua/[a-z0-9/]{0,15}(\\?[a-z_]{1,8}=[a-z0-9]{0,5}(&[a-z_]{1,8}=[a-z0-9]{0,5}){0,3})?(#[a-z]{0,5})?"
}

proptest! {
    #[test]
    fn prop_canonicalize_idempotent(url in url_strategy()) {
        let once = canonicalize(&url);
        prop_assert_eq!(canonicalize(&once), once.clone());
    }

    #[test]
    fn prop_canonicalize_removes_tracking_and_fragment(
        url in url_strategy(),
        idx in 0..TRACKING_PARAMS.len(),
        value in "[a-z0-9]{1,6}",
    ) {
        let base = url.split('#').next().unwrap().to_string();
        let sep = if base.contains('?') { '&' } else { '?' };
        let tracked = format!("{base}{sep}{}={value}#section", TRACKING_PARAMS[idx]);

        let canonical = canonicalize(&tracked);
        prop_assert!(!canonical.contains('#'));
        if let Some((_, query)) = canonical.split_once('?') {
            let no_tracking = query.split('&').all(|pair| {
                !is_tracking_param(pair.split('=').next().unwrap_or_default())
            });
            prop_assert!(no_tracking);
        }
        prop_assert_eq!(canonical, canonicalize(&base));
    }

    #[test]
    fn prop_canonicalize_never_panics(raw in "\\PC{0,60}") {
        let _ = canonicalize(&raw);
    }
}
