//! Common test utilities

#![allow(dead_code)]

use std::time::Duration;

use newsgate::config::{SiteConfig, SiteEntry};
use newsgate::crawler::{Collector, PageFetcher};

/// Build a validated site from the essentials
pub fn site(name: &str, start_url: String, allow: &[&str]) -> SiteConfig {
    site_with(
        SiteEntry {
            name: name.to_string(),
            start_urls: vec![start_url],
            allow_patterns: allow.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        },
    )
}

/// Build a validated site from a full entry
pub fn site_with(entry: SiteEntry) -> SiteConfig {
    SiteConfig::from_entry(1, entry).expect("test site should be valid")
}

/// Collector without polite delays and with fast retries
pub fn fast_collector() -> Collector {
    let fetcher = PageFetcher::new(1000)
        .expect("client")
        .with_retry_delay(1);
    Collector::new(fetcher).with_delay(Duration::ZERO, Duration::ZERO)
}

/// Listing page linking to `hrefs`
pub fn listing_html(hrefs: &[String]) -> String {
    let anchors: String = hrefs
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">{href}</a></li>"#))
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

/// Article page with a title, a metadata date and a body paragraph
pub fn article_html(title: &str, published: &str, body: &str) -> String {
    format!(
        r#"<html><head>
<meta property="article:published_time" content="{published}">
<title>{title} | Site</title>
</head><body><article><h1>{title}</h1><p>{body}</p></article></body></html>"#
    )
}
