//! Listing page link discovery
//!
//! A listing page (a site's news index) is fetched once and every anchor
//! matching the site's link selector is resolved, canonicalized and
//! de-duplicated. Order of first appearance is kept, which on most sites is
//! newest first.

use std::collections::HashSet;

use scraper::{Html, Selector};

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::url::resolve;

/// Link extractor for listing pages
pub struct LinkDiscovery<'a> {
    fetcher: &'a PageFetcher,
}

impl<'a> LinkDiscovery<'a> {
    /// Create a discovery helper borrowing the run's fetcher
    #[must_use]
    pub fn new(fetcher: &'a PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch a listing page and return its canonical article links
    ///
    /// Relative links resolve against `base_url` when given, then a
    /// `<base href>` in the page, then the listing URL itself. A fetch
    /// failure is logged and yields an empty list.
    pub async fn discover(
        &self,
        list_url: &str,
        selector: &Selector,
        base_url: Option<&str>,
    ) -> Vec<String> {
        tracing::debug!(url = %list_url, "Fetching listing page");

        let html = match self.fetcher.fetch(list_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %list_url, error = %e, "Listing page fetch failed");
                return Vec::new();
            }
        };

        let links = extract_links(&html, list_url, selector, base_url);

        tracing::debug!(url = %list_url, links = links.len(), "Discovered links");

        links
    }
}

/// Extract canonical links from listing page HTML
///
/// # Examples
///
/// ```
/// use newsgate::crawler::list::extract_links;
/// use scraper::Selector;
///
/// let html = r#"<a href="/news/1#c">1</a><a href="/news/1">again</a><a href="mailto:x@y.ua">m</a>"#;
/// let selector = Selector::parse("a[href]").unwrap();
/// let links = extract_links(html, "https://site.ua/news", &selector, None);
/// assert_eq!(links, vec!["https://site.ua/news/1".to_string()]);
/// ```
pub fn extract_links(
    html: &str,
    page_url: &str,
    selector: &Selector,
    base_url: Option<&str>,
) -> Vec<String> {
    let document = Html::parse_document(html);

    let document_base = base_href(&document).and_then(|href| resolve(page_url, &href));
    let base = base_url
        .map(str::to_string)
        .or(document_base)
        .unwrap_or_else(|| page_url.to_string());

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(url) = resolve(&base, href) {
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    }

    links
}

fn base_href(document: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors() -> Selector {
        Selector::parse("a[href]").unwrap()
    }

    #[test]
    fn test_dedup_preserves_order() {
        let html = r#"
            <ul>
              <li><a href="/news/3">3</a></li>
              <li><a href="/news/2?utm_source=fb">2</a></li>
              <li><a href="/news/3#comments">3 again</a></li>
              <li><a href="/news/2">2 again</a></li>
              <li><a href="/news/1">1</a></li>
            </ul>
        "#;

        let links = extract_links(html, "https://site.ua/news", &anchors(), None);
        assert_eq!(
            links,
            vec![
                "https://site.ua/news/3",
                "https://site.ua/news/2",
                "https://site.ua/news/1",
            ]
        );
    }

    #[test]
    fn test_skips_non_navigational() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:press@site.ua">mail</a>
            <a href="tel:+380441234567">tel</a>
            <a href="#top">top</a>
            <a href="">empty</a>
            <a>no href</a>
            <a href="/news/7">ok</a>
        "##;

        let links = extract_links(html, "https://site.ua/", &anchors(), None);
        assert_eq!(links, vec!["https://site.ua/news/7"]);
    }

    #[test]
    fn test_selector_narrows_links() {
        let html = r#"
            <nav><a href="/about">About</a></nav>
            <div class="news-list"><a href="/news/10">Ten</a></div>
        "#;
        let selector = Selector::parse(".news-list a").unwrap();

        let links = extract_links(html, "https://site.ua/", &selector, None);
        assert_eq!(links, vec!["https://site.ua/news/10"]);
    }

    #[test]
    fn test_configured_base_url_wins() {
        let html = r#"<head><base href="https://mirror.site.ua/"></head><a href="news/5">5</a>"#;

        let links = extract_links(
            html,
            "https://site.ua/list/",
            &anchors(),
            Some("https://site.ua/"),
        );
        assert_eq!(links, vec!["https://site.ua/news/5"]);

        let links = extract_links(html, "https://site.ua/list/", &anchors(), None);
        assert_eq!(links, vec!["https://mirror.site.ua/news/5"]);
    }
}
