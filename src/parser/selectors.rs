//! Generic CSS selectors for article pages
//!
//! These are the site-independent fallbacks the extractor uses when a site
//! has no selector of its own, or when its selector matches nothing.

use lazy_static::lazy_static;
use scraper::Selector;

use crate::utils::error::ParseError;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Prominent headings, most specific last so a bare h1 wins when present
    static ref HEADING_TITLE: Vec<Selector> = vec![
        parse_selector!("h1"),
        parse_selector!("h1.entry-title"),
        parse_selector!("h1.article-title"),
        parse_selector!("article h2"),
    ];

    static ref OG_TITLE: Vec<Selector> = vec![
        parse_selector!("meta[property='og:title']"),
        parse_selector!("meta[name='og:title']"),
        parse_selector!("meta[name='twitter:title']"),
    ];

    static ref DOCUMENT_TITLE: Vec<Selector> = vec![
        parse_selector!("head title"),
        parse_selector!("title"),
    ];

    // Body paragraphs in content containers
    static ref CONTENT_PARAGRAPH: Vec<Selector> = vec![
        parse_selector!("article p"),
        parse_selector!(".entry-content p"),
        parse_selector!(".article-content p"),
        parse_selector!("main p"),
    ];

    static ref ANY_PARAGRAPH: Vec<Selector> = vec![
        parse_selector!("p"),
    ];

    static ref META_DESCRIPTION: Vec<Selector> = vec![
        parse_selector!("meta[name='description']"),
    ];

    static ref OG_DESCRIPTION: Vec<Selector> = vec![
        parse_selector!("meta[property='og:description']"),
        parse_selector!("meta[name='og:description']"),
        parse_selector!("meta[name='twitter:description']"),
    ];

    // Structured publication date metadata with the attribute holding the value
    static ref META_DATE: Vec<(Selector, &'static str)> = vec![
        (parse_selector!("meta[property='article:published_time']"), "content"),
        (parse_selector!("meta[name='article:published_time']"), "content"),
        (parse_selector!("meta[property='og:article:published_time']"), "content"),
        (parse_selector!("meta[name='pubdate']"), "content"),
        (parse_selector!("meta[itemprop='datePublished']"), "content"),
        (parse_selector!("time[datetime]"), "datetime"),
    ];
}

/// Site-independent selectors used by the extraction cascades
pub struct GenericSelectors {
    pub heading: &'static [Selector],
    pub og_title: &'static [Selector],
    pub document_title: &'static [Selector],
    pub paragraph: &'static [Selector],
    pub any_paragraph: &'static [Selector],
    pub meta_description: &'static [Selector],
    pub og_description: &'static [Selector],
    pub meta_date: &'static [(Selector, &'static str)],
}

impl GenericSelectors {
    pub fn new() -> Self {
        Self {
            heading: &HEADING_TITLE,
            og_title: &OG_TITLE,
            document_title: &DOCUMENT_TITLE,
            paragraph: &CONTENT_PARAGRAPH,
            any_paragraph: &ANY_PARAGRAPH,
            meta_description: &META_DESCRIPTION,
            og_description: &OG_DESCRIPTION,
            meta_date: &META_DATE,
        }
    }
}

impl Default for GenericSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a user-supplied CSS selector
///
/// # Errors
///
/// Returns `ParseError::InvalidSelector` carrying the selector text and the
/// parser's complaint.
pub fn compile_selector(selector: &str) -> Result<Selector, ParseError> {
    Selector::parse(selector.trim()).map_err(|e| ParseError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_selectors_creation() {
        let selectors = GenericSelectors::new();
        assert_eq!(selectors.heading.len(), 4);
        assert_eq!(selectors.paragraph.len(), 4);
        assert!(!selectors.og_title.is_empty());
        assert!(!selectors.meta_description.is_empty());
        assert!(!selectors.og_description.is_empty());
    }

    #[test]
    fn test_meta_date_order() {
        let selectors = GenericSelectors::default();
        assert_eq!(selectors.meta_date.len(), 6);
        assert_eq!(selectors.meta_date[0].1, "content");
        assert_eq!(selectors.meta_date[5].1, "datetime");
    }

    #[test]
    fn test_compile_selector() {
        assert!(compile_selector("div.news a[href*='/news/']").is_ok());

        let err = compile_selector("div[[").unwrap_err();
        assert!(matches!(err, ParseError::InvalidSelector { ref selector, .. } if selector == "div[["));
    }
}
