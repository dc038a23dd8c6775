//! Article extraction with ordered fallback cascades
//!
//! Each field is recovered by an explicit list of strategies tried in
//! order; the first non-empty result wins. The lists are plain data so the
//! fallback order is visible in one place and testable on its own.

use std::cell::OnceCell;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use scraper::{ElementRef, Html, Selector};

use crate::config::{SiteConfig, DEFAULT_TITLE_PLACEHOLDER};
use crate::parser::date::{parse_date_value, parse_localized, to_display};
use crate::parser::sanitize::{clamp_summary, clean_text, collapse_whitespace};
use crate::parser::selectors::GenericSelectors;

/// Minimum length of a stand-alone paragraph used as a summary
pub const MIN_PARAGRAPH_CHARS: usize = 40;

/// A text strategy: page and site in, candidate text out
pub type TextStrategy = fn(&Page, &SiteConfig) -> Option<String>;

/// A date strategy: page, site and display timezone in, instant out
pub type DateStrategy = fn(&Page, &SiteConfig, Tz) -> Option<DateTime<Utc>>;

/// Title cascade
pub const TITLE_STRATEGIES: &[(&str, TextStrategy)] = &[
    ("site_selector", title_from_site_selector),
    ("heading", title_from_heading),
    ("og_title", title_from_og),
    ("document_title", title_from_document),
];

/// Summary cascade
pub const SUMMARY_STRATEGIES: &[(&str, TextStrategy)] = &[
    ("site_selector", summary_from_site_selector),
    ("content_paragraph", summary_from_content_paragraph),
    ("long_paragraph", summary_from_long_paragraph),
    ("meta_description", summary_from_meta_description),
    ("og_description", summary_from_og_description),
];

/// Publication date cascade; the current time is used when all fail
pub const DATE_STRATEGIES: &[(&str, DateStrategy)] = &[
    ("metadata", date_from_metadata),
    ("site_selector", date_from_site_selector),
    ("localized_text", date_from_localized_text),
];

/// A parsed article page
pub struct Page {
    document: Html,
    url: String,
    text: OnceCell<String>,
}

impl Page {
    /// Parse page HTML
    pub fn parse(html: &str, url: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            url: url.to_string(),
            text: OnceCell::new(),
        }
    }

    /// The parsed document
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// URL the page was fetched from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Visible page text with scripts and styles left out, whitespace collapsed
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| visible_text(&self.document))
    }
}

/// Fields recovered from an article page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub summary: String,
    pub published_at: DateTime<FixedOffset>,
    /// Name of the date strategy that matched, `None` when the time of
    /// extraction was used
    pub date_source: Option<&'static str>,
}

/// Article extractor for arbitrary HTML news pages
pub struct ArticleExtractor {
    tz: Tz,
    title_placeholder: String,
}

impl ArticleExtractor {
    /// Create an extractor reporting dates in `tz`
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            title_placeholder: DEFAULT_TITLE_PLACEHOLDER.to_string(),
        }
    }

    /// Use a different title for pages whose title cannot be recovered
    #[must_use]
    pub fn with_title_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.title_placeholder = placeholder.into();
        self
    }

    /// Display timezone
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Extract title, summary and publication date from page HTML
    pub fn extract(&self, html: &str, url: &str, site: &SiteConfig) -> ExtractedArticle {
        self.extract_page(&Page::parse(html, url), site)
    }

    /// Extract from an already parsed page
    pub fn extract_page(&self, page: &Page, site: &SiteConfig) -> ExtractedArticle {
        let title = match run_cascade(TITLE_STRATEGIES, page, site) {
            Some((strategy, title)) => {
                tracing::trace!(url = %page.url, strategy, "Title extracted");
                title
            }
            None => {
                tracing::debug!(url = %page.url, "No title found, using placeholder");
                self.title_placeholder.clone()
            }
        };

        let summary = run_cascade(SUMMARY_STRATEGIES, page, site)
            .map(|(_, summary)| clamp_summary(&summary))
            .unwrap_or_default();

        let (published, date_source) = match self.extract_date(page, site) {
            Some((strategy, dt)) => (dt, Some(strategy)),
            None => {
                tracing::debug!(url = %page.url, "No publication date found, using now");
                (Utc::now(), None)
            }
        };

        ExtractedArticle {
            title,
            summary,
            published_at: to_display(published, self.tz),
            date_source,
        }
    }

    fn extract_date(&self, page: &Page, site: &SiteConfig) -> Option<(&'static str, DateTime<Utc>)> {
        DATE_STRATEGIES
            .iter()
            .find_map(|(name, strategy)| strategy(page, site, self.tz).map(|dt| (*name, dt)))
    }
}

/// Run a text cascade, returning the first non-empty result and its strategy
pub fn run_cascade(
    strategies: &[(&'static str, TextStrategy)],
    page: &Page,
    site: &SiteConfig,
) -> Option<(&'static str, String)> {
    strategies.iter().find_map(|(name, strategy)| {
        strategy(page, site)
            .map(|text| clean_text(&text))
            .filter(|text| !text.is_empty())
            .map(|text| (*name, text))
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn first_text(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn first_attr(document: &Html, selectors: &[Selector], attr: &str) -> Option<String> {
    selectors.iter().find_map(|selector| {
        document
            .select(selector)
            .filter_map(|el| el.value().attr(attr))
            .map(clean_text)
            .find(|text| !text.is_empty())
    })
}

fn visible_text(document: &Html) -> String {
    let parts: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor.value().as_element().is_some_and(|el| {
                    matches!(el.name(), "script" | "style" | "noscript" | "template")
                })
            });
            (!hidden).then_some(&**text)
        })
        .collect();

    collapse_whitespace(&parts.join(" "))
}

fn title_from_site_selector(page: &Page, site: &SiteConfig) -> Option<String> {
    let selector = site.title_selector.as_ref()?;
    first_text(&page.document, std::slice::from_ref(selector))
}

fn title_from_heading(page: &Page, _site: &SiteConfig) -> Option<String> {
    first_text(&page.document, GenericSelectors::new().heading)
}

fn title_from_og(page: &Page, _site: &SiteConfig) -> Option<String> {
    first_attr(&page.document, GenericSelectors::new().og_title, "content")
}

fn title_from_document(page: &Page, _site: &SiteConfig) -> Option<String> {
    first_text(&page.document, GenericSelectors::new().document_title)
}

fn summary_from_site_selector(page: &Page, site: &SiteConfig) -> Option<String> {
    let selector = site.summary_selector.as_ref()?;
    first_text(&page.document, std::slice::from_ref(selector))
}

fn summary_from_content_paragraph(page: &Page, _site: &SiteConfig) -> Option<String> {
    first_text(&page.document, GenericSelectors::new().paragraph)
}

fn summary_from_long_paragraph(page: &Page, _site: &SiteConfig) -> Option<String> {
    GenericSelectors::new()
        .any_paragraph
        .iter()
        .flat_map(|selector| page.document.select(selector))
        .map(element_text)
        .find(|text| text.chars().count() >= MIN_PARAGRAPH_CHARS)
}

fn summary_from_meta_description(page: &Page, _site: &SiteConfig) -> Option<String> {
    first_attr(&page.document, GenericSelectors::new().meta_description, "content")
}

fn summary_from_og_description(page: &Page, _site: &SiteConfig) -> Option<String> {
    first_attr(&page.document, GenericSelectors::new().og_description, "content")
}

fn date_from_metadata(page: &Page, site: &SiteConfig, _tz: Tz) -> Option<DateTime<Utc>> {
    GenericSelectors::new()
        .meta_date
        .iter()
        .flat_map(|(selector, attr)| {
            page.document
                .select(selector)
                .filter_map(move |el| el.value().attr(attr))
        })
        .find_map(|value| parse_date_value(value, &site.date_formats))
}

fn date_from_site_selector(page: &Page, site: &SiteConfig, tz: Tz) -> Option<DateTime<Utc>> {
    let selector = site.date_selector.as_ref()?;

    page.document.select(selector).find_map(|el| {
        let from_attr = site
            .date_attr
            .as_deref()
            .and_then(|attr| el.value().attr(attr))
            .and_then(|value| parse_date_value(value, &site.date_formats));

        from_attr.or_else(|| {
            let text = element_text(el);
            parse_date_value(&text, &site.date_formats).or_else(|| parse_localized(&text, tz))
        })
    })
}

fn date_from_localized_text(page: &Page, _site: &SiteConfig, tz: Tz) -> Option<DateTime<Utc>> {
    parse_localized(page.text(), tz)
}
