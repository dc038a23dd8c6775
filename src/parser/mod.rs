//! HTML parsing and data extraction
//!
//! This module turns fetched article pages into titles, summaries and
//! publication dates.

pub mod date;
pub mod html;
pub mod sanitize;
pub mod selectors;

// Re-export main extractor and public types
pub use date::{parse_date_value, parse_localized, parse_timezone};
pub use html::{ArticleExtractor, ExtractedArticle, Page};
pub use sanitize::{clamp, clean_text, SUMMARY_LIMIT};
