//! Text sanitization utilities for cleaning extracted article content
//!
//! Extracted titles and summaries pass through [`clean_text`] before they
//! reach an [`ArticleRecord`](crate::models::ArticleRecord); summaries are
//! additionally bounded with [`clamp`].

use regex::Regex;
use std::sync::LazyLock;

/// Upper bound for summaries, in characters
pub const SUMMARY_LIMIT: usize = 750;

/// Marker appended to truncated text
pub const ELLIPSIS: char = '…';

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Clean a fragment of extracted text into a single normalized line
///
/// Steps:
/// 1. Remove zero-width characters
/// 2. Remove control characters
/// 3. Decode common HTML entities
/// 4. Collapse all whitespace runs (including newlines) to one space
///
/// # Examples
///
/// ```
/// use newsgate::parser::sanitize::clean_text;
///
/// let dirty = "  Уряд\u{200B} ухвалив&nbsp;рішення\n\n ";
/// assert_eq!(clean_text(dirty), "Уряд ухвалив рішення");
/// ```
pub fn clean_text(text: &str) -> String {
    let result = remove_zero_width(text);
    let result = remove_control_chars(&result);
    let result = decode_html_entities(&result);
    collapse_whitespace(&result)
}

/// Collapse whitespace and bound the text to `limit` characters
///
/// Text at or under the limit is returned whitespace-collapsed and otherwise
/// unchanged. Longer text is cut to exactly `limit` characters followed by a
/// single [`ELLIPSIS`]. Counting is by Unicode scalar values, so Cyrillic
/// text is never split mid-character.
///
/// # Examples
///
/// ```
/// use newsgate::parser::sanitize::clamp;
///
/// assert_eq!(clamp("  short   text ", 750), "short text");
///
/// let long = "ї".repeat(800);
/// let clamped = clamp(&long, 750);
/// assert_eq!(clamped.chars().count(), 751);
/// assert!(clamped.ends_with('…'));
/// ```
pub fn clamp(text: &str, limit: usize) -> String {
    let collapsed = collapse_whitespace(text);

    match collapsed.char_indices().nth(limit) {
        None => collapsed,
        Some((cut, _)) => {
            let mut head = collapsed[..cut].to_string();
            head.push(ELLIPSIS);
            head
        }
    }
}

/// Clamp a summary to [`SUMMARY_LIMIT`]
pub fn clamp_summary(text: &str) -> String {
    clamp(text, SUMMARY_LIMIT)
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

/// Remove zero-width spaces and similar invisible characters
///
/// Covers U+200B..U+200F, U+2028..U+202F and the byte order mark.
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202F}' | '\u{FEFF}'))
        .collect()
}

/// Remove control characters, turning newlines and tabs into spaces
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\n' | '\t' | '\r' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

/// Decode the HTML entities that survive in attribute values and raw text
///
/// `&amp;` is decoded last so that `&amp;lt;` stays `&lt;`.
pub fn decode_html_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&#xa0;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&laquo;", "«")
        .replace("&raquo;", "»")
        .replace("&mdash;", "—")
        .replace("&ndash;", "–")
        .replace("&amp;", "&")
}

/// Case-insensitive check that `text` contains at least one keyword
///
/// An empty keyword list always matches.
pub fn contains_any_keyword(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }

    let haystack = text.to_lowercase();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .any(|k| haystack.contains(&k))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_under_limit_is_unchanged() {
        let text = "a".repeat(750);
        assert_eq!(clamp(&text, 750), text);
        assert_eq!(clamp("  a \n\n b  ", 750), "a b");
    }

    #[test]
    fn test_clamp_over_limit_exact_length() {
        let text = "б".repeat(751);
        let clamped = clamp(&text, 750);
        assert_eq!(clamped.chars().count(), 751);
        assert_eq!(clamped.chars().filter(|c| *c == ELLIPSIS).count(), 1);
        assert!(clamped.starts_with(&"б".repeat(750)));
    }

    #[test]
    fn test_clamp_counts_after_collapsing() {
        // 760 raw chars but only 743 after collapsing
        let text = format!("{}{}", "x".repeat(740), " ".repeat(18)) + "yz";
        assert_eq!(clamp(&text, 750), format!("{} yz", "x".repeat(740)));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Hello\u{200B}\u{FEFF} &amp; bye\x07"), "Hello & bye");
        assert_eq!(clean_text("line1\n\tline2"), "line1 line2");
        assert_eq!(clean_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_contains_any_keyword() {
        let keywords = vec!["Пенсії".to_string(), "субсидія".to_string()];
        assert!(contains_any_keyword("Уряд змінив ПЕНСІЇ", &keywords));
        assert!(!contains_any_keyword("Погода на завтра", &keywords));
        assert!(contains_any_keyword("anything", &[]));
    }
}
