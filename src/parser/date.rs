//! Locale-aware publication date parsing
//!
//! Values come from three kinds of places: machine-readable metadata
//! (`content`/`datetime` attributes), site-specific elements whose text or
//! attribute holds a date, and free page text written in Ukrainian or
//! Russian ("5 вересня 2025"). Every parser here returns `None` on
//! malformed input; nothing in this module raises.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::LazyLock;

use crate::utils::error::ParseError;

/// Default display timezone
pub const DEFAULT_TIMEZONE: &str = "Europe/Kyiv";

/// Month names keyed by lowercase spelling
///
/// Ukrainian genitive forms (as used in dates), Ukrainian nominative forms
/// and Russian genitive forms.
const MONTHS: &[(&str, u32)] = &[
    ("січня", 1),
    ("лютого", 2),
    ("березня", 3),
    ("квітня", 4),
    ("травня", 5),
    ("червня", 6),
    ("липня", 7),
    ("серпня", 8),
    ("вересня", 9),
    ("жовтня", 10),
    ("листопада", 11),
    ("грудня", 12),
    ("січень", 1),
    ("лютий", 2),
    ("березень", 3),
    ("квітень", 4),
    ("травень", 5),
    ("червень", 6),
    ("липень", 7),
    ("серпень", 8),
    ("вересень", 9),
    ("жовтень", 10),
    ("листопад", 11),
    ("грудень", 12),
    ("января", 1),
    ("февраля", 2),
    ("марта", 3),
    ("апреля", 4),
    ("мая", 5),
    ("июня", 6),
    ("июля", 7),
    ("августа", 8),
    ("сентября", 9),
    ("октября", 10),
    ("ноября", 11),
    ("декабря", 12),
];

/// Naive date-time layouts, interpreted as UTC
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y, %H:%M",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Date-only layouts, interpreted as midnight UTC
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d"];

/// Layouts carrying an explicit offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
];

static LOCALIZED_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s+([А-Яа-яІіЇїЄєҐґЁё]+)\s+(\d{4})").unwrap());

static EMBEDDED_ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?")
        .unwrap()
});

static EMBEDDED_DOTTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})(?:\s*,?\s*(\d{1,2}):(\d{2}))?").unwrap()
});

/// Resolve an IANA timezone name
///
/// # Examples
///
/// ```
/// use newsgate::parser::date::parse_timezone;
///
/// assert!(parse_timezone("Europe/Kyiv").is_ok());
/// assert!(parse_timezone("Mars/Olympus").is_err());
/// ```
pub fn parse_timezone(name: &str) -> Result<Tz, ParseError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| ParseError::UnknownTimezone(name.to_string()))
}

/// Look up a month number by its Ukrainian or Russian name
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(month, _)| *month == lower)
        .map(|(_, number)| *number)
}

/// Parse a date value from metadata, an attribute or a short element text
///
/// Site-specific `formats` (chrono `strftime` syntax) are tried first, then
/// RFC 3339, RFC 2822 and the common numeric layouts. If the value as a
/// whole does not parse, an embedded ISO or `dd.mm.yyyy` date is searched
/// for. Values without an offset are taken as UTC; date-only values become
/// midnight UTC.
pub fn parse_date_value(value: &str, formats: &[String]) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    parse_with_formats(value, formats.iter().map(String::as_str))
        .or_else(|| parse_structured(value))
        .or_else(|| parse_embedded(value))
}

fn parse_with_formats<'a>(
    value: &str,
    formats: impl Iterator<Item = &'a str>,
) -> Option<DateTime<Utc>> {
    for format in formats {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_time(NaiveTime::MIN).and_utc());
        }
    }
    None
}

fn parse_structured(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    // "2025-09-05T10:00:00+0300" and friends
    let offset = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::<FixedOffset>::parse_from_str(value, format).ok());
    if let Some(dt) = offset {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok());
    if let Some(naive) = naive {
        return Some(naive.and_utc());
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

fn parse_embedded(value: &str) -> Option<DateTime<Utc>> {
    if let Some(found) = EMBEDDED_ISO.find(value) {
        if let Some(dt) = parse_structured(found.as_str()) {
            return Some(dt);
        }
    }

    let caps = EMBEDDED_DOTTED.captures(value)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let time = match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => {
            NaiveTime::from_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, 0)?
        }
        _ => NaiveTime::MIN,
    };

    Some(date.and_time(time).and_utc())
}

/// Find the first `<day> <month name> <year>` date in free text
///
/// The date is taken as midnight in `tz`. Matches whose word is not a known
/// month name, or whose day does not exist, are skipped and the search
/// continues.
///
/// # Examples
///
/// ```
/// use newsgate::parser::date::parse_localized;
///
/// let tz: chrono_tz::Tz = "Europe/Kyiv".parse().unwrap();
/// let dt = parse_localized("Опубліковано 5 вересня 2025 о 10:00", tz).unwrap();
/// assert_eq!(dt.to_rfc3339(), "2025-09-04T21:00:00+00:00");
/// ```
pub fn parse_localized(text: &str, tz: Tz) -> Option<DateTime<Utc>> {
    LOCALIZED_DATE.captures_iter(text).find_map(|caps| {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        local_midnight(date, tz)
    })
}

/// Start of `date` in `tz`, as a UTC instant
pub fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD..YYYY-MM-DD` into an inclusive day range
///
/// An empty argument means the seven days ending `today`.
///
/// # Errors
///
/// Returns `ParseError::InvalidDate` for malformed input or a range whose
/// end precedes its start.
pub fn parse_day_range(arg: &str, today: NaiveDate) -> Result<(NaiveDate, NaiveDate), ParseError> {
    let arg = arg.trim();
    let day = |value: &str| {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| ParseError::InvalidDate(value.trim().to_string()))
    };

    let (start, end) = if arg.is_empty() {
        (today - chrono::Duration::days(6), today)
    } else if let Some((left, right)) = arg.split_once("..") {
        (day(left)?, day(right)?)
    } else {
        let d = day(arg)?;
        (d, d)
    };

    if end < start {
        return Err(ParseError::InvalidDate(arg.to_string()));
    }
    Ok((start, end))
}

/// Convert a UTC instant into the display timezone, keeping the offset
pub fn to_display(dt: DateTime<Utc>, tz: Tz) -> DateTime<FixedOffset> {
    dt.with_timezone(&tz).fixed_offset()
}
