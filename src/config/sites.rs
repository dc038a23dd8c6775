//! Site definitions for the collector
//!
//! A sites file lists the HTML sources to scrape. It is YAML (`.yaml`,
//! `.yml`) or TOML (`.toml`) with a top-level `sites` list; `sources` is
//! accepted as an alias. Every entry is validated and compiled when the
//! file is loaded, so a bad pattern or selector fails before any request is
//! made.
//!
//! ```yaml
//! sites:
//!   - name: "Мінсоцполітики — новини"
//!     start_urls: ["https://www.msp.gov.ua/press-center/news"]
//!     link_selector: "a[href*='/news/']"
//!     allow_patterns: ["/news/\\d+"]
//!     date_selector: "time"
//!     date_attr: "datetime"
//! ```

use std::path::Path;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::crawler::policy::SitePolicy;
use crate::parser::selectors::compile_selector;
use crate::utils::error::ConfigError;

/// Link selector used when a site does not set one
pub const DEFAULT_LINK_SELECTOR: &str = "a[href]";

/// A site entry as written in the sites file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteEntry {
    pub name: String,
    #[serde(alias = "list_urls")]
    pub start_urls: Vec<String>,
    pub link_selector: Option<String>,
    pub base_url: Option<String>,
    pub allow_patterns: Vec<String>,
    pub deny_patterns: Vec<String>,
    pub keywords: Vec<String>,
    pub title_selector: Option<String>,
    pub summary_selector: Option<String>,
    pub date_selector: Option<String>,
    pub date_attr: Option<String>,
    /// Extra chrono `strftime` layouts tried before the built-in ones
    pub date_formats: Vec<String>,
    #[serde(alias = "max_per_source")]
    pub max_per_site: Option<usize>,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SitesFile {
    #[serde(alias = "sources", default)]
    sites: Vec<SiteEntry>,
}

/// A validated site with its patterns and selectors compiled
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub start_urls: Vec<String>,
    pub link_selector: Selector,
    pub base_url: Option<String>,
    pub policy: SitePolicy,
    pub keywords: Vec<String>,
    pub title_selector: Option<Selector>,
    pub summary_selector: Option<Selector>,
    pub date_selector: Option<Selector>,
    pub date_attr: Option<String>,
    pub date_formats: Vec<String>,
    pub max_per_site: Option<usize>,
    pub delay_ms: Option<u64>,
}

impl SiteConfig {
    /// Validate and compile a site entry
    ///
    /// `index` is the entry's 1-based position in the file and appears in
    /// error messages together with the site name.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingField` if `name`, `start_urls` or
    ///   `allow_patterns` is empty
    /// - `ConfigError::InvalidPattern` for a regex that does not compile
    /// - `ConfigError::InvalidSelector` for a CSS selector that does not parse
    /// - `ConfigError::InvalidValue` for a relative start or base URL or a zero cap
    pub fn from_entry(index: usize, entry: SiteEntry) -> Result<Self, ConfigError> {
        let name = entry.name.trim().to_string();
        let missing = |field: &'static str| ConfigError::MissingField {
            index,
            name: if name.is_empty() { "<unnamed>".to_string() } else { name.clone() },
            field,
        };

        if name.is_empty() {
            return Err(missing("name"));
        }
        let start_urls: Vec<String> = entry
            .start_urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if start_urls.is_empty() {
            return Err(missing("start_urls"));
        }
        if entry.allow_patterns.is_empty() {
            return Err(missing("allow_patterns"));
        }

        if let Some(bad) = start_urls
            .iter()
            .find(|u| !(u.starts_with("http://") || u.starts_with("https://")))
        {
            return Err(ConfigError::InvalidValue {
                field: "start_urls",
                reason: format!("site `{name}`: `{bad}` is not an absolute http(s) URL"),
            });
        }
        if entry.max_per_site == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_per_site",
                reason: format!("site `{name}`: must be greater than 0"),
            });
        }

        let base_url = entry
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string);
        if let Some(base) = &base_url {
            let usable = Url::parse(base)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
                .unwrap_or(false);
            if !usable {
                return Err(ConfigError::InvalidValue {
                    field: "base_url",
                    reason: format!("site `{name}`: `{base}` is not an absolute http(s) URL"),
                });
            }
        }

        let policy = SitePolicy::new(&name, &entry.allow_patterns, &entry.deny_patterns)?;

        let selector = |value: &str| {
            compile_selector(value).map_err(|source| ConfigError::InvalidSelector {
                site: name.clone(),
                source,
            })
        };
        let optional = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(&selector)
                .transpose()
        };

        let link_selector = selector(
            entry
                .link_selector
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_LINK_SELECTOR),
        )?;
        let title_selector = optional(&entry.title_selector)?;
        let summary_selector = optional(&entry.summary_selector)?;
        let date_selector = optional(&entry.date_selector)?;

        Ok(Self {
            name,
            start_urls,
            link_selector,
            base_url,
            policy,
            keywords: entry
                .keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            title_selector,
            summary_selector,
            date_selector,
            date_attr: entry.date_attr.filter(|a| !a.trim().is_empty()),
            date_formats: entry.date_formats,
            max_per_site: entry.max_per_site,
            delay_ms: entry.delay_ms,
        })
    }
}

/// Format of a sites file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitesFormat {
    Yaml,
    Toml,
}

impl SitesFormat {
    /// Pick the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Load and validate a sites file
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read or parsed, or if any
/// entry is invalid. Loading stops at the first invalid entry.
pub fn load_sites(path: &Path) -> Result<Vec<SiteConfig>, ConfigError> {
    let display = path.display().to_string();

    let format = SitesFormat::from_path(path).ok_or_else(|| ConfigError::Syntax {
        path: display.clone(),
        reason: "unsupported extension, expected .yaml, .yml or .toml".to_string(),
    })?;

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;

    parse_sites(&content, format).map_err(|e| match e {
        ConfigError::Syntax { reason, .. } => ConfigError::Syntax {
            path: display,
            reason,
        },
        other => other,
    })
}

/// Parse and validate sites from a string
///
/// # Errors
///
/// See [`load_sites`]
pub fn parse_sites(content: &str, format: SitesFormat) -> Result<Vec<SiteConfig>, ConfigError> {
    let file: SitesFile = match format {
        SitesFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        SitesFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
    .map_err(|reason| ConfigError::Syntax {
        path: "<inline>".to_string(),
        reason,
    })?;

    file.sites
        .into_iter()
        .enumerate()
        .map(|(i, entry)| SiteConfig::from_entry(i + 1, entry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SiteEntry {
        SiteEntry {
            name: "Test site".to_string(),
            start_urls: vec!["https://site.ua/news".to_string()],
            allow_patterns: vec!["/news/".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_minimal_entry_compiles_with_defaults() {
        let site = SiteConfig::from_entry(1, entry()).unwrap();
        assert_eq!(site.name, "Test site");
        assert!(site.title_selector.is_none());
        assert!(site.policy.allows("https://site.ua/news/1"));
    }

    #[test]
    fn test_missing_allow_patterns_rejected() {
        let err = SiteConfig::from_entry(
            3,
            SiteEntry {
                allow_patterns: vec![],
                ..entry()
            },
        )
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::MissingField { index: 3, field: "allow_patterns", .. }
        ));
    }

    #[test]
    fn test_missing_name_and_urls() {
        let err = SiteConfig::from_entry(1, SiteEntry { name: " ".into(), ..entry() }).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "name", .. }));

        let err =
            SiteConfig::from_entry(1, SiteEntry { start_urls: vec![], ..entry() }).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { field: "start_urls", .. }));
    }

    #[test]
    fn test_invalid_selector_names_site() {
        let err = SiteConfig::from_entry(
            1,
            SiteEntry {
                title_selector: Some("h1[[".into()),
                ..entry()
            },
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidSelector { ref site, .. } if site == "Test site"));
    }

    #[test]
    fn test_relative_start_url_rejected() {
        let err = SiteConfig::from_entry(
            1,
            SiteEntry {
                start_urls: vec!["/news".into()],
                ..entry()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "start_urls", .. }));
    }

    #[test]
    fn test_base_url_must_be_absolute_http() {
        for bad in ["site.ua/news", "/news", "ftp://site.ua/", "http://"] {
            let err = SiteConfig::from_entry(
                1,
                SiteEntry {
                    base_url: Some(bad.into()),
                    ..entry()
                },
            )
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { field: "base_url", .. }),
                "{bad}"
            );
        }

        let site = SiteConfig::from_entry(
            1,
            SiteEntry {
                base_url: Some(" https://site.ua/ ".into()),
                ..entry()
            },
        )
        .unwrap();
        assert_eq!(site.base_url.as_deref(), Some("https://site.ua/"));

        let site = SiteConfig::from_entry(1, SiteEntry { base_url: Some("  ".into()), ..entry() })
            .unwrap();
        assert!(site.base_url.is_none());
    }

    #[test]
    fn test_parse_yaml_with_aliases() {
        let yaml = r#"
sources:
  - name: "Мінсоцполітики"
    list_urls: ["https://www.msp.gov.ua/press-center/news"]
    link_selector: "a[href*='/news/']"
    allow_patterns: ['/news/\d+']
    deny_patterns: ['/news/archive']
    max_per_source: 5
    keywords: ["пенсії"]
"#;
        let sites = parse_sites(yaml, SitesFormat::Yaml).unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].max_per_site, Some(5));
        assert_eq!(sites[0].start_urls.len(), 1);
        assert_eq!(sites[0].keywords, vec!["пенсії"]);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[[sites]]
name = "Site A"
start_urls = ["https://a.ua/news"]
allow_patterns = ["/news/"]
date_selector = ".date"
delay_ms = 0
"#;
        let sites = parse_sites(toml, SitesFormat::Toml).unwrap();
        assert_eq!(sites[0].name, "Site A");
        assert!(sites[0].date_selector.is_some());
        assert_eq!(sites[0].delay_ms, Some(0));
    }

    #[test]
    fn test_second_entry_error_reports_index() {
        let yaml = r#"
sites:
  - name: ok
    start_urls: ["https://a.ua/"]
    allow_patterns: ["."]
  - name: broken
    start_urls: ["https://b.ua/"]
"#;
        let err = parse_sites(yaml, SitesFormat::Yaml).unwrap_err();
        assert!(err.to_string().contains("#2"));
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SitesFormat::from_path(Path::new("s.YML")), Some(SitesFormat::Yaml));
        assert_eq!(SitesFormat::from_path(Path::new("s.toml")), Some(SitesFormat::Toml));
        assert_eq!(SitesFormat::from_path(Path::new("s.json")), None);
    }
}
