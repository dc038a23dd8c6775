//! Tests for configuration and sites file loading

use std::io::Write;
use std::path::Path;

use newsgate::config::{load_sites, Config, LogFormat};
use newsgate::utils::error::ConfigError;
use serial_test::serial;
use tempfile::NamedTempFile;

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_file_exists() {
    let config = Config::from_file(Path::new("config.toml")).expect("config.toml should parse");
    assert!(config.validate().is_ok());
    assert_eq!(config.collection.timezone, "Europe/Kyiv");
}

#[test]
fn test_bundled_sites_file_loads() {
    let sites = load_sites(Path::new("sites.yaml")).expect("sites.yaml should load");
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[1].delay_ms, Some(1500));
    assert!(sites[0].policy.allows("https://www.msp.gov.ua/news/25601.html"));
    assert!(!sites[0].policy.allows("https://www.msp.gov.ua/news/archive/1"));
}

#[test]
fn test_load_yaml_sites() {
    let file = temp_file(
        ".yaml",
        r#"
sites:
  - name: "Site A"
    start_urls: ["https://a.ua/news"]
    allow_patterns: ['/news/\d+']
    title_selector: "h1.title"
    date_selector: "time"
    date_attr: "datetime"
"#,
    );

    let sites = load_sites(file.path()).unwrap();
    assert_eq!(sites.len(), 1);
    assert!(sites[0].title_selector.is_some());
    assert_eq!(sites[0].date_attr.as_deref(), Some("datetime"));
}

#[test]
fn test_load_toml_sites() {
    let file = temp_file(
        ".toml",
        r#"
[[sources]]
name = "Site B"
list_urls = ["https://b.ua/"]
allow_patterns = ["/post/"]
max_per_source = 3
"#,
    );

    let sites = load_sites(file.path()).unwrap();
    assert_eq!(sites[0].name, "Site B");
    assert_eq!(sites[0].max_per_site, Some(3));
}

#[test]
fn test_invalid_regex_rejected_at_load() {
    let file = temp_file(
        ".yml",
        r#"
sites:
  - name: "Broken"
    start_urls: ["https://a.ua/"]
    allow_patterns: ["(unclosed"]
"#,
    );

    let err = load_sites(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidPattern { ref site, .. } if site == "Broken"));
}

#[test]
fn test_syntax_error_names_file() {
    let file = temp_file(".yaml", "sites: [ {name: ");
    let err = load_sites(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Syntax { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn test_unknown_extension_rejected() {
    let file = temp_file(".json", "{}");
    assert!(matches!(
        load_sites(file.path()),
        Err(ConfigError::Syntax { .. })
    ));
}

#[test]
fn test_missing_file() {
    let err = load_sites(Path::new("does/not/exist.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
#[serial]
fn test_env_overrides() {
    std::env::set_var("NEWSGATE_MAX_ITEMS", "7");
    std::env::set_var("NEWSGATE_TIMEZONE", "Europe/Warsaw");
    std::env::set_var("NEWSGATE_LOG_FORMAT", "json");
    std::env::set_var("NEWSGATE_RESPECT_ROBOTS", "false");

    let config = Config::from_env().unwrap();

    std::env::remove_var("NEWSGATE_MAX_ITEMS");
    std::env::remove_var("NEWSGATE_TIMEZONE");
    std::env::remove_var("NEWSGATE_LOG_FORMAT");
    std::env::remove_var("NEWSGATE_RESPECT_ROBOTS");

    assert_eq!(config.collection.max_items, 7);
    assert_eq!(config.collection.timezone, "Europe/Warsaw");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(!config.crawler.respect_robots);
}

#[test]
#[serial]
fn test_unparseable_env_keeps_default() {
    std::env::set_var("NEWSGATE_MAX_PER_SITE", "many");
    let config = Config::from_env().unwrap();
    std::env::remove_var("NEWSGATE_MAX_PER_SITE");

    assert_eq!(config.collection.max_per_site, 10);
}
