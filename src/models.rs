// Core data structures for the newsgate collector

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Normalized article produced by the collector
///
/// `url` is canonical and is the deduplication key both within a run and in
/// the moderation queue. `published_at` is always populated and carries the
/// display timezone's offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: String,
    pub summary: String,
    pub source_name: String,
    pub published_at: DateTime<FixedOffset>,
}

impl ArticleRecord {
    /// Host part of the article URL, if any
    pub fn host(&self) -> Option<String> {
        crate::utils::extract_domain(&self.url).ok()
    }
}

/// Write records as pretty-printed JSON
pub fn write_records_json(records: &[ArticleRecord], path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Atomic write using temp file
    let temp_path = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(records).map_err(std::io::Error::other)?;
    std::fs::write(&temp_path, content)?;
    std::fs::rename(temp_path, path)?;
    Ok(())
}

/// Per-site outcome of a collection run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteSummary {
    pub name: String,
    pub collected: usize,
    pub fetches: usize,
    pub links: usize,
}

/// Collection run statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectStats {
    pub sites_visited: usize,
    pub links_discovered: usize,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub skipped_seen: usize,
    pub skipped_policy: usize,
    pub skipped_robots: usize,
    pub skipped_keywords: usize,
    pub skipped_date_range: usize,
    pub collected: usize,
    pub deadline_hit: bool,
    pub duration_ms: u64,
    pub sites: Vec<SiteSummary>,
}

impl CollectStats {
    /// Failed fetches as a percentage of attempted fetches
    pub fn error_rate(&self) -> f64 {
        let attempted = self.pages_fetched + self.fetch_failures;
        if attempted == 0 {
            0.0
        } else {
            (self.fetch_failures as f64 / attempted as f64) * 100.0
        }
    }

    /// Total links dropped before extraction
    pub fn skipped(&self) -> usize {
        self.skipped_seen
            + self.skipped_policy
            + self.skipped_robots
            + self.skipped_keywords
            + self.skipped_date_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ArticleRecord {
        ArticleRecord {
            url: "https://www.msp.gov.ua/news/25601.html".to_string(),
            title: "Виплати допомоги".to_string(),
            summary: "Мінсоцполітики повідомляє".to_string(),
            source_name: "Мінсоцполітики".to_string(),
            published_at: DateTime::parse_from_rfc3339("2025-09-05T00:00:00+03:00").unwrap(),
        }
    }

    #[test]
    fn test_record_serde_keeps_offset() {
        let json = serde_json::to_string(&record()).unwrap();
        assert!(json.contains("2025-09-05T00:00:00+03:00"));

        let restored: ArticleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record());
    }

    #[test]
    fn test_record_host() {
        assert_eq!(record().host().as_deref(), Some("www.msp.gov.ua"));
    }

    #[test]
    fn test_write_records_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/records.json");

        write_records_json(&[record()], &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let restored: Vec<ArticleRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(restored.len(), 1);
    }

    #[test]
    fn test_stats_rates() {
        let stats = CollectStats {
            pages_fetched: 9,
            fetch_failures: 1,
            skipped_policy: 3,
            skipped_seen: 2,
            ..Default::default()
        };
        assert_eq!(stats.error_rate(), 10.0);
        assert_eq!(stats.skipped(), 5);
    }
}
