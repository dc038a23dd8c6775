use anyhow::{Context, Result};
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use newsgate::config::{load_sites, Config};
use newsgate::crawler::{CollectOptions, Collector};
use newsgate::models::write_records_json;
use newsgate::parser::date::local_midnight;
use newsgate::storage::NewsQueue;

/// Options of the `collect` command that override configuration
#[derive(Debug, Default)]
pub struct CollectArgs {
    pub sites: Option<PathBuf>,
    pub max_items: Option<usize>,
    pub max_per_site: Option<usize>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

fn day_start(value: &str, tz: Tz) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date `{value}`, expected YYYY-MM-DD"))?;
    local_midnight(date, tz).with_context(|| format!("No local midnight on {date}"))
}

pub async fn collect(config: Config, args: CollectArgs) -> Result<()> {
    let sites_path = args
        .sites
        .clone()
        .unwrap_or_else(|| config.collection.sites_path.clone());
    let sites = load_sites(&sites_path)
        .with_context(|| format!("Failed to load sites from {}", sites_path.display()))?;

    let mut options =
        CollectOptions::from_config(&config.collection).context("Invalid collection config")?;
    if let Some(n) = args.max_items {
        options.max_items = n;
    }
    if let Some(n) = args.max_per_site {
        options.max_per_site = n;
    }
    options.date_from = args
        .from
        .as_deref()
        .map(|d| day_start(d, options.timezone))
        .transpose()?;
    options.date_to = args
        .to
        .as_deref()
        .map(|d| day_start(d, options.timezone))
        .transpose()?;

    println!("Collecting from {} site(s)", sites.len());
    println!("========================");

    let collector = Collector::from_config(&config).context("Failed to create collector")?;
    let outcome = collector.collect(&sites, &options).await;

    if let Some(output) = &args.output {
        write_records_json(&outcome.records, output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Records written to {}", output.display());
    }

    let (mut added, mut duplicates) = (0usize, 0usize);
    if !args.dry_run {
        let queue = NewsQueue::open(&config.storage.db_path).context("Failed to open queue")?;
        for record in &outcome.records {
            match queue.insert_record(record)? {
                Some(_) => added += 1,
                None => duplicates += 1,
            }
        }
    }

    let stats = &outcome.stats;
    println!("\nCollection Summary");
    println!("==================");
    for site in &stats.sites {
        println!(
            "  {:<40} collected {:>3}  fetches {:>3}  links {:>4}",
            site.name, site.collected, site.fetches, site.links
        );
    }
    println!("Collected: {}", stats.collected);
    println!("Pages fetched: {}", stats.pages_fetched);
    println!(
        "Fetch failures: {} ({:.1}%)",
        stats.fetch_failures,
        stats.error_rate()
    );
    println!(
        "Skipped: {} (seen {}, policy {}, robots {}, keywords {}, date {})",
        stats.skipped(),
        stats.skipped_seen,
        stats.skipped_policy,
        stats.skipped_robots,
        stats.skipped_keywords,
        stats.skipped_date_range
    );
    if stats.deadline_hit {
        println!("Run deadline reached before all sites were visited");
    }
    if args.dry_run {
        println!("Dry run: queue not updated");
    } else {
        println!("Queued: {added} new, {duplicates} already known");
    }
    println!("Duration: {:.1}s", stats.duration_ms as f64 / 1000.0);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_start_uses_local_midnight() {
        let tz: Tz = "Europe/Kyiv".parse().unwrap();
        let dt = day_start("2025-09-01", tz).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-08-31T21:00:00+00:00");
        assert!(day_start("01.09.2025", tz).is_err());
    }
}
