use anyhow::{bail, Context, Result};

use chrono::{NaiveTime, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;

use newsgate::config::Config;
use newsgate::parser::date::{local_midnight, parse_day_range, parse_timezone};
use newsgate::scheduler::{default_slot, delay_until, next_slot, parse_slot};
use newsgate::storage::{NewsQueue, QueueItem};

/// Items listed in full by `search`
const SEARCH_SHOWN: usize = 10;

/// Reviewer decision on a queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Decision {
    /// Approve for immediate publication
    Approve,
    /// Approve for the next publication slot
    Schedule,
    Reject,
    /// Keep pending, review later
    Skip,
}

fn open_queue(config: &Config) -> Result<(NewsQueue, Tz)> {
    let tz = parse_timezone(&config.collection.timezone).context("Invalid timezone")?;
    let queue = NewsQueue::open(&config.storage.db_path).context("Failed to open queue")?;
    Ok((queue, tz))
}

/// Plain-text review card
pub fn render_item(item: &QueueItem, tz: Tz) -> String {
    let mut parts = vec![item.title.clone()];
    if !item.summary.is_empty() {
        parts.push(item.summary.clone());
    }

    let when = item
        .effective_date()
        .with_timezone(&tz)
        .format("%Y-%m-%d %H:%M")
        .to_string();
    let meta: Vec<&str> = [item.source.as_str(), when.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    parts.push(meta.join(" • "));
    parts.push(item.url.clone());

    parts.join("\n\n")
}

pub async fn review(config: Config) -> Result<()> {
    let (queue, tz) = open_queue(&config)?;

    match queue.next_pending()? {
        Some(item) => {
            println!("#{} [{}]", item.id, item.status);
            println!("{}", render_item(&item, tz));
        }
        None => println!("Queue is empty"),
    }
    Ok(())
}

pub async fn decide(
    config: Config,
    id: i64,
    decision: Decision,
    reviewer: String,
    at: Option<String>,
) -> Result<()> {
    let (queue, tz) = open_queue(&config)?;

    let changed = match decision {
        Decision::Approve => queue.approve(id, &reviewer)?,
        Decision::Reject => queue.reject(id, &reviewer)?,
        Decision::Skip => queue.skip(id)?,
        Decision::Schedule => {
            let slot: NaiveTime = match at.as_deref() {
                Some(value) => parse_slot(value)
                    .with_context(|| format!("Invalid slot `{value}`, expected HH:MM"))?,
                None => default_slot(),
            };
            let now = Utc::now();
            let target = next_slot(now, slot, tz);
            let changed = queue.schedule(id, target, &reviewer)?;
            if changed {
                let wait = delay_until(now, target);
                println!(
                    "Scheduled for {} (in {}h {}m)",
                    target.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
                    wait.as_secs() / 3600,
                    (wait.as_secs() % 3600) / 60
                );
            }
            changed
        }
    };

    if !changed {
        bail!("Item #{id} does not exist or is not pending");
    }

    tracing::info!(id, ?decision, reviewer = %reviewer, "Decision recorded");
    println!("#{id}: {decision:?}");

    if let Some(next) = queue.next_pending()? {
        println!("\nNext pending: #{} {}", next.id, next.title);
    }
    Ok(())
}

pub async fn search(config: Config, range: Option<String>) -> Result<()> {
    let (queue, tz) = open_queue(&config)?;
    let today = Utc::now().with_timezone(&tz).date_naive();

    let (start, end) = parse_day_range(range.as_deref().unwrap_or(""), today)
        .context("Expected YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD")?;
    let from = local_midnight(start, tz).context("Invalid range start")?;
    let to = end
        .succ_opt()
        .and_then(|next| local_midnight(next, tz))
        .context("Invalid range end")?;

    let items = queue.search(from, to)?;
    if items.is_empty() {
        println!("Nothing found for {start}..{end}");
        return Ok(());
    }

    for item in items.iter().take(SEARCH_SHOWN) {
        println!(
            "• #{} {} ({})\n  {}",
            item.id,
            item.title,
            item.effective_date().with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            item.url
        );
    }
    if items.len() > SEARCH_SHOWN {
        println!("…and {} more", items.len() - SEARCH_SHOWN);
    }
    Ok(())
}

pub async fn stats(config: Config) -> Result<()> {
    let (queue, tz) = open_queue(&config)?;
    let stats = queue.stats(Utc::now().with_timezone(&tz))?;

    println!("Queue Stats");
    println!("===========");
    println!("Total: {}", stats.total);
    println!("Pending: {}", stats.pending);
    println!("Last 7 days: {}", stats.last_7_days);
    Ok(())
}
