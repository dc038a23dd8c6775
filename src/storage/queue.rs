//! SQLite moderation queue
//!
//! Collected records land in a single `news` table with status `PENDING`
//! and move through review:
//!
//! ```text
//! PENDING ──approve/schedule──▶ APPROVED ──publish──▶ PUBLISHED
//!    │
//!    └──────reject──────▶ REJECTED
//! ```
//!
//! Timestamps are stored as UTC RFC 3339 text with second precision so that
//! string ordering in SQL matches chronological ordering.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::ArticleRecord;
use crate::parser::sanitize::clamp_summary;

/// Maximum rows returned by [`NewsQueue::search`]
pub const SEARCH_LIMIT: usize = 100;

const COLUMNS: &str = "id, url, title, summary, source, published_at, status, created_at, \
                       approved_by, scheduled_for, channel_message_id";

/// Review status of a queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueueStatus {
    Pending,
    Approved,
    Published,
    Rejected,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Published => "PUBLISHED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "PUBLISHED" => Ok(Self::Published),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(Error::other(format!("unknown queue status `{other}`"))),
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row of the moderation queue
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub status: QueueStatus,
    pub created_at: DateTime<Utc>,
    pub approved_by: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub channel_message_id: Option<i64>,
}

impl QueueItem {
    /// Publication time, or queue time when unknown
    pub fn effective_date(&self) -> DateTime<Utc> {
        self.published_at.unwrap_or(self.created_at)
    }
}

/// Queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub last_7_days: usize,
}

fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn from_db_time(value: Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<QueueItem> {
    let status: String = row.get(6)?;
    Ok(QueueItem {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        summary: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        source: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        published_at: from_db_time(row.get(5)?),
        status: status.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
        })?,
        created_at: from_db_time(row.get(7)?).unwrap_or_else(Utc::now),
        approved_by: row.get(8)?,
        scheduled_for: from_db_time(row.get(9)?),
        channel_message_id: row.get(10)?,
    })
}

/// Moderation queue backed by SQLite
///
/// The connection sits behind a `Mutex` so the queue can be shared between
/// tasks.
pub struct NewsQueue {
    conn: Mutex<Connection>,
}

impl NewsQueue {
    /// Open or create the queue database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let queue = Self {
            conn: Mutex::new(conn),
        };
        queue.create_schema()?;

        tracing::info!(path = %path.display(), "Moderation queue opened");
        Ok(queue)
    }

    /// Create an in-memory queue (for testing)
    pub fn in_memory() -> Result<Self> {
        let queue = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        queue.create_schema()?;
        Ok(queue)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::other("queue connection mutex poisoned"))
    }

    fn create_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT UNIQUE,
                title TEXT,
                summary TEXT,
                source TEXT,
                published_at TEXT,
                status TEXT,
                created_at TEXT,
                approved_by TEXT,
                scheduled_for TEXT,
                channel_message_id INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_news_status ON news(status);
            "#,
        )?;
        Ok(())
    }

    /// Queue a collected record as `PENDING`
    ///
    /// Returns the new row id, or `None` if the record has no URL or title
    /// or its URL is already queued.
    pub fn insert_record(&self, record: &ArticleRecord) -> Result<Option<i64>> {
        self.insert_record_at(record, Utc::now())
    }

    /// [`insert_record`](Self::insert_record) with an explicit queue time
    pub fn insert_record_at(
        &self,
        record: &ArticleRecord,
        created_at: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let url = record.url.trim();
        let title = record.title.trim();
        if url.is_empty() || title.is_empty() {
            return Ok(None);
        }

        let conn = self.conn()?;
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO news (url, title, summary, source, published_at, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                url,
                title,
                clamp_summary(&record.summary),
                record.source_name,
                to_db_time(&record.published_at.with_timezone(&Utc)),
                QueueStatus::Pending.as_str(),
                to_db_time(&created_at),
            ],
        )?;

        Ok((inserted > 0).then(|| conn.last_insert_rowid()))
    }

    /// Fetch one item by id
    pub fn get(&self, id: i64) -> Result<Option<QueueItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM news WHERE id = ?1"),
                params![id],
                map_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Next item to review: newest first, lowest id on ties
    pub fn next_pending(&self) -> Result<Option<QueueItem>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {COLUMNS} FROM news WHERE status = 'PENDING'
                     ORDER BY COALESCE(published_at, created_at) DESC, id ASC LIMIT 1"
                ),
                [],
                map_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Approve a pending item for immediate publication
    ///
    /// Returns false if the item does not exist or is not pending.
    pub fn approve(&self, id: i64, reviewer: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE news SET status = 'APPROVED', approved_by = ?2
             WHERE id = ?1 AND status = 'PENDING'",
            params![id, reviewer],
        )?;
        Ok(changed > 0)
    }

    /// Approve a pending item for publication at `at`
    pub fn schedule(&self, id: i64, at: DateTime<Utc>, reviewer: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE news SET status = 'APPROVED', approved_by = ?2, scheduled_for = ?3
             WHERE id = ?1 AND status = 'PENDING'",
            params![id, reviewer, to_db_time(&at)],
        )?;
        Ok(changed > 0)
    }

    pub fn reject(&self, id: i64, reviewer: &str) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE news SET status = 'REJECTED', approved_by = ?2
             WHERE id = ?1 AND status = 'PENDING'",
            params![id, reviewer],
        )?;
        Ok(changed > 0)
    }

    /// Leave a pending item in the queue but move it behind fresher items
    pub fn skip(&self, id: i64) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE news SET created_at = ?2 WHERE id = ?1 AND status = 'PENDING'",
            params![id, to_db_time(&Utc::now())],
        )?;
        Ok(changed > 0)
    }

    /// Record the channel message of a published item
    pub fn mark_published(&self, id: i64, message_id: i64) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE news SET status = 'PUBLISHED', channel_message_id = ?2
             WHERE id = ?1 AND status = 'APPROVED'",
            params![id, message_id],
        )?;
        Ok(changed > 0)
    }

    /// Approved items whose `scheduled_for` is still ahead of `now`
    pub fn scheduled_items(&self, now: DateTime<Utc>) -> Result<Vec<QueueItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM news
             WHERE status = 'APPROVED' AND scheduled_for IS NOT NULL AND scheduled_for > ?1
             ORDER BY scheduled_for ASC"
        ))?;
        let items = stmt
            .query_map(params![to_db_time(&now)], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Items dated in `[from, to)`, newest first
    pub fn search(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<QueueItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM news
             WHERE COALESCE(published_at, created_at) >= ?1
               AND COALESCE(published_at, created_at) < ?2
             ORDER BY COALESCE(published_at, created_at) DESC, id DESC
             LIMIT ?3"
        ))?;
        let items = stmt
            .query_map(
                params![to_db_time(&from), to_db_time(&to), SEARCH_LIMIT as i64],
                map_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Totals, with the 7-day window starting at local midnight six days ago
    pub fn stats<Tz: TimeZone>(&self, now: DateTime<Tz>) -> Result<QueueStats> {
        let week_start = week_start(&now);
        let conn = self.conn()?;

        let count = |sql: &str, args: &[&dyn rusqlite::ToSql]| -> rusqlite::Result<usize> {
            conn.query_row(sql, args, |row| row.get::<_, i64>(0))
                .map(|n| n as usize)
        };

        Ok(QueueStats {
            total: count("SELECT COUNT(*) FROM news", &[])?,
            pending: count("SELECT COUNT(*) FROM news WHERE status = 'PENDING'", &[])?,
            last_7_days: count(
                "SELECT COUNT(*) FROM news WHERE COALESCE(published_at, created_at) >= ?1",
                &[&to_db_time(&week_start)],
            )?,
        })
    }
}

fn week_start<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let day = now.date_naive() - ChronoDuration::days(6);
    let midnight = day.and_time(NaiveTime::MIN);
    now.timezone()
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}
