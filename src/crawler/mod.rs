//! Site collection with politeness and bounded work
//!
//! This module implements the collection run: for each configured site it
//! discovers article links on the listing pages, filters them through the
//! site policy and robots.txt, fetches and extracts each article and emits
//! normalized [`ArticleRecord`]s. Fetches are sequential; a run is bounded
//! by a global item cap, a per-site cap, a per-site fetch ceiling and a
//! wall-clock deadline.

pub mod fetcher;
pub mod headers;
pub mod list;
pub mod policy;
pub mod robots;
pub mod url;

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::{CollectionConfig, Config, SiteConfig, DEFAULT_TITLE_PLACEHOLDER};
use crate::models::{ArticleRecord, CollectStats, SiteSummary};
use crate::parser::date::{parse_timezone, DEFAULT_TIMEZONE};
use crate::parser::html::{ArticleExtractor, Page};
use crate::parser::sanitize::contains_any_keyword;
use crate::utils::error::{CrawlerError, ParseError};
use crate::utils::truncate_for_log;

pub use fetcher::PageFetcher;
pub use list::LinkDiscovery;
pub use policy::{PolicyDecision, SitePolicy};
pub use robots::{RobotsCache, RobotsTxt};

/// Per-run collection limits and filters
#[derive(Debug, Clone)]
pub struct CollectOptions {
    /// Global cap on emitted records
    pub max_items: usize,

    /// Per-site cap, unless a site overrides it
    pub max_per_site: usize,

    /// Inclusive lower bound on `published_at`
    pub date_from: Option<DateTime<Utc>>,

    /// Exclusive upper bound on `published_at`
    pub date_to: Option<DateTime<Utc>>,

    /// Display timezone for `published_at`
    pub timezone: Tz,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_items: 20,
            max_per_site: 10,
            date_from: None,
            date_to: None,
            timezone: chrono_tz::Europe::Kyiv,
        }
    }
}

impl CollectOptions {
    /// Build options from the `[collection]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `ParseError::UnknownTimezone` for an invalid timezone name
    pub fn from_config(config: &CollectionConfig) -> Result<Self, ParseError> {
        let timezone = if config.timezone.trim().is_empty() {
            parse_timezone(DEFAULT_TIMEZONE)?
        } else {
            parse_timezone(&config.timezone)?
        };

        Ok(Self {
            max_items: config.max_items,
            max_per_site: config.max_per_site,
            date_from: None,
            date_to: None,
            timezone,
        })
    }

    /// Per-site cap for a site with an optional override
    ///
    /// A site may lower the run's per-site cap but never raise it.
    pub fn site_cap(&self, site_override: Option<usize>) -> usize {
        site_override.map_or(self.max_per_site, |n| n.min(self.max_per_site))
    }

    /// Check a publication instant against the date range
    pub fn in_range<T: chrono::TimeZone>(&self, published: &DateTime<T>) -> bool {
        let published = published.with_timezone(&Utc);
        self.date_from.map_or(true, |from| published >= from)
            && self.date_to.map_or(true, |to| published < to)
    }
}

/// Result of a collection run
#[derive(Debug, Clone, Default)]
pub struct CollectOutcome {
    pub records: Vec<ArticleRecord>,
    pub stats: CollectStats,
}

/// Work accounting for one run
///
/// Only the global counter and the seen-URL set carry over between sites.
#[derive(Debug)]
pub struct CrawlBudget {
    max_items: usize,
    max_fetches_per_site: usize,
    site_cap: usize,
    /// Records emitted in this run
    pub total: usize,
    /// Records emitted for the current site
    pub site_collected: usize,
    /// Fetches made for the current site
    pub site_fetches: usize,
    seen: HashSet<String>,
}

impl CrawlBudget {
    pub fn new(max_items: usize, max_fetches_per_site: usize) -> Self {
        Self {
            max_items,
            max_fetches_per_site,
            site_cap: 0,
            total: 0,
            site_collected: 0,
            site_fetches: 0,
            seen: HashSet::new(),
        }
    }

    /// Reset per-site counters for the next site
    pub fn start_site(&mut self, cap: usize) {
        self.site_cap = cap;
        self.site_collected = 0;
        self.site_fetches = 0;
    }

    pub fn global_exhausted(&self) -> bool {
        self.total >= self.max_items
    }

    /// Either site cap or fetch ceiling reached
    pub fn site_exhausted(&self) -> bool {
        self.site_collected >= self.site_cap || self.site_fetches >= self.max_fetches_per_site
    }

    pub fn is_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Record a URL as visited; false if it already was
    pub fn mark_seen(&mut self, url: &str) -> bool {
        self.seen.insert(url.to_string())
    }

    pub fn record_fetch(&mut self) {
        self.site_fetches += 1;
    }

    pub fn record_emit(&mut self) {
        self.total += 1;
        self.site_collected += 1;
    }
}

enum PageOutcome {
    Record(ArticleRecord),
    NoKeyword,
    OutOfRange,
}

/// Collection orchestrator
pub struct Collector {
    fetcher: PageFetcher,
    delay: Duration,
    jitter: Duration,
    max_fetches_per_site: usize,
    deadline: Duration,
    respect_robots: bool,
    title_placeholder: String,
}

impl Collector {
    /// Create a collector with default politeness settings
    #[must_use]
    pub fn new(fetcher: PageFetcher) -> Self {
        Self {
            fetcher,
            delay: Duration::from_millis(700),
            jitter: Duration::from_millis(300),
            max_fetches_per_site: 50,
            deadline: Duration::from_secs(600),
            respect_robots: true,
            title_placeholder: DEFAULT_TITLE_PLACEHOLDER.to_string(),
        }
    }

    /// Create a collector from configuration
    ///
    /// # Errors
    ///
    /// Returns `CrawlerError::Fetch` if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self, CrawlerError> {
        let crawler = &config.crawler;
        Ok(Self::new(PageFetcher::from_config(crawler)?)
            .with_delay(
                Duration::from_millis(crawler.delay_ms),
                Duration::from_millis(crawler.jitter_ms),
            )
            .with_fetch_ceiling(crawler.max_fetches_per_site)
            .with_deadline(crawler.run_deadline())
            .with_robots(crawler.respect_robots)
            .with_title_placeholder(&config.collection.title_placeholder))
    }

    /// Set the polite base delay and the jitter bound
    #[must_use]
    pub fn with_delay(mut self, delay: Duration, jitter: Duration) -> Self {
        self.delay = delay;
        self.jitter = jitter;
        self
    }

    /// Set the per-site fetch ceiling
    #[must_use]
    pub fn with_fetch_ceiling(mut self, max_fetches_per_site: usize) -> Self {
        self.max_fetches_per_site = max_fetches_per_site.max(1);
        self
    }

    /// Set the wall-clock deadline for a run
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Enable or disable robots.txt checks
    #[must_use]
    pub fn with_robots(mut self, respect_robots: bool) -> Self {
        self.respect_robots = respect_robots;
        self
    }

    /// Set the placeholder for untitled articles
    #[must_use]
    pub fn with_title_placeholder(mut self, placeholder: &str) -> Self {
        self.title_placeholder = placeholder.to_string();
        self
    }

    /// Run one collection over `sites` in order
    ///
    /// Never fails: per-site and per-link problems are logged and skipped.
    pub async fn collect(&self, sites: &[SiteConfig], options: &CollectOptions) -> CollectOutcome {
        let started = Instant::now();
        let extractor =
            ArticleExtractor::new(options.timezone).with_title_placeholder(&self.title_placeholder);
        let mut robots = RobotsCache::new(self.fetcher.user_agent());
        let mut budget = CrawlBudget::new(options.max_items, self.max_fetches_per_site);
        let mut records = Vec::new();
        let mut stats = CollectStats::default();

        info!(
            sites = sites.len(),
            max_items = options.max_items,
            max_per_site = options.max_per_site,
            "Starting collection run"
        );

        'sites: for site in sites {
            if budget.global_exhausted() {
                break;
            }
            if started.elapsed() >= self.deadline {
                stats.deadline_hit = true;
                break;
            }

            budget.start_site(options.site_cap(site.max_per_site));
            stats.sites_visited += 1;
            let mut summary = SiteSummary {
                name: site.name.clone(),
                ..Default::default()
            };

            info!(site = %site.name, start_urls = site.start_urls.len(), "Collecting site");

            'urls: for start_url in &site.start_urls {
                if budget.site_exhausted() || budget.global_exhausted() {
                    break;
                }
                if started.elapsed() >= self.deadline {
                    stats.deadline_hit = true;
                    break;
                }

                self.polite_pause(&budget, site, None, started).await;
                if started.elapsed() >= self.deadline {
                    stats.deadline_hit = true;
                    break;
                }
                budget.record_fetch();
                let links = LinkDiscovery::new(&self.fetcher)
                    .discover(start_url, &site.link_selector, site.base_url.as_deref())
                    .await;
                summary.links += links.len();
                stats.links_discovered += links.len();

                for link in links {
                    if budget.global_exhausted() || budget.site_exhausted() {
                        break 'urls;
                    }
                    if started.elapsed() >= self.deadline {
                        stats.deadline_hit = true;
                        break 'urls;
                    }

                    if budget.is_seen(&link) {
                        stats.skipped_seen += 1;
                        continue;
                    }

                    match site.policy.evaluate(&link) {
                        PolicyDecision::Allowed => {}
                        decision => {
                            debug!(url = %link, ?decision, "Link rejected by site policy");
                            stats.skipped_policy += 1;
                            continue;
                        }
                    }

                    if self.respect_robots && !robots.is_allowed(&self.fetcher, &link).await {
                        info!(url = %link, "Link disallowed by robots.txt");
                        stats.skipped_robots += 1;
                        continue;
                    }

                    budget.mark_seen(&link);
                    let floor = if self.respect_robots {
                        robots.crawl_delay(&link)
                    } else {
                        None
                    };
                    self.polite_pause(&budget, site, floor, started).await;
                    if started.elapsed() >= self.deadline {
                        stats.deadline_hit = true;
                        break 'urls;
                    }
                    budget.record_fetch();

                    let html = match self.fetcher.fetch_with_referer(&link, Some(start_url)).await {
                        Ok(html) => html,
                        Err(e) => {
                            warn!(
                                url = %link,
                                error = %e,
                                recoverable = e.is_recoverable(),
                                "Article fetch failed, skipping"
                            );
                            stats.fetch_failures += 1;
                            continue;
                        }
                    };
                    stats.pages_fetched += 1;

                    match self.process_page(&extractor, site, &link, &html, options) {
                        PageOutcome::Record(record) => {
                            debug!(
                                url = %record.url,
                                host = ?record.host(),
                                title = %truncate_for_log(&record.title, 80),
                                "Collected article"
                            );
                            records.push(record);
                            budget.record_emit();
                            stats.collected += 1;
                            summary.collected += 1;
                        }
                        PageOutcome::NoKeyword => {
                            debug!(url = %link, "No keyword match");
                            stats.skipped_keywords += 1;
                        }
                        PageOutcome::OutOfRange => {
                            debug!(url = %link, "Published outside date range");
                            stats.skipped_date_range += 1;
                        }
                    }
                }
            }

            summary.fetches = budget.site_fetches;
            info!(
                site = %site.name,
                collected = summary.collected,
                fetches = summary.fetches,
                links = summary.links,
                "Finished site"
            );
            stats.sites.push(summary);

            if stats.deadline_hit {
                warn!(
                    error = %CrawlerError::DeadlineExceeded(self.deadline),
                    "Stopping collection run"
                );
                break 'sites;
            }
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            collected = stats.collected,
            fetched = stats.pages_fetched,
            failures = stats.fetch_failures,
            skipped = stats.skipped(),
            duration_ms = stats.duration_ms,
            "Collection run complete"
        );

        CollectOutcome { records, stats }
    }

    fn process_page(
        &self,
        extractor: &ArticleExtractor,
        site: &SiteConfig,
        url: &str,
        html: &str,
        options: &CollectOptions,
    ) -> PageOutcome {
        let page = Page::parse(html, url);

        if !contains_any_keyword(page.text(), &site.keywords) {
            return PageOutcome::NoKeyword;
        }

        let article = extractor.extract_page(&page, site);
        if !options.in_range(&article.published_at) {
            return PageOutcome::OutOfRange;
        }

        PageOutcome::Record(ArticleRecord {
            url: url.to_string(),
            title: article.title,
            summary: article.summary,
            source_name: site.name.clone(),
            published_at: article.published_at,
        })
    }

    /// Sleep before every fetch after the first one of a site
    ///
    /// `floor` is a robots.txt Crawl-delay the pause never goes below. The
    /// pause never runs past the run deadline.
    async fn polite_pause(
        &self,
        budget: &CrawlBudget,
        site: &SiteConfig,
        floor: Option<Duration>,
        started: Instant,
    ) {
        if budget.site_fetches == 0 {
            return;
        }

        let remaining = self.deadline.saturating_sub(started.elapsed());
        let pause = self
            .pause_for(site)
            .max(floor.unwrap_or_default())
            .min(remaining);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    fn pause_for(&self, site: &SiteConfig) -> Duration {
        let base = site.delay_ms.map_or(self.delay, Duration::from_millis);
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            base
        } else {
            base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        }
    }
}
