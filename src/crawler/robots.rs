//! robots.txt parsing and a per-run cache
//!
//! Rules are grouped by user-agent. For a given path the longest matching
//! rule wins and an `Allow` beats a `Disallow` of equal length. `*` matches
//! any run of characters and a trailing `$` anchors the rule at the end of
//! the path.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use super::fetcher::PageFetcher;
use super::url::origin_key;
use crate::utils::error::FetchError;

/// Largest Crawl-delay honoured, in seconds
pub const MAX_CRAWL_DELAY_SECS: f64 = 60.0;

/// Parsed robots.txt rules
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    /// Rules per user-agent token (lowercase)
    groups: HashMap<String, AgentRules>,

    /// Rules for `*`
    default_rules: AgentRules,

    /// Blanket denial (robots.txt answered 401/403)
    deny_all: bool,
}

#[derive(Debug, Clone, Default)]
struct AgentRules {
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RobotsTxt {
    /// Parse robots.txt content
    ///
    /// Consecutive `User-agent` lines share the group that follows them.
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();
        let mut agents: Vec<String> = Vec::new();
        let mut rules = AgentRules::default();
        let mut in_rules = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if in_rules {
                        robots.store(&agents, &rules);
                        agents.clear();
                        rules = AgentRules::default();
                        in_rules = false;
                    }
                    agents.push(value.to_lowercase());
                }
                "allow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        rules.allow.push(value.to_string());
                    }
                }
                "disallow" => {
                    in_rules = true;
                    if !value.is_empty() {
                        rules.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    in_rules = true;
                    rules.crawl_delay = value
                        .parse::<f64>()
                        .ok()
                        .filter(|d| d.is_finite() && *d >= 0.0)
                        .map(|d| d.min(MAX_CRAWL_DELAY_SECS));
                }
                _ => {}
            }
        }

        robots.store(&agents, &rules);
        robots
    }

    /// A robots.txt that forbids everything
    pub fn deny_all() -> Self {
        Self {
            deny_all: true,
            ..Self::default()
        }
    }

    fn store(&mut self, agents: &[String], rules: &AgentRules) {
        for agent in agents {
            if agent == "*" {
                self.default_rules = rules.clone();
            } else {
                self.groups.insert(agent.clone(), rules.clone());
            }
        }
    }

    fn rules_for(&self, user_agent: &str) -> &AgentRules {
        let agent = user_agent.to_lowercase();
        self.groups
            .get(&agent)
            .or_else(|| {
                self.groups
                    .iter()
                    .filter(|(token, _)| !token.is_empty() && agent.contains(token.as_str()))
                    .max_by_key(|(token, _)| token.len())
                    .map(|(_, rules)| rules)
            })
            .unwrap_or(&self.default_rules)
    }

    /// Check if a path (with optional query) is allowed for a user-agent
    pub fn is_allowed(&self, user_agent: &str, path: &str) -> bool {
        if self.deny_all {
            return false;
        }

        let rules = self.rules_for(user_agent);
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| rule_matches(p, path))
                .map(String::len)
                .max()
        };

        match (longest(&rules.allow), longest(&rules.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }

    /// Crawl delay requested for a user-agent
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        self.rules_for(user_agent)
            .crawl_delay
            .map(Duration::from_secs_f64)
    }
}

/// Match a robots.txt path rule with `*` and `$` support
fn rule_matches(rule: &str, path: &str) -> bool {
    let (rule, anchored) = match rule.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (rule, false),
    };

    let mut parts = rule.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let pieces: Vec<&str> = parts.collect();
    for (i, piece) in pieces.iter().enumerate() {
        let is_last = i + 1 == pieces.len();
        if is_last && anchored {
            return rest.ends_with(piece);
        }
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }

    !anchored || rest.is_empty()
}

/// robots.txt rules cached per origin for the duration of one run
#[derive(Debug, Default)]
pub struct RobotsCache {
    user_agent: String,
    entries: HashMap<String, RobotsTxt>,
}

impl RobotsCache {
    /// Create an empty cache evaluating rules for `user_agent`
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            entries: HashMap::new(),
        }
    }

    /// Check whether `url` may be fetched, loading robots.txt on first use
    ///
    /// A missing robots.txt or one that cannot be fetched allows everything;
    /// a 401 or 403 answer disallows the whole origin.
    pub async fn is_allowed(&mut self, fetcher: &PageFetcher, url: &str) -> bool {
        let Some(origin) = origin_key(url) else {
            return false;
        };

        if !self.entries.contains_key(&origin) {
            let robots = load(fetcher, &origin).await;
            self.entries.insert(origin.clone(), robots);
        }

        let path = match Url::parse(url) {
            Ok(parsed) => match parsed.query() {
                Some(query) => format!("{}?{query}", parsed.path()),
                None => parsed.path().to_string(),
            },
            Err(_) => return false,
        };

        self.entries
            .get(&origin)
            .map_or(true, |robots| robots.is_allowed(&self.user_agent, &path))
    }

    /// Crawl-delay declared for the origin of `url`, if already loaded
    pub fn crawl_delay(&self, url: &str) -> Option<Duration> {
        let origin = origin_key(url)?;
        self.entries.get(&origin)?.crawl_delay(&self.user_agent)
    }
}

async fn load(fetcher: &PageFetcher, origin: &str) -> RobotsTxt {
    let robots_url = format!("{origin}/robots.txt");

    match fetcher.fetch(&robots_url).await {
        Ok(content) => {
            debug!(url = %robots_url, "Loaded robots.txt");
            RobotsTxt::parse(&content)
        }
        Err(FetchError::Status(code @ (401 | 403))) => {
            warn!(url = %robots_url, status = code, "robots.txt forbidden, origin disallowed");
            RobotsTxt::deny_all()
        }
        Err(e) => {
            debug!(url = %robots_url, error = %e, "No usable robots.txt, allowing all");
            RobotsTxt::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /private/
Disallow: /admin/ # staff only
Allow: /public/
Crawl-delay: 2
            "#,
        );

        assert!(robots.is_allowed("newsgate", "/public/page"));
        assert!(!robots.is_allowed("newsgate", "/private/page"));
        assert!(!robots.is_allowed("newsgate", "/admin/"));
        assert!(robots.is_allowed("newsgate", "/news/1"));
        assert_eq!(robots.crawl_delay("newsgate"), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_crawl_delay_bounded() {
        let cap = Duration::from_secs_f64(MAX_CRAWL_DELAY_SECS);
        for (value, expected) in [
            ("inf", None),
            ("-inf", None),
            ("NaN", None),
            ("-1", None),
            ("soon", None),
            ("1e20", Some(cap)),
            ("86400", Some(cap)),
            ("0.5", Some(Duration::from_millis(500))),
        ] {
            let robots = RobotsTxt::parse(&format!("User-agent: *\nCrawl-delay: {value}\n"));
            assert_eq!(robots.crawl_delay("newsgate"), expected, "Crawl-delay: {value}");
        }
    }

    #[test]
    fn test_specific_agent_group() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /

User-agent: newsgate
User-agent: otherbot
Disallow: /drafts/
            "#,
        );

        assert!(!robots.is_allowed("BadBot", "/news/1"));
        assert!(robots.is_allowed("Mozilla/5.0 (compatible; newsgate/0.1)", "/news/1"));
        assert!(!robots.is_allowed("otherbot", "/drafts/x"));
    }

    #[test]
    fn test_longest_match_wins() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /news/
Allow: /news/public/
            "#,
        );

        assert!(!robots.is_allowed("bot", "/news/secret"));
        assert!(robots.is_allowed("bot", "/news/public/1"));
    }

    #[test]
    fn test_wildcards() {
        let robots = RobotsTxt::parse(
            r#"
User-agent: *
Disallow: /*?print=
Disallow: /*.pdf$
            "#,
        );

        assert!(!robots.is_allowed("bot", "/news/1?print=1"));
        assert!(!robots.is_allowed("bot", "/files/report.pdf"));
        assert!(robots.is_allowed("bot", "/files/report.pdf.html"));
        assert!(robots.is_allowed("bot", "/news/1"));
    }

    #[test]
    fn test_empty_and_deny_all() {
        assert!(RobotsTxt::parse("").is_allowed("bot", "/any"));
        assert!(!RobotsTxt::deny_all().is_allowed("bot", "/any"));
    }
}
