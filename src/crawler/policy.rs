//! Per-site URL allow/deny policy
//!
//! Deny rules take precedence over allow rules. A link is eligible only if
//! no deny pattern matches and at least one allow pattern matches. Patterns
//! are regular expressions searched anywhere in the canonical URL.

use regex::Regex;

use crate::utils::error::ConfigError;

/// Outcome of evaluating a URL against a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Matched an allow rule and no deny rule
    Allowed,
    /// Matched the given deny rule
    Denied(String),
    /// Matched no allow rule
    NotAllowed,
}

/// Compiled allow/deny rules for one site
#[derive(Debug, Clone, Default)]
pub struct SitePolicy {
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl SitePolicy {
    /// Compile a site's patterns
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPattern` naming the site and the first
    /// pattern that fails to compile.
    pub fn new<S: AsRef<str>>(site: &str, allow: &[S], deny: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            allow: compile_all(site, allow)?,
            deny: compile_all(site, deny)?,
        })
    }

    /// Check whether a canonical URL may be crawled
    pub fn allows(&self, url: &str) -> bool {
        self.evaluate(url) == PolicyDecision::Allowed
    }

    /// Evaluate a URL, reporting which rule decided
    pub fn evaluate(&self, url: &str) -> PolicyDecision {
        if let Some(rule) = self.deny.iter().find(|re| re.is_match(url)) {
            return PolicyDecision::Denied(rule.as_str().to_string());
        }

        if self.allow.iter().any(|re| re.is_match(url)) {
            PolicyDecision::Allowed
        } else {
            PolicyDecision::NotAllowed
        }
    }
}

fn compile_all<S: AsRef<str>>(site: &str, patterns: &[S]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref()).map_err(|e| ConfigError::InvalidPattern {
                site: site.to_string(),
                pattern: p.as_ref().to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}
