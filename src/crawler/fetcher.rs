//! HTTP page fetcher with rate limiting, retries and charset detection
//!
//! This module provides the single HTTP client a collection run uses:
//! - Fixed browser-like headers (user agent, accept-language)
//! - Rate limiting with governor
//! - Bounded retry with exponential backoff on 429/5xx
//! - Charset detection from the Content-Type header or `<meta charset>`,
//!   with a windows-1251 fallback for legacy Cyrillic sites

use crate::config::CrawlerConfig;
use crate::utils::error::FetchError;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use regex::bytes::Regex;
use reqwest::{header::HeaderMap, Client, Response};
use std::num::NonZeroU32;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::headers::{
    build_page_headers, with_referer, DEFAULT_ACCEPT_LANGUAGE, DEFAULT_USER_AGENT,
};

/// Bytes scanned for a `<meta charset>` declaration
const META_SNIFF_LEN: usize = 2048;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([A-Za-z0-9_:.\-]+)"#).unwrap()
});

/// HTTP fetcher owned by a collection run
pub struct PageFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Headers sent with every request
    headers: HeaderMap,

    /// User agent, also used for robots.txt group matching
    user_agent: String,

    /// Maximum number of retry attempts for failed requests
    max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    base_delay_ms: u64,
}

impl PageFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(requests_per_second, 2, Duration::from_secs(20))
    }

    /// Create a new fetcher with custom rate, retry count and timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            headers: build_page_headers(DEFAULT_USER_AGENT, DEFAULT_ACCEPT_LANGUAGE),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retries,
            base_delay_ms: 1000,
        })
    }

    /// Create a fetcher from the `[crawler]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, FetchError> {
        let fetcher = Self::with_config(
            config.requests_per_second,
            config.max_retries,
            config.request_timeout(),
        )?;

        Ok(fetcher
            .with_identity(&config.user_agent, &config.accept_language)
            .with_retry_delay(config.retry_base_delay_ms))
    }

    /// Replace the user agent and accept-language headers
    #[must_use]
    pub fn with_identity(mut self, user_agent: &str, accept_language: &str) -> Self {
        self.headers = build_page_headers(user_agent, accept_language);
        self.user_agent = user_agent.to_string();
        self
    }

    /// Set the base delay for exponential backoff
    #[must_use]
    pub fn with_retry_delay(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// User agent sent with requests
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Fetch a page as decoded text
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-retryable error statuses and
    /// `FetchError::MaxRetriesExceeded` once retries are exhausted
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_with_referer(url, None).await
    }

    /// Fetch a page, sending `referer` when given
    ///
    /// # Errors
    ///
    /// See [`PageFetcher::fetch`]
    pub async fn fetch_with_referer(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;
        self.fetch_with_retry(url, referer).await
    }

    async fn fetch_with_retry(&self, url: &str, referer: Option<&str>) -> Result<String, FetchError> {
        let full_url = absolute_url(url)?;
        let headers = with_referer(self.headers.clone(), referer);
        let mut last_status = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay_ms(self.base_delay_ms, attempt);
                debug!(url = %full_url, attempt, delay_ms = delay, "Retrying fetch");
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.client.get(&full_url).headers(headers.clone()).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return self.decode_response(response).await;
                    } else if Self::should_retry(status.as_u16()) {
                        last_status = Some(status.as_u16());
                        continue;
                    } else {
                        return Err(FetchError::Status(status.as_u16()));
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!(url = %full_url, attempt, "Request timed out");
                    if attempt == self.max_retries {
                        return Err(FetchError::Timeout);
                    }
                }
                Err(e) if e.is_builder() => {
                    return Err(FetchError::InvalidUrl(full_url));
                }
                Err(e) => {
                    debug!(url = %full_url, attempt, error = %e, "Request failed");
                    if attempt == self.max_retries {
                        return Err(FetchError::Http(e));
                    }
                }
            }
        }

        Err(FetchError::MaxRetriesExceeded { last_status })
    }

    /// Determine if a status code should trigger a retry
    ///
    /// Retry on 429, 500, 502, 503 and 504; every other error status is final.
    fn should_retry(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }

    async fn decode_response(&self, response: Response) -> Result<String, FetchError> {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;

        self.decode_bytes(&bytes, &content_type)
    }

    /// Decode bytes to a string with encoding detection
    ///
    /// Strategies, in order:
    /// 1. Charset declared in the Content-Type header
    /// 2. Charset declared by a `<meta>` tag near the top of the document
    /// 3. Strict UTF-8
    /// 4. windows-1251
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Decode` if no strategy yields clean text
    pub fn decode_bytes(&self, bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
        let declared = charset_from_content_type(content_type)
            .or_else(|| charset_from_meta(&bytes[..bytes.len().min(META_SNIFF_LEN)]));

        if let Some(encoding) = declared {
            let (cow, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                debug!(encoding = encoding.name(), "Declared charset produced replacement characters");
            }
            return Ok(cow.into_owned());
        }

        if let Some(text) = decode_strict(UTF_8, bytes) {
            return Ok(text);
        }

        decode_strict(WINDOWS_1251, bytes).ok_or_else(|| {
            FetchError::Decode("Failed to decode content with UTF-8 or windows-1251".to_string())
        })
    }
}

fn absolute_url(url: &str) -> Result<String, FetchError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(FetchError::InvalidUrl(url.to_string()))
    }
}

/// Delay before retry `attempt` (1-based), doubling from `base_ms`
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn charset_from_meta(head: &[u8]) -> Option<&'static Encoding> {
    META_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    let (cow, _, had_errors) = encoding.decode(bytes);
    (!had_errors).then(|| cow.into_owned())
}
