//! Pipeline configuration, constructed once at process start.
//!
//! Replaces ambient globals: every component receives `&Config` (or the
//! slice of it that it needs) from the caller.

use std::time::Duration;

/// Bounded retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once. Useful in tests.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

/// Shared settings for all pipelines in one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Fixed jurisdiction constant written on every record.
    pub jurisdiction: String,
    /// Provenance label written on every document.
    pub source_label: String,
    /// Statute site base URL.
    pub statutes_base_url: String,
    /// Case-law aggregation API base URL.
    pub case_api_url: String,
    /// Site the case API scrapes; prefixed to relative case URLs.
    pub case_site_url: String,
    /// Upper bound on case-index pages per run.
    pub max_pages: u32,
    /// Cap on case URLs taken from each index page.
    pub max_entries_per_page: usize,
    /// Delay between case-index pages.
    pub page_delay: Duration,
    /// Delay between statute fetches.
    pub statute_delay: Duration,
    /// Sections written per insert batch.
    pub section_batch_size: usize,
    /// Rows pulled per summarization selection.
    pub sweep_select_limit: usize,
    /// Concurrent summarize calls per sweep batch.
    pub sweep_batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jurisdiction: "SINGAPORE".to_string(),
            source_label: "Singapore Statutes Online (sso.agc.gov.sg)".to_string(),
            statutes_base_url: "https://sso.agc.gov.sg".to_string(),
            case_api_url: "https://votum-scraper-singapore.tejasw.workers.dev/api".to_string(),
            case_site_url: "https://www.elitigation.sg".to_string(),
            max_pages: 10,
            max_entries_per_page: 10,
            page_delay: Duration::from_secs(1),
            statute_delay: Duration::from_millis(500),
            section_batch_size: 100,
            sweep_select_limit: 100,
            sweep_batch_size: 5,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_constants() {
        let cfg = Config::default();
        assert_eq!(cfg.jurisdiction, "SINGAPORE");
        assert_eq!(cfg.max_pages, 10);
        assert_eq!(cfg.section_batch_size, 100);
        assert_eq!(cfg.sweep_batch_size, 5);
        assert_eq!(cfg.retry.max_attempts, 5);
    }

    #[test]
    fn retry_none_is_single_attempt() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.backoff, Duration::ZERO);
    }
}
