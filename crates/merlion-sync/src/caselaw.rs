//! Case-law sync against the aggregation API.
//!
//! Pagination starts at page 1 (newest cases first) and stops on the
//! first of: an empty page, a failed index fetch, three consecutive
//! pages with no unprocessed URLs, or the configured page cap. Every
//! attempted case URL gets exactly one outcome record, and only
//! definitive outcomes (success or skip) settle a URL for good.

use merlion_ai::standardize_court_name;
use merlion_core::config::Config;
use merlion_core::model::{NewCase, UrlOutcome};
use merlion_store::{DuckStore, StoreError};
use tracing::{info, warn};
use url::Url;

use crate::fetch::{Fetcher, SyncError};

const JOB_NAME: &str = "singapore_caselaw_scraper";
const CAUGHT_UP_PAGES: u32 = 3;

#[derive(Debug, Default, Clone, Copy)]
pub struct CaselawReport {
    pub new_cases_found: u64,
    pub pages_processed: u32,
}

impl CaselawReport {
    fn metrics(&self) -> serde_json::Value {
        serde_json::json!({
            "new_cases_found": self.new_cases_found,
            "pages_processed": self.pages_processed,
        })
    }
}

pub struct CaselawSync<'a> {
    store: &'a DuckStore,
    fetcher: &'a Fetcher,
    config: &'a Config,
}

impl<'a> CaselawSync<'a> {
    pub fn new(store: &'a DuckStore, fetcher: &'a Fetcher, config: &'a Config) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Run one sync pass under the job ledger. Ledger bookkeeping is
    /// best-effort and never blocks the sync itself.
    pub async fn run(&self) -> Result<CaselawReport, SyncError> {
        let job_id = match self.store.start_job(JOB_NAME) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "failed to start job tracking, continuing without");
                None
            }
        };

        let mut report = CaselawReport::default();
        match self.run_pages(&mut report).await {
            Ok(()) => {
                if let Some(id) = job_id
                    && let Err(err) = self.store.complete_job(id, &report.metrics())
                {
                    warn!(error = %err, "failed to record job completion");
                }
                info!(
                    new_cases_found = report.new_cases_found,
                    pages_processed = report.pages_processed,
                    "case-law sync finished"
                );
                Ok(report)
            }
            Err(err) => {
                if let Some(id) = job_id
                    && let Err(ledger_err) =
                        self.store.fail_job(id, &report.metrics(), &err.to_string())
                {
                    warn!(error = %ledger_err, "failed to record job failure");
                }
                Err(err)
            }
        }
    }

    async fn run_pages(&self, report: &mut CaselawReport) -> Result<(), SyncError> {
        let mut caught_up_streak = 0u32;

        for page in 1..=self.config.max_pages {
            let index_url = sitemap_url(&self.config.case_api_url, page);
            let urls: Vec<String> = match self.fetcher.get_json(&index_url).await {
                Ok(value) => match serde_json::from_value(value) {
                    Ok(urls) => urls,
                    Err(err) => {
                        warn!(page, error = %err, "unexpected index payload, stopping");
                        break;
                    }
                },
                Err(err) => {
                    warn!(page, error = %err, "index page fetch failed, stopping");
                    break;
                }
            };
            if urls.is_empty() {
                info!(page, "empty index page, stopping pagination");
                break;
            }
            report.pages_processed += 1;

            let mut to_process = Vec::new();
            for url in urls.into_iter().take(self.config.max_entries_per_page) {
                if !self.store.is_url_processed(&url)? {
                    to_process.push(url);
                }
            }
            info!(page, pending = to_process.len(), "index page");

            if to_process.is_empty() {
                caught_up_streak += 1;
                if caught_up_streak >= CAUGHT_UP_PAGES {
                    info!("no new cases on {CAUGHT_UP_PAGES} consecutive pages, caught up");
                    break;
                }
                tokio::time::sleep(self.config.page_delay).await;
                continue;
            }
            caught_up_streak = 0;

            for url in &to_process {
                let outcome = self.process_url(url).await?;
                self.store.record_url_outcome(url, &outcome)?;
                match &outcome {
                    UrlOutcome::Success { case_id } => {
                        report.new_cases_found += 1;
                        info!(url, case_id, "inserted case");
                    }
                    UrlOutcome::Skipped { reason } => info!(url, reason, "skipped case"),
                    UrlOutcome::Error { message } => warn!(url, message, "case attempt failed"),
                }
            }

            if page < self.config.max_pages {
                tokio::time::sleep(self.config.page_delay).await;
            }
        }
        Ok(())
    }

    /// Attempt one case URL. Store lookups propagate; everything remote
    /// folds into the returned outcome.
    async fn process_url(&self, case_path: &str) -> Result<UrlOutcome, StoreError> {
        let first_url = match scrape_case_url(
            &self.config.case_api_url,
            &self.config.case_site_url,
            case_path,
            false,
        ) {
            Ok(url) => url,
            Err(err) => {
                return Ok(UrlOutcome::Error {
                    message: err.to_string(),
                });
            }
        };

        let mut data = match self.fetcher.get_json(&first_url).await {
            Ok(data) => data,
            Err(err) => {
                return Ok(UrlOutcome::Error {
                    message: err.to_string(),
                });
            }
        };

        // Older judgments come back blank on the default fetch mode.
        if case_text_of(&data).is_empty()
            && let Ok(retry_url) = scrape_case_url(
                &self.config.case_api_url,
                &self.config.case_site_url,
                case_path,
                true,
            )
            && let Ok(retried) = self.fetcher.get_json(&retry_url).await
        {
            data = retried;
        }

        let draft = match case_draft(&data, &self.config.jurisdiction) {
            Ok(draft) => draft,
            Err(message) => return Ok(UrlOutcome::Error { message }),
        };
        accept_case(self.store, &draft)
    }
}

/// Acceptance gate between a built draft and the store: citation dedup is
/// a silent skip (expected re-crawl overlap), empty text is a skip, and
/// only then is the case inserted.
fn accept_case(store: &DuckStore, draft: &NewCase) -> Result<UrlOutcome, StoreError> {
    if let Some(citation) = &draft.citation
        && store.find_case_by_citation(citation)?.is_some()
    {
        return Ok(UrlOutcome::Skipped {
            reason: "duplicate citation".to_string(),
        });
    }

    if draft.case_text.is_empty() {
        return Ok(UrlOutcome::Skipped {
            reason: "empty case text".to_string(),
        });
    }

    match store.insert_case(draft) {
        Ok(case_id) => Ok(UrlOutcome::Success { case_id }),
        // A concurrent run inserted the same citation between the
        // pre-check and the insert.
        Err(StoreError::Constraint(_)) => Ok(UrlOutcome::Skipped {
            reason: "duplicate citation".to_string(),
        }),
        Err(err) => Ok(UrlOutcome::Error {
            message: err.to_string(),
        }),
    }
}

fn sitemap_url(api_base: &str, page: u32) -> String {
    format!(
        "{}/sitemap/cases?index={page}",
        api_base.trim_end_matches('/')
    )
}

fn scrape_case_url(
    api_base: &str,
    site_base: &str,
    case_path: &str,
    is_old: bool,
) -> Result<String, SyncError> {
    let mut url = Url::parse(&format!(
        "{}/scrape/cases",
        api_base.trim_end_matches('/')
    ))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("url", &format!("{site_base}{case_path}"));
        if is_old {
            pairs.append_pair("isOld", "true");
        }
    }
    Ok(url.to_string())
}

fn case_text_of(data: &serde_json::Value) -> &str {
    data.get("case_text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
}

fn string_field(data: &serde_json::Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Build an insertable case draft from an API payload.
fn case_draft(data: &serde_json::Value, jurisdiction: &str) -> Result<NewCase, String> {
    let case_name = string_field(data, "case_name").ok_or("payload has no case_name")?;
    let standard_court_name = data
        .get("court_name")
        .and_then(|v| v.as_str())
        .and_then(standardize_court_name)
        .map(str::to_string);
    Ok(NewCase {
        case_name,
        case_number: string_field(data, "case_no"),
        date: string_field(data, "date"),
        case_text: case_text_of(data).to_string(),
        citation: string_field(data, "citation"),
        standard_court_name,
        jurisdiction: jurisdiction.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitemap_url_shape() {
        assert_eq!(
            sitemap_url("https://example.dev/api/", 3),
            "https://example.dev/api/sitemap/cases?index=3"
        );
    }

    #[test]
    fn scrape_url_percent_encodes_target() {
        let url = scrape_case_url(
            "https://example.dev/api",
            "https://www.elitigation.sg",
            "/gd/s/2024_SGHC_1",
            false,
        )
        .unwrap();
        assert_eq!(
            url,
            "https://example.dev/api/scrape/cases?url=https%3A%2F%2Fwww.elitigation.sg%2Fgd%2Fs%2F2024_SGHC_1"
        );
    }

    #[test]
    fn scrape_url_retry_mode_appends_is_old() {
        let url = scrape_case_url(
            "https://example.dev/api",
            "https://www.elitigation.sg",
            "/gd/s/2001_SGCA_9",
            true,
        )
        .unwrap();
        assert!(url.ends_with("&isOld=true"));
    }

    #[test]
    fn draft_from_full_payload() {
        let data = serde_json::json!({
            "case_name": "Tan v Lim",
            "case_no": "Suit 12 of 2024",
            "date": "2024-03-01",
            "case_text": "  The plaintiff claims...  ",
            "citation": "[2024] SGHC 41",
            "court_name": "High Court General Division",
        });
        let draft = case_draft(&data, "SINGAPORE").unwrap();
        assert_eq!(draft.case_name, "Tan v Lim");
        assert_eq!(draft.case_text, "The plaintiff claims...");
        assert_eq!(draft.citation.as_deref(), Some("[2024] SGHC 41"));
        assert_eq!(
            draft.standard_court_name.as_deref(),
            Some("High Court (General Division)")
        );
        assert_eq!(draft.jurisdiction, "SINGAPORE");
    }

    #[test]
    fn draft_requires_case_name() {
        let data = serde_json::json!({ "case_text": "text" });
        assert!(case_draft(&data, "SINGAPORE").is_err());
    }

    #[test]
    fn unrecognized_court_yields_null_classification() {
        let data = serde_json::json!({
            "case_name": "PP v Tan",
            "case_text": "text",
            "court_name": "Subordinate Courts",
        });
        let draft = case_draft(&data, "SINGAPORE").unwrap();
        assert!(draft.standard_court_name.is_none());
    }

    fn draft(citation: Option<&str>, text: &str) -> NewCase {
        NewCase {
            case_name: "Tan v Lim".into(),
            case_number: None,
            date: None,
            case_text: text.into(),
            citation: citation.map(str::to_string),
            standard_court_name: Some("High Court".into()),
            jurisdiction: "SINGAPORE".into(),
        }
    }

    #[test]
    fn new_case_is_accepted() {
        let store = DuckStore::open().unwrap();
        let outcome = accept_case(&store, &draft(Some("[2024] SGCA 1"), "text")).unwrap();
        assert!(matches!(outcome, UrlOutcome::Success { .. }));
    }

    #[test]
    fn duplicate_citation_skips_but_still_settles_the_url() {
        let store = DuckStore::open().unwrap();
        accept_case(&store, &draft(Some("[2024] SGCA 1"), "text")).unwrap();

        let outcome = accept_case(&store, &draft(Some("[2024] SGCA 1"), "other text")).unwrap();
        assert_eq!(
            outcome,
            UrlOutcome::Skipped {
                reason: "duplicate citation".into()
            }
        );

        // The skip is definitive: one URL record, marked processed.
        let url = "https://www.elitigation.sg/gd/s/2024_SGCA_1";
        store.record_url_outcome(url, &outcome).unwrap();
        assert!(store.is_url_processed(url).unwrap());
    }

    #[test]
    fn empty_text_after_retry_is_a_skip() {
        let store = DuckStore::open().unwrap();
        let outcome = accept_case(&store, &draft(Some("[2024] SGCA 2"), "")).unwrap();
        assert_eq!(
            outcome,
            UrlOutcome::Skipped {
                reason: "empty case text".into()
            }
        );
        assert!(
            store
                .find_case_by_citation("[2024] SGCA 2")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn blank_case_text_detection() {
        assert!(case_text_of(&serde_json::json!({})).is_empty());
        assert!(case_text_of(&serde_json::json!({"case_text": "   "})).is_empty());
        assert_eq!(
            case_text_of(&serde_json::json!({"case_text": " x "})),
            "x"
        );
    }
}
