//! Statute sync: acts and subsidiary legislation.
//!
//! Acts need two fetches: the initial page carries metadata and the
//! lazy-load parameters, and the substantive text comes from the
//! `/Details/GetLazyLoadContent` fragment endpoint. Subsidiary
//! instruments carry everything on the first page.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use merlion_core::config::Config;
use merlion_core::model::DocumentKind;
use merlion_parse::meta::last_path_segment;
use merlion_parse::{extract_listing_paths, extract_sections, parse_act_page, parse_sl_page};
use merlion_store::DuckStore;
use tracing::{info, warn};
use url::Url;

use crate::fetch::{Fetcher, SyncError};
use crate::reconcile::{Outcome, reconcile};

const LAZY_LOAD_ENDPOINT: &str = "/Details/GetLazyLoadContent";
const BROWSE_PAGE_SIZE: usize = 500;

/// Per-run summary for a batch of statute paths.
#[derive(Debug)]
pub struct RunReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub sections_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct StatuteSync<'a> {
    store: &'a DuckStore,
    fetcher: &'a Fetcher,
    config: &'a Config,
}

impl<'a> StatuteSync<'a> {
    pub fn new(store: &'a DuckStore, fetcher: &'a Fetcher, config: &'a Config) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Sync one primary act by its site path, e.g. `/Act/ASA2007`.
    pub async fn sync_act(&self, path: &str) -> Result<Outcome, SyncError> {
        if !path.starts_with("/Act/") {
            return Err(SyncError::Document(format!(
                "act path must start with /Act/: {path:?}"
            )));
        }
        let initial_url = whole_doc_url(&self.config.statutes_base_url, path)?;
        let html = self.fetcher.get_text(&initial_url).await?;

        let page = parse_act_page(
            &html,
            &last_path_segment(path),
            &self.config.jurisdiction,
            &self.config.source_label,
        );
        for warning in &page.warnings {
            warn!(path, warning, "act page");
        }
        let lazy = page.lazy_load.ok_or_else(|| {
            SyncError::Document(format!("no lazy-load config found for {path}"))
        })?;

        let fragment_url = lazy_load_url(&self.config.statutes_base_url, &lazy)?;
        let fragment = self.fetcher.get_text(&fragment_url).await?;

        let parsed = extract_sections(&fragment, DocumentKind::Act, &self.config.jurisdiction);
        for warning in &parsed.warnings {
            warn!(path, warning, "act sections");
        }

        reconcile(
            self.store,
            &page.document,
            parsed.sections,
            self.config.section_batch_size,
        )
    }

    /// Sync one subsidiary instrument by its site path, e.g. `/SL/AA2004-R5`.
    pub async fn sync_subsidiary(&self, path: &str) -> Result<Outcome, SyncError> {
        if !path.starts_with("/SL/") {
            return Err(SyncError::Document(format!(
                "subsidiary path must start with /SL/: {path:?}"
            )));
        }
        let url = join_url(&self.config.statutes_base_url, path)?;
        let html = self.fetcher.get_text(&url).await?;

        let page = parse_sl_page(
            &html,
            &last_path_segment(path),
            &self.config.jurisdiction,
            &self.config.source_label,
        );
        for warning in &page.warnings {
            warn!(path, warning, "subsidiary page");
        }

        let parsed = extract_sections(&html, DocumentKind::Subsidiary, &self.config.jurisdiction);
        for warning in &parsed.warnings {
            warn!(path, warning, "subsidiary sections");
        }

        reconcile(
            self.store,
            &page.document,
            parsed.sections,
            self.config.section_batch_size,
        )
    }

    /// Sync a whole batch of paths sequentially, isolating failures so one
    /// bad document never aborts the run.
    pub async fn sync_batch(&self, kind: DocumentKind, paths: &[String]) -> RunReport {
        let started_at = Utc::now();
        let mut report = RunReport {
            succeeded: Vec::new(),
            failed: Vec::new(),
            sections_written: 0,
            started_at,
            finished_at: started_at,
        };

        let total = paths.len();
        for (index, path) in paths.iter().enumerate() {
            info!(path, index = index + 1, total, "syncing document");
            let result = match kind {
                DocumentKind::Act => self.sync_act(path).await,
                DocumentKind::Subsidiary => self.sync_subsidiary(path).await,
            };
            match result {
                Ok(outcome) => {
                    report.sections_written += outcome.sections_written;
                    report.succeeded.push(path.clone());
                }
                Err(err) => {
                    warn!(path, error = %err, "document sync failed");
                    report.failed.push((path.clone(), err.to_string()));
                }
            }
            if index + 1 < total {
                tokio::time::sleep(self.config.statute_delay).await;
            }
        }

        report.finished_at = Utc::now();
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            sections_written = report.sections_written,
            "statute batch finished"
        );
        for (path, error) in &report.failed {
            warn!(path, error, "failed path");
        }
        report
    }

    /// Walk the browse listing and collect every act path.
    pub async fn discover_act_paths(&self) -> Result<Vec<String>, SyncError> {
        self.discover("Act", "Title", "/Act/").await
    }

    /// Walk the browse listing and collect every subsidiary-legislation path.
    pub async fn discover_sl_paths(&self) -> Result<Vec<String>, SyncError> {
        self.discover("SL", "Number", "/SL/").await
    }

    async fn discover(
        &self,
        segment: &str,
        sort_by: &str,
        prefix: &str,
    ) -> Result<Vec<String>, SyncError> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();
        for index in 0.. {
            let url = browse_url(&self.config.statutes_base_url, segment, index, sort_by)?;
            let html = self.fetcher.get_text(&url).await?;
            let page_paths = extract_listing_paths(&html, prefix);
            let found = page_paths.len();
            for path in page_paths {
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
            info!(segment, index, found, total = paths.len(), "browse page");
            // A short page means the listing is exhausted.
            if found < BROWSE_PAGE_SIZE {
                break;
            }
            tokio::time::sleep(self.config.page_delay).await;
        }
        paths.sort();
        Ok(paths)
    }
}

/// Document URL with `WholeDoc=1` so the page exposes the full table of
/// contents in its lazy-load config.
fn whole_doc_url(base: &str, path: &str) -> Result<String, SyncError> {
    let mut url = Url::parse(base)?.join(path)?;
    url.query_pairs_mut().append_pair("WholeDoc", "1");
    Ok(url.to_string())
}

fn join_url(base: &str, path: &str) -> Result<String, SyncError> {
    Ok(Url::parse(base)?.join(path)?.to_string())
}

fn lazy_load_url(
    base: &str,
    lazy: &merlion_parse::LazyLoadConfig,
) -> Result<String, SyncError> {
    let mut url = Url::parse(base)?.join(LAZY_LOAD_ENDPOINT)?;
    url.query_pairs_mut()
        .append_pair("TocSysId", &lazy.toc_sys_id)
        .append_pair("SeriesId", &lazy.series_id);
    Ok(url.to_string())
}

fn browse_url(base: &str, segment: &str, index: u32, sort_by: &str) -> Result<String, SyncError> {
    let mut url = Url::parse(base)?.join(&format!("/Browse/{segment}/Current/All/{index}"))?;
    url.query_pairs_mut()
        .append_pair("PageSize", &BROWSE_PAGE_SIZE.to_string())
        .append_pair("SortBy", sort_by)
        .append_pair("SortOrder", "ASC");
    Ok(url.to_string())
}
