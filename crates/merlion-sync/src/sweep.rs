//! Summarization sweep over stored cases.
//!
//! Selects cases still missing a summary, summarizes them in small
//! concurrent batches, and writes back only non-null results. A failed
//! summarizer call leaves its case untouched for a later sweep.

use futures::future::join_all;
use merlion_ai::Summarizer;
use merlion_core::config::Config;
use merlion_store::DuckStore;
use tracing::{debug, info, warn};

use crate::fetch::SyncError;

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub attempted: u64,
    pub summarized: u64,
    pub passes: u32,
}

/// Sweep until no unsummarized cases remain, or until a full pass makes
/// no progress (every remaining case is failing, so another pass would
/// only spin).
pub async fn run_sweep(
    store: &DuckStore,
    summarizer: &Summarizer,
    config: &Config,
) -> Result<SweepReport, SyncError> {
    let mut report = SweepReport::default();

    loop {
        let cases = store.select_unsummarized_cases(config.sweep_select_limit)?;
        if cases.is_empty() {
            break;
        }
        report.passes += 1;
        info!(pass = report.passes, pending = cases.len(), "sweep pass");

        let mut pass_summarized = 0u64;
        for batch in cases.chunks(config.sweep_batch_size.max(1)) {
            let summaries =
                join_all(batch.iter().map(|case| summarizer.summarize(&case.case_text))).await;
            // The store connection is synchronous, so writes follow the
            // concurrent calls rather than interleaving with them.
            for (case, summary) in batch.iter().zip(summaries) {
                report.attempted += 1;
                match summary {
                    Some(summary) => {
                        store.update_case_summary(case.id, &summary)?;
                        report.summarized += 1;
                        pass_summarized += 1;
                        debug!(case_id = case.id, "summary written");
                    }
                    None => debug!(case_id = case.id, "left for a later sweep"),
                }
            }
        }

        if pass_summarized == 0 {
            warn!("sweep pass made no progress, stopping");
            break;
        }
    }

    info!(
        attempted = report.attempted,
        summarized = report.summarized,
        passes = report.passes,
        "sweep finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn empty_store_terminates_immediately() {
        let store = DuckStore::open().unwrap();
        let summarizer = Summarizer::new(
            "http://127.0.0.1:9",
            "test-key",
            "test-model",
            Duration::from_millis(100),
        )
        .unwrap();

        let report = run_sweep(&store, &summarizer, &Config::default())
            .await
            .unwrap();
        assert_eq!(report.attempted, 0);
        assert_eq!(report.summarized, 0);
        assert_eq!(report.passes, 0);
    }

    #[tokio::test]
    async fn unreachable_summarizer_stops_after_one_pass() {
        let store = DuckStore::open().unwrap();
        store
            .insert_case(&merlion_core::model::NewCase {
                case_name: "Tan v Lim".into(),
                case_number: None,
                date: None,
                case_text: "judgment text".into(),
                citation: Some("[2024] SGHC 1".into()),
                standard_court_name: Some("High Court".into()),
                jurisdiction: "SINGAPORE".into(),
            })
            .unwrap();

        // Port 9 (discard) refuses connections, so every call soft-fails.
        let summarizer = Summarizer::new(
            "http://127.0.0.1:9",
            "test-key",
            "test-model",
            Duration::from_millis(100),
        )
        .unwrap();

        let report = run_sweep(&store, &summarizer, &Config::default())
            .await
            .unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.attempted, 1);
        assert_eq!(report.summarized, 0);
        // The case is untouched, ready for a later sweep.
        assert_eq!(store.select_unsummarized_cases(10).unwrap().len(), 1);
    }
}
