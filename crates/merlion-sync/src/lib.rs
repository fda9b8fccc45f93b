//! Sync pipelines: statute scraping, case-law ingestion, and the
//! summarization sweep.

pub mod caselaw;
pub mod fetch;
pub mod reconcile;
pub mod statutes;
pub mod sweep;

pub use caselaw::{CaselawReport, CaselawSync};
pub use fetch::{Fetcher, SyncError};
pub use reconcile::{Outcome, reconcile};
pub use statutes::{RunReport, StatuteSync};
pub use sweep::{SweepReport, run_sweep};
