//! DuckDB persistence for statute documents, sections, case law, the
//! attempted-URL ledger, and job-run bookkeeping.

pub mod duck;
pub mod error;

pub use duck::DuckStore;
pub use error::StoreError;
