use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A record failed pre-insert validation and was rejected.
    #[error("invalid record: {0}")]
    Validation(String),

    /// A uniqueness constraint fired. Under concurrent runs this is the
    /// authoritative duplicate signal, not a bug.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("no results for query")]
    NoResults,

    #[error("duckdb error: {0}")]
    DuckDb(#[from] duckdb::Error),
}

/// Fold a DuckDB error into [`StoreError::Constraint`] when it reports a
/// uniqueness or other constraint violation, [`StoreError::DuckDb`] otherwise.
pub(crate) fn classify(err: duckdb::Error) -> StoreError {
    let msg = err.to_string();
    if msg.contains("Constraint Error") || msg.contains("constraint") {
        StoreError::Constraint(msg)
    } else {
        StoreError::DuckDb(err)
    }
}
