//! DuckDB storage for the ingestion pipelines.
//!
//! One store holds the statute side (`documents`, `sections`), the case-law
//! side (`cases`, `scrape_urls`), and the `job_runs` ledger. Uniqueness
//! constraints in the schema are the authoritative duplicate guard under
//! concurrent runs; application-level duplicate checks are an optimisation
//! on top, never a replacement.

use std::path::Path;

use duckdb::{Connection, params};
use tracing::{debug, info};

use merlion_core::model::{Case, Document, JobStatus, NewCase, NewDocument, NewSection, UrlOutcome};

use crate::error::{StoreError, classify};

const SCHEMA: &str = "
    CREATE SEQUENCE IF NOT EXISTS seq_documents START 1;
    CREATE SEQUENCE IF NOT EXISTS seq_sections START 1;
    CREATE SEQUENCE IF NOT EXISTS seq_cases START 1;
    CREATE SEQUENCE IF NOT EXISTS seq_job_runs START 1;

    CREATE TABLE IF NOT EXISTS documents (
        id            BIGINT PRIMARY KEY DEFAULT nextval('seq_documents'),
        name          VARCHAR NOT NULL,
        description   VARCHAR NOT NULL DEFAULT '',
        jurisdiction  VARCHAR NOT NULL,
        source        VARCHAR NOT NULL,
        source_id     VARCHAR NOT NULL UNIQUE,
        parent_id     BIGINT
    );

    CREATE TABLE IF NOT EXISTS sections (
        id            BIGINT PRIMARY KEY DEFAULT nextval('seq_sections'),
        document_id   BIGINT NOT NULL,
        title         VARCHAR NOT NULL,
        content       VARCHAR NOT NULL,
        jurisdiction  VARCHAR NOT NULL,
        questions     VARCHAR,
        derived_pairs VARCHAR,
        additional    VARCHAR,
        UNIQUE (document_id, title)
    );

    CREATE TABLE IF NOT EXISTS cases (
        id                  BIGINT PRIMARY KEY DEFAULT nextval('seq_cases'),
        case_name           VARCHAR NOT NULL,
        case_number         VARCHAR,
        date                VARCHAR,
        case_text           VARCHAR NOT NULL,
        citation            VARCHAR UNIQUE,
        standard_court_name VARCHAR,
        jurisdiction        VARCHAR NOT NULL,
        summary             VARCHAR
    );

    CREATE TABLE IF NOT EXISTS scrape_urls (
        url             VARCHAR PRIMARY KEY,
        processed       BOOLEAN NOT NULL,
        case_id         BIGINT,
        status          VARCHAR NOT NULL,
        error_message   VARCHAR,
        processing_date TIMESTAMP NOT NULL DEFAULT now()
    );

    CREATE TABLE IF NOT EXISTS job_runs (
        id          BIGINT PRIMARY KEY DEFAULT nextval('seq_job_runs'),
        job_name    VARCHAR NOT NULL,
        status      VARCHAR NOT NULL,
        started_at  TIMESTAMP NOT NULL DEFAULT now(),
        finished_at TIMESTAMP,
        metrics     VARCHAR,
        error       VARCHAR
    );
";

pub struct DuckStore {
    conn: Connection,
}

impl DuckStore {
    /// Open an in-memory store with the schema applied.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    /// Open or create a file-backed store at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened store");
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    // ── Documents ──

    /// Look up a document by its stable external key.
    pub fn find_document_by_source_id(
        &self,
        source_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, jurisdiction, source, source_id, parent_id
             FROM documents WHERE source_id = ?",
        )?;
        optional(stmt.query_row(params![source_id], document_from_row))
    }

    /// Insert a new document, returning its assigned identity.
    ///
    /// Drafts without a name or jurisdiction are rejected before they
    /// touch the table. `parent_id` is the already-resolved identity of
    /// the authorising statute, not the raw `parent_source_id` from the
    /// draft.
    pub fn insert_document(
        &self,
        doc: &NewDocument,
        parent_id: Option<i64>,
    ) -> Result<i64, StoreError> {
        if doc.name.is_empty() || doc.jurisdiction.is_empty() {
            return Err(StoreError::Validation(format!(
                "document {} is missing a name or jurisdiction",
                doc.source_id
            )));
        }
        let id = self
            .conn
            .query_row(
                "INSERT INTO documents (name, description, jurisdiction, source, source_id, parent_id)
                 VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
                params![
                    doc.name,
                    doc.description,
                    doc.jurisdiction,
                    doc.source,
                    doc.source_id,
                    parent_id
                ],
                |row| row.get::<_, i64>(0),
            )
            .map_err(classify)?;
        debug!(id, source_id = %doc.source_id, "inserted document");
        Ok(id)
    }

    // ── Sections ──

    /// All section titles already stored for a document.
    pub fn list_section_titles(&self, document_id: i64) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM sections WHERE document_id = ?")?;
        let rows = stmt.query_map(params![document_id], |row| row.get::<_, String>(0))?;
        let mut titles = Vec::new();
        for title in rows {
            titles.push(title?);
        }
        Ok(titles)
    }

    /// Insert a batch of sections atomically.
    ///
    /// The whole batch rolls back on the first failure, so a caller retrying
    /// never has to reason about a half-written batch.
    pub fn insert_sections_batch(
        &self,
        document_id: i64,
        sections: &[NewSection],
    ) -> Result<usize, StoreError> {
        if sections.is_empty() {
            return Ok(0);
        }
        self.conn.execute_batch("BEGIN")?;
        let result = self.insert_sections_inner(document_id, sections);
        match result {
            Ok(count) => {
                self.conn.execute_batch("COMMIT")?;
                debug!(document_id, count, "inserted section batch");
                Ok(count)
            }
            Err(err) => {
                // Best-effort rollback; the original error is the one to report.
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(err)
            }
        }
    }

    fn insert_sections_inner(
        &self,
        document_id: i64,
        sections: &[NewSection],
    ) -> Result<usize, StoreError> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO sections
                 (document_id, title, content, jurisdiction, questions, derived_pairs, additional)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;
        for section in sections {
            stmt.execute(params![
                document_id,
                section.title,
                section.content,
                section.jurisdiction,
                section.questions,
                section.derived_pairs,
                section.additional
            ])
            .map_err(classify)?;
        }
        Ok(sections.len())
    }

    // ── Cases ──

    /// Identity of the case carrying this citation, if one exists.
    pub fn find_case_by_citation(&self, citation: &str) -> Result<Option<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM cases WHERE citation = ?")?;
        optional(stmt.query_row(params![citation], |row| row.get::<_, i64>(0)))
    }

    /// Insert a case, returning its assigned identity.
    pub fn insert_case(&self, case: &NewCase) -> Result<i64, StoreError> {
        let id = self
            .conn
            .query_row(
                "INSERT INTO cases
                     (case_name, case_number, date, case_text, citation,
                      standard_court_name, jurisdiction)
                 VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
                params![
                    case.case_name,
                    case.case_number,
                    case.date,
                    case.case_text,
                    case.citation,
                    case.standard_court_name,
                    case.jurisdiction
                ],
                |row| row.get::<_, i64>(0),
            )
            .map_err(classify)?;
        debug!(id, citation = ?case.citation, "inserted case");
        Ok(id)
    }

    /// Cases still awaiting a summary: non-empty text, classified court,
    /// no summary yet. Ordered by identity for stable sweep progress.
    pub fn select_unsummarized_cases(&self, limit: usize) -> Result<Vec<Case>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, case_name, case_number, date, case_text, citation,
                    standard_court_name, jurisdiction, summary
             FROM cases
             WHERE summary IS NULL
               AND case_text <> ''
               AND standard_court_name IS NOT NULL
             ORDER BY id
             LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], case_from_row)?;
        let mut cases = Vec::new();
        for case in rows {
            cases.push(case?);
        }
        Ok(cases)
    }

    pub fn update_case_summary(&self, case_id: i64, summary: &str) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE cases SET summary = ? WHERE id = ?",
            params![summary, case_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NoResults);
        }
        Ok(())
    }

    // ── URL ledger ──

    /// Whether a URL was already settled by an earlier run. Only definitive
    /// outcomes count; an errored URL stays eligible for refetch.
    pub fn is_url_processed(&self, url: &str) -> Result<bool, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT processed FROM scrape_urls WHERE url = ?")?;
        let processed = optional(stmt.query_row(params![url], |row| row.get::<_, bool>(0)))?;
        Ok(processed.unwrap_or(false))
    }

    /// Record the outcome of one URL attempt, replacing any earlier record.
    pub fn record_url_outcome(&self, url: &str, outcome: &UrlOutcome) -> Result<(), StoreError> {
        let case_id = match outcome {
            UrlOutcome::Success { case_id } => Some(*case_id),
            _ => None,
        };
        let error_message = match outcome {
            UrlOutcome::Success { .. } => None,
            UrlOutcome::Skipped { reason } => Some(reason.as_str()),
            UrlOutcome::Error { message } => Some(message.as_str()),
        };
        self.conn.execute(
            "INSERT INTO scrape_urls (url, processed, case_id, status, error_message)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (url) DO UPDATE
             SET processed = excluded.processed,
                 case_id = excluded.case_id,
                 status = excluded.status,
                 error_message = excluded.error_message,
                 processing_date = now()",
            params![
                url,
                outcome.is_definitive(),
                case_id,
                outcome.status(),
                error_message
            ],
        )?;
        Ok(())
    }

    // ── Job ledger ──

    /// Open a `started` row for a job run, returning its identity.
    pub fn start_job(&self, job_name: &str) -> Result<i64, StoreError> {
        let id = self.conn.query_row(
            "INSERT INTO job_runs (job_name, status) VALUES (?, ?) RETURNING id",
            params![job_name, JobStatus::Started.as_str()],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(id)
    }

    pub fn complete_job(&self, job_id: i64, metrics: &serde_json::Value) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE job_runs
             SET status = ?, finished_at = now(), metrics = ?
             WHERE id = ?",
            params![JobStatus::Completed.as_str(), metrics.to_string(), job_id],
        )?;
        Ok(())
    }

    /// Close a job as failed, still recording whatever metrics accrued
    /// before the failure.
    pub fn fail_job(
        &self,
        job_id: i64,
        metrics: &serde_json::Value,
        error: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE job_runs
             SET status = ?, finished_at = now(), metrics = ?, error = ?
             WHERE id = ?",
            params![JobStatus::Failed.as_str(), metrics.to_string(), error, job_id],
        )?;
        Ok(())
    }
}

fn optional<T>(res: Result<T, duckdb::Error>) -> Result<Option<T>, StoreError> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn document_from_row(row: &duckdb::Row<'_>) -> Result<Document, duckdb::Error> {
    Ok(Document {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        jurisdiction: row.get(3)?,
        source: row.get(4)?,
        source_id: row.get(5)?,
        parent_id: row.get(6)?,
    })
}

fn case_from_row(row: &duckdb::Row<'_>) -> Result<Case, duckdb::Error> {
    Ok(Case {
        id: row.get(0)?,
        case_name: row.get(1)?,
        case_number: row.get(2)?,
        date: row.get(3)?,
        case_text: row.get(4)?,
        citation: row.get(5)?,
        standard_court_name: row.get(6)?,
        jurisdiction: row.get(7)?,
        summary: row.get(8)?,
    })
}
