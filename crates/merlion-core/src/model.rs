//! Record types shared across the ingestion pipelines.
//!
//! Every entity carries explicit `Option` fields instead of the
//! missing-key-versus-null ambiguity of ad-hoc maps. Persisted rows
//! (`Document`, `Case`) carry the store-assigned identity; `New*` drafts
//! are what the parsers and sync drivers produce before insertion.

use serde::{Deserialize, Serialize};

/// Which family of legal instrument a document belongs to.
///
/// Primary acts compose section titles as `Section N ...`; subsidiary
/// instruments use `Rule N ...` and may additionally carry schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Act,
    Subsidiary,
}

impl DocumentKind {
    /// Title prefix for a numbered provision of this kind.
    pub fn provision_label(&self) -> &'static str {
        match self {
            Self::Act => "Section",
            Self::Subsidiary => "Rule",
        }
    }
}

/// A persisted statute or subsidiary-legislation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub jurisdiction: String,
    pub source: String,
    /// Stable external key, e.g. the act code `ASA2007`. Unique.
    pub source_id: String,
    /// Identity of the authorising statute, for subsidiary instruments.
    pub parent_id: Option<i64>,
}

/// A document draft produced by scraping, before it has an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub description: String,
    pub jurisdiction: String,
    pub source: String,
    pub source_id: String,
    /// `source_id` of the authorising statute, resolved to an identity at
    /// reconciliation time. Left unset when the parent is unknown.
    pub parent_source_id: Option<String>,
}

/// One titled provision or schedule extracted from a document.
///
/// Within one document the title is the de-duplication key; the owning
/// document identity is assigned at insertion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSection {
    pub title: String,
    pub content: String,
    pub jurisdiction: String,
    pub questions: Option<String>,
    pub derived_pairs: Option<String>,
    /// Free-form auxiliary JSON (source element class, header id, ...).
    pub additional: Option<String>,
}

/// A persisted case-law record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    pub case_name: String,
    pub case_number: Option<String>,
    pub date: Option<String>,
    pub case_text: String,
    pub citation: Option<String>,
    /// Canonical court name; `None` means not a binding-precedent court.
    pub standard_court_name: Option<String>,
    pub jurisdiction: String,
    /// Filled later by the summarization sweep.
    pub summary: Option<String>,
}

/// A case draft accepted by the case-law sync, before insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCase {
    pub case_name: String,
    pub case_number: Option<String>,
    pub date: Option<String>,
    pub case_text: String,
    pub citation: Option<String>,
    pub standard_court_name: Option<String>,
    pub jurisdiction: String,
}

/// Outcome recorded against an attempted case URL.
///
/// `Success` and `Skipped` are definitive (the URL is never refetched);
/// `Error` leaves the URL eligible for a later run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Case inserted with the given identity.
    Success { case_id: i64 },
    /// Expected re-crawl overlap: citation already present, or empty text.
    Skipped { reason: String },
    /// Fetch or insert failure.
    Error { message: String },
}

impl UrlOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Skipped { .. } => "skipped",
            Self::Error { .. } => "error",
        }
    }

    /// Whether this outcome settles the URL for good.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}

/// Lifecycle states of a job-run ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Started,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_labels() {
        assert_eq!(DocumentKind::Act.provision_label(), "Section");
        assert_eq!(DocumentKind::Subsidiary.provision_label(), "Rule");
    }

    #[test]
    fn url_outcome_status_strings() {
        assert_eq!(UrlOutcome::Success { case_id: 1 }.status(), "success");
        assert_eq!(
            UrlOutcome::Skipped {
                reason: "duplicate citation".into()
            }
            .status(),
            "skipped"
        );
        assert_eq!(
            UrlOutcome::Error {
                message: "timeout".into()
            }
            .status(),
            "error"
        );
    }

    #[test]
    fn only_errors_are_retryable() {
        assert!(UrlOutcome::Success { case_id: 7 }.is_definitive());
        assert!(
            UrlOutcome::Skipped {
                reason: "empty text".into()
            }
            .is_definitive()
        );
        assert!(
            !UrlOutcome::Error {
                message: "HTTP 503".into()
            }
            .is_definitive()
        );
    }

    #[test]
    fn new_document_json_roundtrip() {
        let doc = NewDocument {
            name: "Arbitration (Singapore Convention) Act 2020".into(),
            description: "An Act to give effect to the Singapore Convention.".into(),
            jurisdiction: "SINGAPORE".into(),
            source: "Singapore Statutes Online (sso.agc.gov.sg)".into(),
            source_id: "ASCA2020".into(),
            parent_source_id: None,
        };
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: NewDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.source_id, "ASCA2020");
        assert!(parsed.parent_source_id.is_none());
    }
}
