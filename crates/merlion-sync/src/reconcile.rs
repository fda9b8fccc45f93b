//! Reconciling parsed documents and sections against the store.
//!
//! The pipeline is append-only: an existing document's fields are never
//! overwritten, and within a document the section title is the sole
//! de-duplication key. Partial progress is an accepted, resumable state —
//! titles already written are skipped on the next run.

use merlion_core::model::{NewDocument, NewSection};
use merlion_store::{DuckStore, StoreError};
use tracing::{info, warn};

use crate::fetch::SyncError;

/// What one reconcile pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub document_id: i64,
    pub sections_written: usize,
    /// Duplicates of already-stored titles plus candidates dropped for
    /// missing required fields.
    pub sections_skipped: usize,
}

/// Resolve the document to an identity and append its new sections.
pub fn reconcile(
    store: &DuckStore,
    document: &NewDocument,
    sections: Vec<NewSection>,
    batch_size: usize,
) -> Result<Outcome, SyncError> {
    let document_id = resolve_document(store, document)?;

    let existing: std::collections::HashSet<String> =
        store.list_section_titles(document_id)?.into_iter().collect();

    let total = sections.len();
    let mut dropped = 0usize;
    let mut duplicates = 0usize;
    let mut accepted = Vec::new();
    for section in sections {
        if section.title.is_empty() || section.content.is_empty() || section.jurisdiction.is_empty()
        {
            warn!(title = %section.title, "dropping section with missing required fields");
            dropped += 1;
            continue;
        }
        if existing.contains(&section.title) {
            duplicates += 1;
            continue;
        }
        accepted.push(section);
    }

    // Duplicate titles are expected on a rerun; a parse where every
    // candidate lacks required fields is not.
    if total > 0 && dropped == total {
        return Err(SyncError::Document(format!(
            "every candidate section for {} was dropped",
            document.source_id
        )));
    }
    let skipped = dropped + duplicates;

    let mut written = 0usize;
    for batch in accepted.chunks(batch_size.max(1)) {
        match store.insert_sections_batch(document_id, batch) {
            Ok(count) => written += count,
            Err(err) => {
                // Stop here; committed batches stand and the rest is
                // picked up by the next run's title diff.
                warn!(document_id, error = %err, "section batch failed, stopping");
                break;
            }
        }
    }

    info!(
        document_id,
        source_id = %document.source_id,
        written,
        skipped,
        "reconciled document"
    );
    Ok(Outcome {
        document_id,
        sections_written: written,
        sections_skipped: skipped,
    })
}

/// Adopt the existing document identity for this `source_id`, or insert a
/// validated draft. A constraint violation on insert means a concurrent
/// run won the race, so the existing row is adopted instead.
fn resolve_document(store: &DuckStore, document: &NewDocument) -> Result<i64, SyncError> {
    if let Some(existing) = store.find_document_by_source_id(&document.source_id)? {
        return Ok(existing.id);
    }

    if document.name.is_empty() || document.jurisdiction.is_empty() {
        return Err(SyncError::Document(format!(
            "document {} is missing a name or jurisdiction",
            document.source_id
        )));
    }

    let parent_id = match &document.parent_source_id {
        Some(parent_source_id) => {
            let parent = store.find_document_by_source_id(parent_source_id)?;
            if parent.is_none() {
                warn!(
                    source_id = %document.source_id,
                    parent_source_id = %parent_source_id,
                    "parent document not found, inserting without parent"
                );
            }
            parent.map(|p| p.id)
        }
        None => None,
    };

    match store.insert_document(document, parent_id) {
        Ok(id) => Ok(id),
        Err(StoreError::Constraint(_)) => store
            .find_document_by_source_id(&document.source_id)?
            .map(|d| d.id)
            .ok_or_else(|| {
                SyncError::Document(format!(
                    "document {} vanished after duplicate insert",
                    document.source_id
                ))
            }),
        Err(err) => Err(err.into()),
    }
}
