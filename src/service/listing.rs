use thiserror::Error;

use crate::document::{Document, DocumentError};
use crate::storage::{Storage, StorageError};
use crate::types::context::CallContext;
use crate::types::conversation::ConversationSummary;

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Why one document was left out of a listing or a search.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("unreadable: {0}")]
    Unreadable(#[source] StorageError),
    #[error("malformed: {0}")]
    Malformed(#[source] DocumentError),
}

/// Per-document result of a scan. Only interruption aborts a scan; every
/// other failure turns into `Skipped` so one bad file cannot hide the rest.
#[derive(Debug)]
pub enum DocumentOutcome<T> {
    Ok(T),
    Skipped { path: String, reason: SkipReason },
}

impl<T> DocumentOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            DocumentOutcome::Ok(value) => Some(value),
            DocumentOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DocumentOutcome::Skipped { .. })
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> DocumentOutcome<U>) -> DocumentOutcome<U> {
        match self {
            DocumentOutcome::Ok(value) => f(value),
            DocumentOutcome::Skipped { path, reason } => DocumentOutcome::Skipped { path, reason },
        }
    }

    pub(crate) fn log_skip(&self, op: &'static str) {
        if let DocumentOutcome::Skipped { path, reason } = self {
            tracing::warn!(op, path = %path, error = %reason, "skipping document");
        }
    }
}

pub struct Page<'a> {
    pub paths: &'a [String],
    /// Entries before pagination.
    pub total: usize,
    pub has_more: bool,
}

/// Slice `paths` to one page. Offsets past the end give an empty page.
pub fn paginate(paths: &[String], offset: usize, limit: Option<usize>) -> Page<'_> {
    let limit = limit.filter(|&limit| limit > 0).unwrap_or(DEFAULT_LIST_LIMIT);
    let total = paths.len();
    let start = offset.min(total);
    let end = start.saturating_add(limit).min(total);

    Page {
        paths: &paths[start..end],
        total,
        has_more: end < total,
    }
}

/// Read one document's raw bytes.
pub fn read_raw(
    storage: &Storage,
    cx: &CallContext,
    path: &str,
) -> Result<DocumentOutcome<Vec<u8>>, StorageError> {
    match storage.read(cx, path) {
        Ok(raw) => Ok(DocumentOutcome::Ok(raw)),
        Err(e) if e.is_interrupted() => Err(e),
        Err(e) => Ok(DocumentOutcome::Skipped {
            path: path.to_string(),
            reason: SkipReason::Unreadable(e),
        }),
    }
}

/// Read and decode one document.
pub fn load_document(
    storage: &Storage,
    cx: &CallContext,
    path: &str,
) -> Result<DocumentOutcome<Document>, StorageError> {
    Ok(read_raw(storage, cx, path)?.and_then(|raw| match Document::from_bytes(path, raw) {
        Ok(doc) => DocumentOutcome::Ok(doc),
        Err(e) => DocumentOutcome::Skipped {
            path: path.to_string(),
            reason: SkipReason::Malformed(e),
        },
    }))
}

pub fn summarize(doc: &Document) -> ConversationSummary {
    match &doc.header {
        Some(fm) => ConversationSummary {
            path: doc.path.clone(),
            title: fm.title.clone(),
            date: fm.date.format("%Y-%m-%d").to_string(),
            source: fm.source.clone(),
            tags: fm.tags.clone(),
            description: fm.description.clone(),
        },
        None => ConversationSummary::path_only(doc.path.clone()),
    }
}

/// Summaries for one page, sequentially, in page order.
pub fn summarize_page(
    storage: &Storage,
    cx: &CallContext,
    paths: &[String],
) -> Result<Vec<DocumentOutcome<ConversationSummary>>, StorageError> {
    let mut outcomes = Vec::with_capacity(paths.len());
    for path in paths {
        cx.check()?;
        let outcome = load_document(storage, cx, path)?.and_then(|doc| DocumentOutcome::Ok(summarize(&doc)));
        outcome.log_skip("list");
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
