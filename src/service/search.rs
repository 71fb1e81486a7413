use crate::document::parser;
use crate::document::DocumentError;
use crate::storage::{Storage, StorageError};
use crate::types::context::CallContext;
use crate::types::conversation::{SearchHit, SearchRequest, SearchResults};

use super::listing::{read_raw, DocumentOutcome, SkipReason};
use super::ranking::{extract_snippet, PositionFrequencyScorer, Scorer, SNIPPET_CONTEXT_CHARS};
use super::ConversationError;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Linear substring search over stored conversations.
///
/// Candidates are visited in listing order and the scan stops at `limit`
/// hits, so results are in encounter order rather than ranked globally.
pub struct SearchEngine<S = PositionFrequencyScorer> {
    scorer: S,
    context_chars: usize,
}

impl Default for SearchEngine<PositionFrequencyScorer> {
    fn default() -> Self {
        Self {
            scorer: PositionFrequencyScorer,
            context_chars: SNIPPET_CONTEXT_CHARS,
        }
    }
}

impl<S: Scorer> SearchEngine<S> {
    pub fn new(scorer: S) -> Self {
        Self {
            scorer,
            context_chars: SNIPPET_CONTEXT_CHARS,
        }
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn search(
        &self,
        storage: &Storage,
        cx: &CallContext,
        request: &SearchRequest,
    ) -> Result<SearchResults, ConversationError> {
        let limit = request
            .limit
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_SEARCH_LIMIT);

        let query = request.query.to_lowercase();
        if query.is_empty() {
            tracing::debug!("empty search query");
            return Ok(SearchResults {
                results: Vec::new(),
                total: 0,
            });
        }

        let paths = storage
            .list_documents(cx, request.source.as_deref())
            .map_err(ConversationError::storage("search", storage.folder()))?;

        let mut results = Vec::new();
        for path in &paths {
            let outcome = cx
                .check()
                .and_then(|_| self.scan(storage, cx, path, &query))
                .map_err(ConversationError::storage("search", path))?;
            outcome.log_skip("search");

            if let Some(Some(hit)) = outcome.ok() {
                results.push(hit);
                if results.len() >= limit {
                    break;
                }
            }
        }

        tracing::debug!(
            query = %request.query,
            candidates = paths.len(),
            hits = results.len(),
            "search finished"
        );
        let total = results.len();
        Ok(SearchResults { results, total })
    }

    /// One candidate: `Ok(None)` on no match, `Skipped` when it cannot be read or parsed.
    fn scan(
        &self,
        storage: &Storage,
        cx: &CallContext,
        path: &str,
        query_lower: &str,
    ) -> Result<DocumentOutcome<Option<SearchHit>>, StorageError> {
        Ok(read_raw(storage, cx, path)?.and_then(|raw| {
            let content = match String::from_utf8(raw) {
                Ok(content) => content,
                Err(e) => return skipped(path, DocumentError::InvalidUtf8(e)),
            };

            let content_lower = content.to_lowercase();
            let Some(details) = self.scorer.score(&content_lower, query_lower) else {
                return DocumentOutcome::Ok(None);
            };

            let (header, body) = match parser::parse(&content) {
                Ok(parsed) => parsed,
                Err(e) => return skipped(path, DocumentError::InvalidFrontmatter(e)),
            };

            DocumentOutcome::Ok(Some(SearchHit {
                path: path.to_string(),
                title: header.map(|fm| fm.title).unwrap_or_default(),
                snippet: extract_snippet(body, query_lower, self.context_chars),
                score: self.scorer.score_value(&details),
            }))
        }))
    }
}

fn skipped<T>(path: &str, error: DocumentError) -> DocumentOutcome<T> {
    DocumentOutcome::Skipped {
        path: path.to_string(),
        reason: SkipReason::Malformed(error),
    }
}
