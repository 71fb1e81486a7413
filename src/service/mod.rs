pub mod listing;
pub mod ranking;
pub mod search;

use std::collections::BTreeMap;
use std::string::FromUtf8Error;

use chrono::SecondsFormat;
use thiserror::Error;

use crate::document::{
    extract_description, generate_path, render_with_content, Document, DocumentError,
    Frontmatter, FrontmatterError,
};
use crate::document::parser::DEFAULT_DESCRIPTION_LEN;
use crate::storage::{Storage, StorageError};
use crate::types::clock::{Clock, IdGenerator, SystemClock, TimestampIdGenerator};
use crate::types::context::CallContext;
use crate::types::conversation::{
    AppendOutcome, ConversationView, DeleteOutcome, ListPage, ListRequest, SaveOutcome,
    SaveRequest, SearchRequest, SearchResults,
};
use crate::types::identifiers::{InvalidSource, Source};

pub use listing::{paginate, DocumentOutcome, SkipReason, DEFAULT_LIST_LIMIT};
pub use ranking::{extract_snippet, PositionFrequencyScorer, ScoreDetails, Scorer};
pub use search::{SearchEngine, DEFAULT_SEARCH_LIMIT};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    InvalidSource(#[from] InvalidSource),

    #[error("{op} {path}: {source}")]
    InvalidFrontmatter {
        op: &'static str,
        path: String,
        #[source]
        source: FrontmatterError,
    },

    #[error("{op} {path}: content is not valid UTF-8")]
    InvalidContent {
        op: &'static str,
        path: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("{op} {path}: {source}")]
    Storage {
        op: &'static str,
        path: String,
        #[source]
        source: StorageError,
    },

    #[error("{op} interrupted: {source}")]
    Interrupted {
        op: &'static str,
        #[source]
        source: StorageError,
    },
}

impl ConversationError {
    /// Wrap a storage failure; cancellation and timeouts stay recognisable.
    pub(crate) fn storage<'a>(
        op: &'static str,
        path: &'a str,
    ) -> impl FnOnce(StorageError) -> ConversationError + 'a {
        move |source| {
            if source.is_interrupted() {
                ConversationError::Interrupted { op, source }
            } else {
                ConversationError::Storage {
                    op,
                    path: path.to_string(),
                    source,
                }
            }
        }
    }

    pub(crate) fn document<'a>(
        op: &'static str,
        path: &'a str,
    ) -> impl FnOnce(DocumentError) -> ConversationError + 'a {
        move |error| match error {
            DocumentError::InvalidFrontmatter(source) => ConversationError::InvalidFrontmatter {
                op,
                path: path.to_string(),
                source,
            },
            DocumentError::InvalidUtf8(source) => ConversationError::InvalidContent {
                op,
                path: path.to_string(),
                source,
            },
        }
    }

    fn render<'a>(
        op: &'static str,
        path: &'a str,
    ) -> impl FnOnce(FrontmatterError) -> ConversationError + 'a {
        move |source| ConversationError::InvalidFrontmatter {
            op,
            path: path.to_string(),
            source,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ConversationError::Interrupted { .. })
    }
}

/// Save, read, append, delete, list and search conversations in a [`Storage`].
///
/// Stateless between calls: every operation reads what it needs, writes at
/// most one document, and returns. There is no locking, so concurrent writers
/// to one path race exactly as the backend lets them.
pub struct ConversationStore<C = SystemClock, G = TimestampIdGenerator> {
    storage: Storage,
    clock: C,
    ids: G,
    description_max_len: usize,
    search: SearchEngine,
}

impl ConversationStore<SystemClock, TimestampIdGenerator> {
    pub fn new(storage: Storage) -> Self {
        Self::with_parts(storage, SystemClock, TimestampIdGenerator::new())
    }
}

impl<C, G> ConversationStore<C, G>
where
    C: Clock,
    G: IdGenerator,
{
    pub fn with_parts(storage: Storage, clock: C, ids: G) -> Self {
        Self {
            storage,
            clock,
            ids,
            description_max_len: DEFAULT_DESCRIPTION_LEN,
            search: SearchEngine::default(),
        }
    }

    pub fn with_description_max_len(mut self, max_len: usize) -> Self {
        self.description_max_len = max_len;
        self
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Write a new conversation. Returns its path and conversation ID.
    ///
    /// The path is derived from source, title and today's date. An existing
    /// document at that path is overwritten.
    pub fn save(&self, cx: &CallContext, request: SaveRequest) -> Result<SaveOutcome, ConversationError> {
        let source: Source = request.source.parse()?;

        let now = self.clock.now();
        let mut fm = Frontmatter::new(&request.title, source, now, self.ids.next_id());
        fm.tags = request.tags;
        fm.categories = request.categories;
        fm.description = match request.description.filter(|d| !d.is_empty()) {
            Some(description) => description,
            None => extract_description(&request.content, self.description_max_len),
        };

        let path = generate_path(self.storage.folder(), source.as_str(), &request.title, now);
        let rendered =
            render_with_content(&fm, &request.content).map_err(ConversationError::render("save", &path))?;

        self.storage
            .save(cx, &path, rendered.as_bytes())
            .map_err(ConversationError::storage("save", &path))?;

        let conversation_id = fm
            .conversation_id
            .map(|id| id.into_string())
            .unwrap_or_default();
        tracing::info!(path = %path, conversation_id = %conversation_id, "saved conversation");

        Ok(SaveOutcome {
            path,
            conversation_id,
        })
    }

    pub fn read(&self, cx: &CallContext, path: &str) -> Result<ConversationView, ConversationError> {
        let doc = self.load("read", cx, path)?;
        Ok(view(doc))
    }

    /// Append `content` to the body, separated by a blank line.
    ///
    /// With a header, `lastmod` is refreshed and `message_count` goes up by
    /// exactly one per call. Without one the text is appended to the raw
    /// content as is and no header is created.
    pub fn append(
        &self,
        cx: &CallContext,
        path: &str,
        content: &str,
    ) -> Result<AppendOutcome, ConversationError> {
        let doc = self.load("append", cx, path)?;

        let (updated, message_count) = match doc.header {
            None => {
                let mut updated = doc.content;
                updated.push_str("\n\n");
                updated.push_str(content);
                (updated, None)
            }
            Some(mut fm) => {
                let count = fm.touch(self.clock.now());
                let body = format!("{}\n\n{}", doc.body, content);
                let updated =
                    render_with_content(&fm, &body).map_err(ConversationError::render("append", path))?;
                (updated, Some(count))
            }
        };

        self.storage
            .save(cx, path, updated.as_bytes())
            .map_err(ConversationError::storage("append", path))?;
        tracing::info!(path, message_count = ?message_count, "appended to conversation");

        Ok(AppendOutcome {
            path: path.to_string(),
            message_count,
        })
    }

    /// Remove a conversation. A missing path is reported, not an error.
    pub fn delete(&self, cx: &CallContext, path: &str) -> Result<DeleteOutcome, ConversationError> {
        let not_found = || DeleteOutcome {
            deleted: false,
            message: format!("conversation not found: {path}"),
        };

        let exists = self
            .storage
            .exists(cx, path)
            .map_err(ConversationError::storage("delete", path))?;
        if !exists {
            return Ok(not_found());
        }

        match self.storage.delete(cx, path) {
            Ok(()) => {}
            // Removed by someone else between the check and the delete.
            Err(StorageError::NotFound { .. }) => return Ok(not_found()),
            Err(e) => return Err(ConversationError::storage("delete", path)(e)),
        }
        tracing::info!(path, "deleted conversation");

        Ok(DeleteOutcome {
            deleted: true,
            message: format!("deleted: {path}"),
        })
    }

    /// One page of summaries. Documents that fail to read or parse are left
    /// out of the page; `total` still counts them.
    pub fn list(&self, cx: &CallContext, request: &ListRequest) -> Result<ListPage, ConversationError> {
        let paths = self
            .storage
            .list_documents(cx, request.source.as_deref())
            .map_err(ConversationError::storage("list", self.storage.folder()))?;

        let page = paginate(&paths, request.offset, request.limit);
        let conversations = listing::summarize_page(&self.storage, cx, page.paths)
            .map_err(ConversationError::storage("list", self.storage.folder()))?
            .into_iter()
            .filter_map(DocumentOutcome::ok)
            .collect();

        Ok(ListPage {
            conversations,
            total: page.total,
            has_more: page.has_more,
        })
    }

    pub fn search(&self, cx: &CallContext, request: &SearchRequest) -> Result<SearchResults, ConversationError> {
        self.search.search(&self.storage, cx, request)
    }

    fn load(&self, op: &'static str, cx: &CallContext, path: &str) -> Result<Document, ConversationError> {
        let raw = self
            .storage
            .read(cx, path)
            .map_err(ConversationError::storage(op, path))?;
        Document::from_bytes(path, raw).map_err(ConversationError::document(op, path))
    }
}

fn view(doc: Document) -> ConversationView {
    let Some(fm) = doc.header else {
        return ConversationView {
            path: doc.path,
            content: doc.body,
            version: doc.version.as_str().to_string(),
            title: String::new(),
            date: String::new(),
            source: String::new(),
            tags: Vec::new(),
            description: String::new(),
            metadata: BTreeMap::new(),
        };
    };

    let mut metadata = BTreeMap::new();
    let extras = [
        ("conversation_id", fm.conversation_id.map(|id| id.into_string()).unwrap_or_default()),
        ("author", fm.author),
        ("slug", fm.slug),
        ("model", fm.model),
    ];
    for (key, value) in extras {
        if !value.is_empty() {
            metadata.insert(key.to_string(), value);
        }
    }

    ConversationView {
        path: doc.path,
        content: doc.content,
        version: doc.version.as_str().to_string(),
        title: fm.title,
        date: fm.date.to_rfc3339_opts(SecondsFormat::Secs, true),
        source: fm.source,
        tags: fm.tags,
        description: fm.description,
        metadata,
    }
}
