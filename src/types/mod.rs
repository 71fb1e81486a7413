pub mod clock;
pub mod context;
pub mod conversation;
pub mod identifiers;

pub use clock::{Clock, FixedClock, IdGenerator, SystemClock, TimestampIdGenerator};
pub use context::CallContext;
pub use conversation::{
    AppendOutcome, ConversationSummary, ConversationView, DeleteOutcome, ListPage, ListRequest,
    SaveOutcome, SaveRequest, SearchHit, SearchRequest, SearchResults,
};
pub use identifiers::{ConversationId, DocumentVersion, InvalidSource, Source};
