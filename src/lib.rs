//! Conversation transcripts stored as Markdown with YAML frontmatter.
//!
//! `chathub-core` saves, reads, lists, searches, appends to and deletes
//! AI-assistant conversations through a pluggable byte [`storage`] backend.
//! Each conversation is one `.md` document under
//! `{folder}/{source}/{YYYY-MM-DD}_{slug}.md`, whose header carries the
//! title, dates, tags and conversation ID.
//!
//! Search is a stateless linear scan; there is no index to keep in sync.

pub mod config;
pub mod document;
pub mod service;
pub mod storage;
pub mod types;

pub use config::{ConfigError, StoreConfig};
pub use service::{ConversationError, ConversationStore};
