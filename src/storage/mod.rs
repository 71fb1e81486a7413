//! Byte storage behind the conversation store.
//!
//! A [`Backend`] knows nothing about conversations: it reads, writes, lists and
//! deletes objects addressed by forward-slash paths. [`Storage`] scopes a
//! backend under the configured root folder.

pub mod file;
pub mod memory;
pub mod store;

use std::collections::BTreeMap;
use std::io::{Read, Write};

use thiserror::Error;

use crate::types::context::CallContext;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use store::Storage;

pub const BACKEND_MEMORY: &str = "memory";
pub const BACKEND_FILE: &str = "file";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid path: {0:?}")]
    InvalidPath(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("operation timed out")]
    TimedOut,
    #[error("storage backend is closed")]
    Closed,
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),
    #[error("missing storage config key: {0}")]
    MissingConfig(&'static str),
}

impl StorageError {
    pub(crate) fn io(op: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// The cancellation signal fired; never treated as a per-document failure.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, StorageError::Cancelled | StorageError::TimedOut)
    }
}

/// An object store over forward-slash paths.
///
/// Every call takes the caller's [`CallContext`] and must fail with
/// `Cancelled`/`TimedOut` once it has fired. Readers and writers release
/// their resources on drop; a writer dropped without [`ObjectWriter::commit`]
/// leaves the previous object untouched.
pub trait Backend: Send + Sync {
    fn new_writer<'a>(
        &'a self,
        cx: &CallContext,
        path: &str,
    ) -> Result<Box<dyn ObjectWriter + 'a>, StorageError>;

    fn new_reader<'a>(&'a self, cx: &CallContext, path: &str)
        -> Result<Box<dyn Read + 'a>, StorageError>;

    /// Every object at or below `prefix`, sorted. Unknown prefixes list as empty.
    fn list(&self, cx: &CallContext, prefix: &str) -> Result<Vec<String>, StorageError>;

    fn delete(&self, cx: &CallContext, path: &str) -> Result<(), StorageError>;

    fn exists(&self, cx: &CallContext, path: &str) -> Result<bool, StorageError>;

    fn close(&self) -> Result<(), StorageError>;
}

pub trait ObjectWriter: Write {
    /// Publish everything written so far as the object's new content.
    fn commit(self: Box<Self>) -> Result<(), StorageError>;
}

/// Open a backend by name: `memory`, or `file` with a `root` key.
pub fn open(
    backend_name: &str,
    config: &BTreeMap<String, String>,
) -> Result<Box<dyn Backend>, StorageError> {
    match backend_name {
        BACKEND_MEMORY => Ok(Box::new(MemoryBackend::new())),
        BACKEND_FILE => {
            let root = config
                .get("root")
                .filter(|root| !root.is_empty())
                .ok_or(StorageError::MissingConfig("root"))?;
            Ok(Box::new(FileBackend::new(root)?))
        }
        other => Err(StorageError::UnknownBackend(other.to_string())),
    }
}

/// Normalise an object path: drop empty and `.` segments, refuse `..`.
pub(crate) fn clean_path(path: &str) -> Result<String, StorageError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

pub(crate) fn clean_object_path(path: &str) -> Result<String, StorageError> {
    let cleaned = clean_path(path)?;
    if cleaned.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(cleaned)
}

/// `key` equals `prefix` or lives below it as a directory.
pub(crate) fn under_prefix(key: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
