use std::collections::BTreeMap;
use std::io::{Read, Write};

use super::{Backend, StorageError};
use crate::document::slug::is_document_path;
use crate::types::context::CallContext;

/// A backend scoped to the root folder conversations live under.
pub struct Storage {
    backend: Box<dyn Backend>,
    folder: String,
}

impl Storage {
    pub fn new(backend: Box<dyn Backend>, folder: impl Into<String>) -> Self {
        let folder = folder.into().trim_matches('/').to_string();
        Self { backend, folder }
    }

    /// Open a backend by name and scope it to `folder`.
    pub fn open(
        backend_name: &str,
        config: &BTreeMap<String, String>,
        folder: impl Into<String>,
    ) -> Result<Self, StorageError> {
        Ok(Self::new(super::open(backend_name, config)?, folder))
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Write `content` to `path` in one committed object.
    ///
    /// If the context fires before commit, the write is abandoned.
    pub fn save(&self, cx: &CallContext, path: &str, content: &[u8]) -> Result<(), StorageError> {
        tracing::debug!(path, bytes = content.len(), "storage write");
        let mut writer = self.backend.new_writer(cx, path)?;
        writer
            .write_all(content)
            .map_err(|e| StorageError::io("write", path, e))?;
        cx.check()?;
        writer.commit()
    }

    pub fn read(&self, cx: &CallContext, path: &str) -> Result<Vec<u8>, StorageError> {
        tracing::debug!(path, "storage read");
        let mut reader = self.backend.new_reader(cx, path)?;
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|e| StorageError::io("read", path, e))?;
        cx.check()?;
        Ok(content)
    }

    pub fn list(&self, cx: &CallContext, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.backend.list(cx, prefix)
    }

    /// Document paths under the root folder, or under `{folder}/{source}`.
    pub fn list_documents(
        &self,
        cx: &CallContext,
        source: Option<&str>,
    ) -> Result<Vec<String>, StorageError> {
        let prefix = match source {
            Some(source) if !source.is_empty() => format!("{}/{}", self.folder, source),
            _ => self.folder.clone(),
        };
        let mut paths = self.list(cx, &prefix)?;
        paths.retain(|path| is_document_path(path));
        tracing::debug!(prefix = %prefix, count = paths.len(), "listed documents");
        Ok(paths)
    }

    pub fn delete(&self, cx: &CallContext, path: &str) -> Result<(), StorageError> {
        tracing::debug!(path, "storage delete");
        self.backend.delete(cx, path)
    }

    pub fn exists(&self, cx: &CallContext, path: &str) -> Result<bool, StorageError> {
        self.backend.exists(cx, path)
    }

    pub fn close(&self) -> Result<(), StorageError> {
        self.backend.close()
    }
}
