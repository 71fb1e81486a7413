use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::{clean_object_path, clean_path, under_prefix, Backend, ObjectWriter, StorageError};
use crate::types::context::CallContext;

/// Process-local object store. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn ready(&self, cx: &CallContext) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        cx.check()
    }
}

struct MemoryWriter<'a> {
    backend: &'a MemoryBackend,
    path: String,
    buf: Vec<u8>,
}

impl Write for MemoryWriter<'_> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ObjectWriter for MemoryWriter<'_> {
    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        if self.backend.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        let MemoryWriter { backend, path, buf } = *self;
        backend.objects.write().insert(path, buf);
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn new_writer<'a>(
        &'a self,
        cx: &CallContext,
        path: &str,
    ) -> Result<Box<dyn ObjectWriter + 'a>, StorageError> {
        self.ready(cx)?;
        Ok(Box::new(MemoryWriter {
            backend: self,
            path: clean_object_path(path)?,
            buf: Vec::new(),
        }))
    }

    fn new_reader<'a>(
        &'a self,
        cx: &CallContext,
        path: &str,
    ) -> Result<Box<dyn Read + 'a>, StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        let bytes = self
            .objects
            .read()
            .get(&key)
            .cloned()
            .ok_or(StorageError::NotFound { path: key })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn list(&self, cx: &CallContext, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.ready(cx)?;
        let prefix = clean_path(prefix)?;
        Ok(self
            .objects
            .read()
            .keys()
            .filter(|key| under_prefix(key, &prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, cx: &CallContext, path: &str) -> Result<(), StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        match self.objects.write().remove(&key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound { path: key }),
        }
    }

    fn exists(&self, cx: &CallContext, path: &str) -> Result<bool, StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        Ok(self.objects.read().contains_key(&key))
    }

    fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(backend: &MemoryBackend, path: &str, data: &[u8]) {
        let cx = CallContext::background();
        let mut writer = backend.new_writer(&cx, path).unwrap();
        writer.write_all(data).unwrap();
        writer.commit().unwrap();
    }

    #[test]
    fn write_read_list_delete() {
        let backend = MemoryBackend::new();
        let cx = CallContext::background();
        put(&backend, "c/claude/b.md", b"two");
        put(&backend, "c/chatgpt/a.md", b"one");
        put(&backend, "other/z.md", b"three");

        let mut out = String::new();
        backend.new_reader(&cx, "c/claude/b.md").unwrap().read_to_string(&mut out).unwrap();
        assert_eq!(out, "two");

        assert_eq!(backend.list(&cx, "c").unwrap(), vec!["c/chatgpt/a.md", "c/claude/b.md"]);
        assert!(backend.list(&cx, "missing").unwrap().is_empty());

        backend.delete(&cx, "c/claude/b.md").unwrap();
        assert!(!backend.exists(&cx, "c/claude/b.md").unwrap());
        assert!(matches!(
            backend.delete(&cx, "c/claude/b.md"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn uncommitted_writer_leaves_previous_content() {
        let backend = MemoryBackend::new();
        let cx = CallContext::background();
        put(&backend, "a.md", b"old");

        {
            let mut writer = backend.new_writer(&cx, "a.md").unwrap();
            writer.write_all(b"new").unwrap();
        }

        let mut out = Vec::new();
        backend.new_reader(&cx, "a.md").unwrap().read_to_end(&mut out).unwrap();
        assert_eq!(out, b"old");
    }

    #[test]
    fn closed_backend_refuses_work() {
        let backend = MemoryBackend::new();
        backend.close().unwrap();
        let cx = CallContext::background();
        assert!(matches!(backend.exists(&cx, "a.md"), Err(StorageError::Closed)));
    }

    #[test]
    fn cancelled_context_is_reported() {
        let backend = MemoryBackend::new();
        let cx = CallContext::background();
        cx.cancel();
        assert!(matches!(backend.list(&cx, ""), Err(StorageError::Cancelled)));
    }
}
