use std::fs;
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tempfile::NamedTempFile;

use super::{clean_object_path, clean_path, Backend, ObjectWriter, StorageError};
use crate::types::context::CallContext;

/// Objects stored as files below a root directory.
///
/// Writes go to a temp file in the target directory and are renamed into
/// place on commit, so readers never observe a half-written document.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    closed: AtomicBool,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StorageError::io("create", root.display().to_string(), e))?;
        Ok(Self {
            root,
            closed: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ready(&self, cx: &CallContext) -> Result<(), StorageError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        cx.check()
    }

    fn resolve(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root.clone(), |acc, segment| acc.join(segment))
    }

    fn walk(
        &self,
        cx: &CallContext,
        dir: &Path,
        prefix: &str,
        out: &mut Vec<String>,
    ) -> Result<(), StorageError> {
        cx.check()?;
        let entries = fs::read_dir(dir).map_err(|e| StorageError::io("list", prefix, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io("list", prefix, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::debug!(dir = %dir.display(), "skipping non UTF-8 file name");
                continue;
            };
            // Hidden entries include in-flight temp files.
            if name.starts_with('.') {
                continue;
            }

            let key = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::io("list", key.clone(), e))?;

            if file_type.is_dir() {
                self.walk(cx, &entry.path(), &key, out)?;
            } else if file_type.is_file() {
                out.push(key);
            }
        }
        Ok(())
    }
}

struct FileWriter {
    key: String,
    target: PathBuf,
    file: NamedTempFile,
}

impl Write for FileWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl ObjectWriter for FileWriter {
    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let FileWriter { key, target, mut file } = *self;
        file.flush()
            .and_then(|_| file.as_file().sync_all())
            .map_err(|e| StorageError::io("write", key.clone(), e))?;
        file.persist(&target)
            .map_err(|e| StorageError::io("write", key, e.error))?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn new_writer<'a>(
        &'a self,
        cx: &CallContext,
        path: &str,
    ) -> Result<Box<dyn ObjectWriter + 'a>, StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        let target = self.resolve(&key);
        let parent = target
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(key.clone()))?;

        fs::create_dir_all(parent).map_err(|e| StorageError::io("create", key.clone(), e))?;
        let file = NamedTempFile::new_in(parent).map_err(|e| StorageError::io("create", key.clone(), e))?;

        Ok(Box::new(FileWriter { key, target, file }))
    }

    fn new_reader<'a>(
        &'a self,
        cx: &CallContext,
        path: &str,
    ) -> Result<Box<dyn Read + 'a>, StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        match fs::File::open(self.resolve(&key)) {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound { path: key }),
            Err(e) => Err(StorageError::io("open", key, e)),
        }
    }

    fn list(&self, cx: &CallContext, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.ready(cx)?;
        let prefix = clean_path(prefix)?;
        let start = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.resolve(&prefix)
        };

        let mut out = Vec::new();
        match fs::metadata(&start) {
            Ok(meta) if meta.is_dir() => self.walk(cx, &start, &prefix, &mut out)?,
            Ok(meta) if meta.is_file() => out.push(prefix),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io("list", prefix, e)),
        }
        out.sort();
        Ok(out)
    }

    fn delete(&self, cx: &CallContext, path: &str) -> Result<(), StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        match fs::remove_file(self.resolve(&key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound { path: key }),
            Err(e) => Err(StorageError::io("delete", key, e)),
        }
    }

    fn exists(&self, cx: &CallContext, path: &str) -> Result<bool, StorageError> {
        self.ready(cx)?;
        let key = clean_object_path(path)?;
        match fs::metadata(self.resolve(&key)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io("stat", key, e)),
        }
    }

    fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
