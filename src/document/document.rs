use thiserror::Error;

use super::metadata::Frontmatter;
use super::parser::{self, FrontmatterError};
use crate::types::identifiers::DocumentVersion;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Content must be valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    InvalidFrontmatter(#[from] FrontmatterError),
}

/// A stored conversation: raw content split into an optional header and a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub version: DocumentVersion,
    /// Raw content exactly as read from storage.
    pub content: String,
    pub header: Option<Frontmatter>,
    pub body: String,
}

impl Document {
    /// Decode raw bytes read from `path`.
    ///
    /// Fails on invalid UTF-8 and on a malformed header; a document without a
    /// header is valid and keeps its whole trimmed content as the body.
    pub fn from_bytes(path: impl Into<String>, raw: Vec<u8>) -> Result<Self, DocumentError> {
        let content = String::from_utf8(raw)?;
        let version = DocumentVersion::from_content(content.as_bytes());

        let (header, body) = parser::parse(&content)?;
        let body = body.to_string();

        Ok(Document {
            path: path.into(),
            version,
            content,
            header,
            body,
        })
    }

    pub fn title(&self) -> &str {
        self.header.as_ref().map_or("", |fm| fm.title.as_str())
    }
}
