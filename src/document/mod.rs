pub mod metadata;
pub mod document;
pub mod parser;
pub mod slug;

pub use metadata::Frontmatter;
pub use document::{Document, DocumentError};
pub use parser::{extract_description, parse, render, render_with_content, FrontmatterError, DELIMITER};
pub use slug::{generate_path, generate_slug, is_document_path, DOCUMENT_EXTENSION};
