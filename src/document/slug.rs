use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// File extension of stored conversations.
pub const DOCUMENT_EXTENSION: &str = "md";

pub const MAX_SLUG_LEN: usize = 50;

// ASCII whitespace only: anything else is stripped before collapsing.
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\t\n\x0B\x0C\r -]").expect("static slug pattern"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\t\n\x0B\x0C\r _]+").expect("static separator pattern"));

/// URL-safe slug of a title, at most 50 characters, never bordered by `-`.
///
/// An empty title gives an empty slug.
pub fn generate_slug(title: &str) -> String {
    let lower = title.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lower, "");
    let hyphenated = SEPARATORS.replace_all(&stripped, "-");
    let mut slug = hyphenated.trim_matches('-').to_string();

    // Only ASCII survives the filter, so byte truncation is char-safe.
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        let trimmed = slug.trim_end_matches('-').len();
        slug.truncate(trimmed);
    }

    slug
}

/// `{folder}/{source}/{YYYY-MM-DD}_{slug}.md`
///
/// Pure: the same inputs on the same day always give the same path.
pub fn generate_path(folder: &str, source: &str, title: &str, date: DateTime<Utc>) -> String {
    format!(
        "{folder}/{source}/{}_{}.{DOCUMENT_EXTENSION}",
        date.format("%Y-%m-%d"),
        generate_slug(title)
    )
}

pub fn is_document_path(path: &str) -> bool {
    path.strip_suffix(DOCUMENT_EXTENSION)
        .is_some_and(|stem| stem.ends_with('.'))
}
