use thiserror::Error;

use super::metadata::Frontmatter;

/// Marker that opens and closes the YAML header block.
pub const DELIMITER: &str = "---";

/// Maximum description length used when deriving one from content.
pub const DEFAULT_DESCRIPTION_LEN: usize = 150;

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("invalid frontmatter format: missing closing delimiter")]
    Unterminated,
    #[error("invalid frontmatter format: {0}")]
    Decode(#[source] serde_yaml::Error),
    #[error("invalid frontmatter format: cannot encode header: {0}")]
    Encode(#[source] serde_yaml::Error),
}

/// Split a document into its header and body.
///
/// Input is trimmed first. No leading `---` means no header, and the whole
/// trimmed input is the body. An opening `---` without a closing `---` at the
/// start of a later line is an error, never a headerless document.
pub fn parse(content: &str) -> Result<(Option<Frontmatter>, &str), FrontmatterError> {
    let content = content.trim();

    let Some(rest) = content.strip_prefix(DELIMITER) else {
        return Ok((None, content));
    };

    let end = find_closing(rest).ok_or(FrontmatterError::Unterminated)?;
    let yaml = rest[..end].trim();
    let body = rest[end + DELIMITER.len()..].trim();

    let frontmatter = if yaml.is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml).map_err(FrontmatterError::Decode)?
    };

    Ok((Some(frontmatter), body))
}

fn find_closing(rest: &str) -> Option<usize> {
    rest.match_indices(DELIMITER)
        .map(|(idx, _)| idx)
        .find(|&idx| idx == 0 || rest.as_bytes()[idx - 1] == b'\n')
}

/// Render the header block: `---\n<yaml>---\n`.
pub fn render(frontmatter: &Frontmatter) -> Result<String, FrontmatterError> {
    let yaml = serde_yaml::to_string(frontmatter).map_err(FrontmatterError::Encode)?;

    let mut out = String::with_capacity(yaml.len() + 2 * (DELIMITER.len() + 1));
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    Ok(out)
}

/// Header block, a blank line, then the body verbatim.
pub fn render_with_content(frontmatter: &Frontmatter, body: &str) -> Result<String, FrontmatterError> {
    let mut out = render(frontmatter)?;
    out.reserve(body.len() + 1);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

/// First non-empty line that is not a Markdown heading, cut to `max_len` chars.
pub fn extract_description(content: &str, max_len: usize) -> String {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        return match line.char_indices().nth(max_len) {
            Some((cut, _)) => format!("{}...", &line[..cut]),
            None => line.to_string(),
        };
    }
    String::new()
}
