/// Characters of context kept on each side of a match in a snippet.
pub const SNIPPET_CONTEXT_CHARS: usize = 100;

/// Occurrence count at which the frequency component saturates.
pub const FREQUENCY_SATURATION: usize = 10;

/// Raw match statistics over lower-cased document content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreDetails {
    /// Byte offset of the first match.
    pub first_match: usize,
    pub content_len: usize,
    /// Non-overlapping occurrences.
    pub occurrences: usize,
}

impl ScoreDetails {
    /// `1 - first_match / content_len`, clamped to [0, 1].
    pub fn position_component(&self) -> f64 {
        if self.content_len == 0 {
            return 0.0;
        }
        (1.0 - self.first_match as f64 / self.content_len as f64).clamp(0.0, 1.0)
    }

    /// `min(occurrences, 10) / 10`.
    pub fn frequency_component(&self) -> f64 {
        self.occurrences.min(FREQUENCY_SATURATION) as f64 / FREQUENCY_SATURATION as f64
    }
}

pub trait Scorer {
    /// `None` when the query does not occur in the content.
    fn score(&self, content_lower: &str, query_lower: &str) -> Option<ScoreDetails>;

    fn score_value(&self, details: &ScoreDetails) -> f64 {
        let score = (details.position_component() + details.frequency_component()) / 2.0;
        debug_assert!((0.0..=1.0).contains(&score), "score {score} out of range [0.0, 1.0]");
        score
    }
}

/// Earlier and more frequent matches rank higher.
///
/// Counts run over the whole raw document, header included, while snippets
/// come from the body only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionFrequencyScorer;

impl Scorer for PositionFrequencyScorer {
    fn score(&self, content_lower: &str, query_lower: &str) -> Option<ScoreDetails> {
        if query_lower.is_empty() {
            return None;
        }
        let first_match = content_lower.find(query_lower)?;
        Some(ScoreDetails {
            first_match,
            content_len: content_lower.len(),
            occurrences: content_lower.matches(query_lower).count(),
        })
    }
}

/// Excerpt of `body` around the first case-insensitive match of `query_lower`.
///
/// Whitespace runs collapse to single spaces and `...` marks each clipped end.
/// With no match in the body the window starts at the beginning.
pub fn extract_snippet(body: &str, query_lower: &str, context_chars: usize) -> String {
    let body_lower = body.to_lowercase();
    let (match_at, match_len) = match body_lower.find(query_lower) {
        Some(byte) if !query_lower.is_empty() => (
            body_lower[..byte].chars().count(),
            query_lower.chars().count(),
        ),
        _ => (0, 0),
    };

    // Char positions in the lower-cased text index the original; lower-casing
    // that changes char counts only shifts the window slightly.
    let chars: Vec<char> = body.chars().collect();
    let total = chars.len();
    let match_at = match_at.min(total);
    let start = match_at.saturating_sub(context_chars);
    let end = match_at
        .saturating_add(match_len)
        .saturating_add(context_chars)
        .min(total);

    let window: String = chars[start..end].iter().collect();
    let mut snippet = window.split_whitespace().collect::<Vec<_>>().join(" ");

    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < total {
        snippet.push_str("...");
    }
    snippet
}
