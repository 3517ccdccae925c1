//! Keyword-centred excerpt extraction.
//!
//! For each keyword (in priority order) the first case-insensitive match is
//! located and a window of `window` characters on either side of it is cut
//! out of the content. Windows that touch or overlap an already accepted
//! window are rejected, so two keywords sitting close together never produce
//! the same passage twice.
//!
//! Offsets are counted in `char`s, never bytes, so windows always land on
//! character boundaries regardless of script.

use std::ops::Range;

/// Aggregator marker for "the rest of the article was cut here".
const READ_MORE_MARKER: &str = "[+";

/// A window of article content and the character range it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub text: String,
    pub range: Range<usize>,
}

impl Snippet {
    fn overlaps(&self, other: &Range<usize>) -> bool {
        other.start <= self.range.end && other.end >= self.range.start
    }
}

/// Extract at most `max_count` non-overlapping snippets, keyword order first.
///
/// Returns only the snippet text; see [`extract_snippet_windows`] for ranges.
pub fn extract_snippets<S: AsRef<str>>(
    content: &str,
    keywords: &[S],
    window: usize,
    max_count: usize,
) -> Vec<String> {
    extract_snippet_windows(content, keywords, window, max_count)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

pub fn extract_snippet_windows<S: AsRef<str>>(
    content: &str,
    keywords: &[S],
    window: usize,
    max_count: usize,
) -> Vec<Snippet> {
    let mut accepted: Vec<Snippet> = Vec::new();
    if content.is_empty() || max_count == 0 {
        return accepted;
    }

    let chars: Vec<char> = content.chars().collect();
    let folded: Vec<char> = chars.iter().map(|&c| fold_char(c)).collect();

    for keyword in keywords {
        let needle: Vec<char> = keyword.as_ref().chars().map(fold_char).collect();
        let Some(idx) = find_chars(&folded, &needle) else {
            continue;
        };

        let start = idx.saturating_sub(window);
        let end = idx
            .saturating_add(needle.len())
            .saturating_add(window)
            .min(chars.len());
        let range = start..end;
        if accepted.iter().any(|s| s.overlaps(&range)) {
            tracing::debug!(keyword = keyword.as_ref(), ?range, "Snippet window overlaps; skipping");
            continue;
        }

        let raw: String = chars[range.clone()].iter().collect();
        let text = raw
            .trim()
            .split(READ_MORE_MARKER)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        accepted.push(Snippet { text, range });

        if accepted.len() >= max_count {
            break;
        }
    }

    accepted
}

/// Lowercase a single char without changing the char count.
fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
