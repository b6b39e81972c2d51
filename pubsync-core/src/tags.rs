//! Tag normalization for the remote API: at most four tags, each `[a-z0-9_]+`.

use crate::contract::RawTags;

/// Maximum number of tags the remote accepts per article.
pub const MAX_TAGS: usize = 4;

const SEPARATORS: &[char] = &[',', ';', ':', '[', ']'];

/// Scalar values that stand for "no tags" when they appear as the whole tag field.
const ABSENT_PLACEHOLDERS: &[&str] = &["none", "null", "nil", "~"];

/// Normalizes raw tags. Total: every input yields a valid (possibly empty) tag list.
///
/// Order of steps: split, trim, drop empties, keep the first [`MAX_TAGS`], lowercase,
/// then replace every character outside `[a-z0-9_]` with `_`.
pub fn normalize(raw: &RawTags) -> Vec<String> {
    let tokens: Vec<&str> = match raw {
        RawTags::Absent => return Vec::new(),
        RawTags::Text(text) => {
            let trimmed = text.trim();
            if ABSENT_PLACEHOLDERS
                .iter()
                .any(|p| trimmed.eq_ignore_ascii_case(p))
            {
                return Vec::new();
            }
            trimmed.split(SEPARATORS).collect()
        }
        RawTags::List(items) => items.iter().map(String::as_str).collect(),
    };

    tokens
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .map(sanitize)
        .collect()
}

fn sanitize(token: &str) -> String {
    token
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
