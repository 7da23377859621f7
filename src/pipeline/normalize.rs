//! Tag normalisation: reduce an untrusted JSON value to a short list of
//! clean tag names.
//!
//! Never fails. Anything that does not look like a list of strings yields an
//! empty list, and the caller decides whether that is an error.

use serde_json::Value;

/// At most this many tags survive, counted before deduplication.
pub const MAX_TAGS: usize = 5;
/// A tag may have at most this many words.
pub const MAX_TAG_WORDS: usize = 3;

/// Normalise model output into lower-case, trimmed, unique tag names.
///
/// Accepts a bare array or an object with a `tags` member. Non-string and
/// blank entries are dropped, as are entries of more than three words
/// (hyphens separate words too, so `"this-is-too-many-words"` is four).
/// The first five survivors are kept, then duplicates are removed in
/// first-occurrence order.
pub fn validate_and_normalize_tags(raw: &Value) -> Vec<String> {
    let candidates = match raw {
        Value::Object(map) => match map.get("tags") {
            Some(inner) if is_truthy(inner) => inner,
            _ => return Vec::new(),
        },
        other => other,
    };

    let Some(items) = candidates.as_array() else {
        return Vec::new();
    };

    let cleaned: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| (1..=MAX_TAG_WORDS).contains(&word_count(tag)))
        .take(MAX_TAGS)
        .collect();

    let mut unique: Vec<String> = Vec::with_capacity(cleaned.len());
    for tag in cleaned {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

fn word_count(tag: &str) -> usize {
    tag.split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .count()
}

/// JSON truthiness: `null`, `false`, `0` and `""` are false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
