//! Model-identity normalization.
//!
//! Maps a source-native model identifier to a canonical comparison key so
//! that "openai/gpt-4o" (aggregator) and "gpt-4o" (official config) match,
//! while genuinely distinct priced products stay distinguishable.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Known renames across sources. Checked before suffix stripping so that
/// names which merely look like dated or preview variants are not corrupted.
static MODEL_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("gpt-4-turbo-preview", "gpt-4-turbo"),
        ("gpt-4-1106-preview", "gpt-4-turbo"),
        ("chatgpt-4o-latest", "gpt-4o"),
        ("claude-3.5-sonnet-latest", "claude-3.5-sonnet"),
        ("gemini-flash-1.5", "gemini-1.5-flash"),
        ("gemini-pro-1.5", "gemini-1.5-pro"),
    ])
});

/// Trailing variant markers that do not change pricing. Suffixes that denote
/// differently priced products (`:extended`, `-16k`, `-instruct`) are never
/// stripped.
const STRIPPABLE_SUFFIXES: &[&str] = &[":thinking", "-preview", "-001"];

/// Produce the canonical comparison key for a model identifier.
///
/// Steps, in order: strip a single provider-prefix segment, consult the
/// alias table, strip a trailing date suffix, strip known variant suffixes,
/// lower-case. Empty input normalizes to an empty string.
pub fn canonical_model_key(model_id: &str) -> String {
    if model_id.is_empty() {
        return String::new();
    }

    // Only ids with exactly one '/' lose their provider prefix; multi-segment
    // vendor paths are left alone rather than mis-split.
    let mut key = if model_id.matches('/').count() == 1 {
        model_id.split_once('/').map(|(_, rest)| rest).unwrap_or(model_id)
    } else {
        model_id
    }
    .to_string();

    let lowered = key.to_lowercase();
    if let Some(alias) = MODEL_ALIASES.get(lowered.as_str()) {
        return (*alias).to_string();
    }

    if let Some(stripped) = strip_date_suffix(&key) {
        key = stripped.to_string();
    }

    for suffix in STRIPPABLE_SUFFIXES {
        if let Some(stripped) = key.strip_suffix(suffix) {
            key = stripped.to_string();
        }
    }

    key.to_lowercase()
}

/// Strip a trailing `-YYYY-MM-DD` or `-YYYYMMDD` date suffix, if present.
fn strip_date_suffix(id: &str) -> Option<&str> {
    if !id.is_ascii() {
        return None;
    }
    // -YYYY-MM-DD
    if id.len() > 11 {
        let (head, tail) = id.split_at(id.len() - 11);
        let b = tail.as_bytes();
        if b[0] == b'-'
            && b[1..5].iter().all(u8::is_ascii_digit)
            && b[5] == b'-'
            && b[6..8].iter().all(u8::is_ascii_digit)
            && b[8] == b'-'
            && b[9..11].iter().all(u8::is_ascii_digit)
        {
            return Some(head);
        }
    }
    // -YYYYMMDD
    if id.len() > 9 {
        let (head, tail) = id.split_at(id.len() - 9);
        let b = tail.as_bytes();
        if b[0] == b'-' && b[1..9].iter().all(u8::is_ascii_digit) {
            return Some(head);
        }
    }
    None
}
