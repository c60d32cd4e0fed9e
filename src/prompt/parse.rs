//! Extraction of a stance score from free-text model replies.
//!
//! Grammar, applied in order:
//!
//! 1. **JSON answer.** If the text contains a JSON object (first `{` to the
//!    last `}`) with a `stance_score` key, that value is the answer: a number,
//!    or a string holding a number. It counts only if it lies in [-1, 1];
//!    otherwise the reply has no answer. Other numbers in the text are
//!    ignored once a `stance_score` key is present.
//! 2. **First number.** Otherwise the first signed decimal token
//!    `[+-−–]?([0-9]+(\.[0-9]+)?|\.[0-9]+)` that is not glued to a letter,
//!    digit or `.` and whose value lies in [-1, 1] is the answer. Tokens out
//!    of range (years, step numbers, percentages above one) are skipped.
//! 3. Otherwise there is no answer.
//!
//! No value is ever clamped or defaulted.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::in_stance_range;
use crate::{Result, StanceError};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+\-−–]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)")
        .expect("number pattern is a valid regex")
});

/// Extract a stance score from a reply, or `None` when the reply has none.
pub fn parse_stance(text: &str) -> Option<f64> {
    match json_stance(text) {
        JsonAnswer::Found(score) => Some(score),
        JsonAnswer::Invalid => None,
        JsonAnswer::Absent => first_number_in_range(text),
    }
}

/// [`parse_stance`] as a `Result`, for recording per-document failures.
pub fn extract_stance(text: &str) -> Result<f64> {
    parse_stance(text).ok_or_else(|| StanceError::Parse(snippet(text)))
}

enum JsonAnswer {
    Found(f64),
    Invalid,
    Absent,
}

fn json_stance(text: &str) -> JsonAnswer {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return JsonAnswer::Absent;
    };
    if end <= start {
        return JsonAnswer::Absent;
    }
    let Ok(serde_json::Value::Object(map)) =
        serde_json::from_str::<serde_json::Value>(&text[start..=end])
    else {
        return JsonAnswer::Absent;
    };
    let Some(value) = map.get("stance_score") else {
        return JsonAnswer::Absent;
    };

    let score = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match score {
        Some(score) if in_stance_range(score) => JsonAnswer::Found(score),
        _ => JsonAnswer::Invalid,
    }
}

fn first_number_in_range(text: &str) -> Option<f64> {
    NUMBER
        .find_iter(text)
        .filter(|m| is_standalone(text, m.start(), m.end()))
        .filter_map(|m| to_f64(m.as_str()))
        .find(|score| in_stance_range(*score))
}

/// A token must not continue a word or a longer number on either side.
fn is_standalone(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    let glued_before = before.is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_');
    // A trailing period ends a sentence unless a digit follows it.
    let glued_after = match after {
        Some('.') => text[end + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_alphanumeric() || c == '_',
        None => false,
    };
    !glued_before && !glued_after
}

fn to_f64(token: &str) -> Option<f64> {
    let normalized = token.replace(['\u{2212}', '\u{2013}'], "-");
    normalized.parse::<f64>().ok()
}

fn snippet(text: &str) -> String {
    const MAX: usize = 80;
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= MAX {
        flat
    } else {
        let cut: String = flat.chars().take(MAX).collect();
        format!("{cut}…")
    }
}
