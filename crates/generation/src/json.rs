//! Lenient JSON extraction from model output.
//!
//! Models often wrap JSON in Markdown fences or add a sentence before or
//! after it. This module reduces such output to the outermost JSON value.

use std::sync::LazyLock;

use lectern_core::error::ValidationError;
use regex::Regex;
use serde_json::Value;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("valid regex")
});

/// Parse `raw` as JSON, tolerating fences and surrounding prose.
pub fn extract_json(raw: &str) -> Result<Value, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let first_error = match serde_json::from_str(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e.to_string(),
    };

    for candidate in candidates(trimmed) {
        if let Ok(value) = serde_json::from_str(candidate) {
            return Ok(value);
        }
    }

    Err(ValidationError::InvalidJson(first_error))
}

fn candidates(text: &str) -> Vec<&str> {
    let mut out: Vec<&str> = CODE_FENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();

    // Outermost span for each bracket kind, earliest opener first.
    let mut spans: Vec<(usize, &str)> = [('[', ']'), ('{', '}')]
        .into_iter()
        .filter_map(|(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (end > start).then(|| (start, &text[start..=end]))
        })
        .collect();
    spans.sort_by_key(|(start, _)| *start);
    out.extend(spans.into_iter().map(|(_, span)| span));

    out
}
