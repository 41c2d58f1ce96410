//! Token estimation utilities.
//!
//! Primary heuristic: ~1.3 tokens per word, which tracks subword tokenizers
//! closely on natural-language prose. Text with no Latin words at all (CJK,
//! digit runs, base64) falls back to ~4 bytes per token.

/// Bytes per token assumed wherever a token budget is turned into a length.
pub const CHARS_PER_TOKEN: usize = 4;

const TOKENS_PER_WORD: f64 = 1.3;

/// Estimate the token count for a string.
///
/// Returns 0 for the empty string and at least 1 for anything else.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let words = count_words(text);
    let estimate = if words == 0 {
        text.len() / CHARS_PER_TOKEN
    } else {
        (words as f64 * TOKENS_PER_WORD) as usize
    };

    estimate.max(1)
}

/// Count words as maximal runs of ASCII letters, apostrophes and hyphens.
///
/// A run may not start with a hyphen, so a bare `-` or `--` is not a word.
pub fn count_words(text: &str) -> usize {
    let mut words = 0;
    let mut in_word = false;

    for c in text.chars() {
        let letter = c.is_ascii_alphabetic() || c == '\'';
        if in_word {
            if !(letter || c == '-') {
                in_word = false;
            }
        } else if letter {
            in_word = true;
            words += 1;
        }
    }

    words
}

/// Convert a token budget into a byte length.
pub fn tokens_to_chars(tokens: usize) -> usize {
    tokens.saturating_mul(CHARS_PER_TOKEN)
}
