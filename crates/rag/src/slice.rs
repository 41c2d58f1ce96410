//! Byte-offset helpers that never split a UTF-8 character.

/// Largest char boundary `<= idx`, clamped to the string length.
pub(crate) fn floor_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= idx`, clamped to the string length.
pub(crate) fn ceil_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    let mut i = idx;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// At most `max_bytes` from the start of `s`.
pub(crate) fn head(s: &str, max_bytes: usize) -> &str {
    &s[..floor_boundary(s, max_bytes)]
}

/// At most `max_bytes` from the end of `s`.
pub(crate) fn tail(s: &str, max_bytes: usize) -> &str {
    &s[ceil_boundary(s, s.len().saturating_sub(max_bytes))..]
}
