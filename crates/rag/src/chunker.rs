//! Semantic chunking of arbitrarily large text.
//!
//! # Strategy tiers
//!
//! | Tier | Method | Used when |
//! |------|--------|-----------|
//! | 0 | Whole text as one chunk | Text fits the budget, or every other tier failed |
//! | 1 | Greedy accumulation over semantic boundaries | Boundaries exist |
//! | 2 | Fixed-size sliding window | No usable boundaries, or tier 1 emitted nothing |
//!
//! Each tier returns a `Result`; [`Chunker::chunk`] matches on it and drops
//! to the next simpler tier. Chunking never fails its caller.

use std::sync::LazyLock;

use lectern_config::BoundingConfig;
use lectern_core::Chunk;
use lectern_core::error::ChunkingError;
use regex::Regex;
use tracing::{debug, warn};

use crate::slice::{ceil_boundary, floor_boundary, tail};
use crate::token::{estimate_tokens, tokens_to_chars};

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

pub(crate) static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid regex"));

/// Paragraph boundaries below this count pull in single line breaks.
const MIN_PARAGRAPH_BOUNDARIES: usize = 10;
/// Boundaries below this count pull in sentence ends.
const MIN_LINE_BOUNDARIES: usize = 20;
/// Fixed-size windows snap back to a space found past this fraction.
const WORD_SNAP_FRACTION: f64 = 0.8;

/// Splits text into overlapping chunks bounded by a token budget.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    max_tokens: usize,
    overlap_tokens: usize,
}

impl Chunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_tokens,
            overlap_tokens,
        }
    }

    pub fn from_config(config: &BoundingConfig) -> Self {
        Self::new(config.chunk_size_tokens, config.overlap_tokens)
    }

    /// Chunk `text`, degrading through the strategy tiers as needed.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<Chunk> {
        if text.trim().is_empty() {
            debug!("Chunker received empty content");
            return Vec::new();
        }

        let total = estimate_tokens(text);
        if total <= self.max_tokens {
            debug!(tokens = total, max = self.max_tokens, "Content fits in a single chunk");
            return vec![Chunk::new(text, 0)];
        }

        let chunks = match self.semantic_chunks(text) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(error = %e, "Semantic chunking unavailable, using fixed-size windows");
                match self.fixed_size_chunks(text) {
                    Ok(chunks) if !chunks.is_empty() => chunks,
                    Ok(_) => {
                        warn!("Fixed-size chunking produced nothing, keeping text whole");
                        vec![Chunk::new(text, 0)]
                    }
                    Err(e) => {
                        warn!(error = %e, "Fixed-size chunking failed, keeping text whole");
                        vec![Chunk::new(text, 0)]
                    }
                }
            }
        };

        debug!(tokens = total, chunks = chunks.len(), "Content chunked");
        chunks
    }

    /// Tier 1: greedy accumulation of boundary-delimited segments.
    pub fn semantic_chunks(&self, text: &str) -> Result<Vec<Chunk>, ChunkingError> {
        let boundaries = find_boundaries(text)?;
        let max_chars = tokens_to_chars(self.max_tokens);
        let overlap_chars = tokens_to_chars(self.overlap_tokens);

        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut last = 0;

        for &boundary in &boundaries {
            if boundary <= last {
                continue;
            }
            let segment = &text[last..boundary];
            last = boundary;

            if !current.is_empty() && current.len() + segment.len() > max_chars {
                push_trimmed(&mut chunks, &current);
                current = if overlap_chars > 0 && current.len() > overlap_chars {
                    let mut seeded = tail(&current, overlap_chars).to_string();
                    seeded.push_str(segment);
                    seeded
                } else {
                    segment.to_string()
                };
            } else {
                current.push_str(segment);
            }
        }
        push_trimmed(&mut chunks, &current);

        if chunks.is_empty() {
            return Err(ChunkingError::NoChunks);
        }
        Ok(chunks)
    }

    /// Tier 2: a sliding window of `max_tokens` worth of bytes.
    ///
    /// Window ends snap back to the last space when one sits in the final
    /// 20% of the window, so words are not cut in half.
    pub fn fixed_size_chunks(&self, text: &str) -> Result<Vec<Chunk>, ChunkingError> {
        let window = tokens_to_chars(self.max_tokens);
        if window == 0 {
            return Err(ChunkingError::EmptyWindow);
        }
        let overlap = tokens_to_chars(self.overlap_tokens);
        let len = text.len();

        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < len {
            let mut end = floor_boundary(text, pos.saturating_add(window));
            if end <= pos {
                // A single character wider than the window.
                end = ceil_boundary(text, pos + 1);
            }

            if end < len {
                let size = end - pos;
                if let Some(space) = text[pos..end].rfind(' ') {
                    if space as f64 > size as f64 * WORD_SNAP_FRACTION {
                        end = pos + space;
                    }
                }
            }

            push_trimmed(&mut chunks, &text[pos..end]);
            if end >= len {
                break;
            }

            let size = end - pos;
            let advance = if size > overlap { size - overlap } else { size };
            pos = ceil_boundary(text, pos + advance);
        }

        Ok(chunks)
    }
}

/// Chunk `text` with the given budget. See [`Chunker::chunk`].
pub fn chunk(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<Chunk> {
    Chunker::new(max_tokens, overlap_tokens).chunk(text)
}

/// Locate semantic boundary offsets in priority order.
///
/// Paragraph breaks first; single line breaks when there are fewer than 10;
/// sentence ends when there are still fewer than 20. The result is sorted,
/// deduplicated and always starts at 0 and ends at `text.len()`.
///
/// Returns [`ChunkingError::NoBoundaries`] when nothing but the document
/// start and end was found.
pub fn find_boundaries(text: &str) -> Result<Vec<usize>, ChunkingError> {
    let len = text.len();
    let mut boundaries: Vec<usize> = PARAGRAPH_BREAK
        .find_iter(text)
        .map(|m| m.end())
        .filter(|&offset| offset > 0)
        .collect();

    if boundaries.len() < MIN_PARAGRAPH_BOUNDARIES {
        boundaries.extend(text.match_indices('\n').map(|(i, _)| i + 1));
    }

    if boundaries.len() < MIN_LINE_BOUNDARIES {
        boundaries.extend(SENTENCE_END.find_iter(text).map(|m| m.end()));
    }

    boundaries.push(0);
    boundaries.push(len);
    boundaries.sort_unstable();
    boundaries.dedup();

    if boundaries.len() <= 2 {
        return Err(ChunkingError::NoBoundaries { length: len });
    }
    Ok(boundaries)
}

fn push_trimmed(chunks: &mut Vec<Chunk>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        let ordinal = chunks.len();
        chunks.push(Chunk::new(trimmed, ordinal));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Paragraphs of uniquely tagged sentences, e.g. `P3S2`.
    fn tagged_document(paragraphs: usize, sentences: usize) -> String {
        (0..paragraphs)
            .map(|p| {
                (0..sentences)
                    .map(|s| format!("Marker P{p}S{s} explains how the process works in detail."))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn small_text_is_returned_unchanged() {
        let text = "  A short note.\nNothing to split.  ";
        let chunks = chunk(text, 1000, 100);
        assert_eq!(chunks, vec![Chunk::new(text, 0)]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk("", 1000, 100).is_empty());
        assert!(chunk(" \n\n ", 1000, 100).is_empty());
    }

    #[test]
    fn large_text_splits_in_document_order() {
        let text = tagged_document(30, 6);
        assert!(estimate_tokens(&text) > 200);

        let chunks = chunk(&text, 200, 20);
        assert!(chunks.len() > 1);

        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
            assert!(!c.text.trim().is_empty());
        }

        // Every marker survives, and first appearances are in order.
        let mut last_seen = 0;
        for p in 0..30 {
            for s in 0..6 {
                let marker = format!("P{p}S{s} ");
                let first = chunks
                    .iter()
                    .position(|c| c.text.contains(&marker))
                    .unwrap_or_else(|| panic!("lost {marker}"));
                assert!(first >= last_seen);
                last_seen = first;
            }
        }
    }

    #[test]
    fn chunks_stay_near_budget() {
        let text = tagged_document(30, 6);
        let max_tokens = 200;
        let overlap = 20;
        for c in chunk(&text, max_tokens, overlap) {
            // One segment may spill past the budget, plus the overlap seed.
            assert!(c.text.len() <= tokens_to_chars(max_tokens + overlap) + 100);
        }
    }

    #[test]
    fn next_chunk_is_seeded_with_overlap() {
        let text = tagged_document(20, 5);
        let chunks = chunk(&text, 150, 10);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let prev = &pair[0].text;
            let tail_of_prev = &prev[prev.len() - 20..];
            assert!(
                pair[1].text.contains(tail_of_prev),
                "chunk {} does not carry the end of chunk {}",
                pair[1].ordinal,
                pair[0].ordinal
            );
        }
    }

    #[test]
    fn zero_overlap_has_no_repetition() {
        let text = tagged_document(20, 5);
        let chunks = chunk(&text, 150, 0);
        let marker = "P0S0 ";
        let hits = chunks.iter().filter(|c| c.text.contains(marker)).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn boundaries_include_document_edges() {
        let text = "One.\n\nTwo.\n\nThree.";
        let b = find_boundaries(text).unwrap();
        assert_eq!(b.first(), Some(&0));
        assert_eq!(b.last(), Some(&text.len()));
        assert!(b.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn few_paragraphs_pull_in_line_breaks() {
        let text = "line one\nline two\nline three";
        let b = find_boundaries(text).unwrap();
        assert!(b.contains(&9));
        assert!(b.contains(&18));
    }

    #[test]
    fn sentence_ends_are_boundaries() {
        let text = "First point. Second point! Third point? Done";
        let b = find_boundaries(text).unwrap();
        assert!(b.contains(&13));
        assert!(b.contains(&27));
    }

    #[test]
    fn unbroken_stream_has_no_boundaries() {
        let text = "0123456789".repeat(50);
        assert_eq!(
            find_boundaries(&text),
            Err(ChunkingError::NoBoundaries { length: 500 })
        );
    }

    #[test]
    fn unbroken_stream_falls_back_to_fixed_windows() {
        let text = "0123456789".repeat(2000);
        let max_tokens = 1000;
        assert!(estimate_tokens(&text) > max_tokens);

        let chunks = chunk(&text, max_tokens, 100);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(estimate_tokens(&c.text) <= max_tokens);
        }
        assert!(chunks.last().unwrap().text.ends_with('9'));
    }

    #[test]
    fn fixed_windows_avoid_mid_word_cuts() {
        let vocab = ["alpha", "beta", "gamma", "delta"];
        let text = "alpha beta gamma delta ".repeat(500);
        let chunks = Chunker::new(200, 10).fixed_size_chunks(&text).unwrap();
        assert!(chunks.len() > 1);
        for c in &chunks[..chunks.len() - 1] {
            let last_word = c.text.split_whitespace().last().unwrap();
            assert!(vocab.contains(&last_word), "cut mid-word: {last_word}");
        }
    }

    #[test]
    fn fixed_windows_always_advance() {
        // Overlap larger than the window must not stall the loop.
        let text = "9".repeat(1000);
        let chunks = Chunker::new(10, 50).fixed_size_chunks(&text).unwrap();
        assert_eq!(chunks.len(), 25);
    }

    #[test]
    fn multibyte_text_is_not_split_inside_characters() {
        let text = "é".repeat(5000);
        let chunks = chunk(&text, 100, 10);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().all(|ch| ch == 'é')));
    }

    #[test]
    fn zero_budget_without_boundaries_keeps_text_whole() {
        let text = "12345678".repeat(10);
        let chunks = chunk(&text, 0, 0);
        assert_eq!(chunks, vec![Chunk::new(text, 0)]);
    }
}
