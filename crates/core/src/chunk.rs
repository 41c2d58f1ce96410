//! Chunk value types shared by the chunker and the retriever.

use serde::{Deserialize, Serialize};

/// A contiguous segment of source text.
///
/// `ordinal` is the segment's position in the original document. Chunks are
/// built fresh per invocation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub ordinal: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>, ordinal: usize) -> Self {
        Self {
            text: text.into(),
            ordinal,
        }
    }

    /// Number the given texts in order.
    pub fn sequence<I, S>(texts: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk::new(text, ordinal))
            .collect()
    }
}

/// A chunk with its relevance score in `[0, 1]`. Transient, retriever-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_assigns_ordinals() {
        let chunks = Chunk::sequence(["a", "b", "c"]);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], Chunk::new("c", 2));
    }
}
