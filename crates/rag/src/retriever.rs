//! Task-aware lexical retrieval over chunks.
//!
//! Scores are cheap and explainable: keyword density weighted by keyword
//! length, blended with a preference for substantial chunks. Task types with
//! no keyword table use a generic length/sentence-count score instead.

use lectern_config::ScoringConfig;
use lectern_core::error::RetrievalError;
use lectern_core::{Chunk, ScoredChunk, TaskType};
use tracing::{debug, warn};

use crate::chunker::SENTENCE_END;

const MINDMAP_KEYWORDS: &[&str] = &[
    "concept",
    "relationship",
    "key",
    "main",
    "topic",
    "idea",
    "principle",
    "theory",
    "definition",
    "category",
    "type",
    "classification",
    "structure",
];

const FLASHCARD_KEYWORDS: &[&str] = &[
    "definition",
    "term",
    "important",
    "remember",
    "key",
    "concept",
    "fact",
    "meaning",
    "describe",
    "explain",
    "what is",
    "who is",
    "when",
    "where",
];

const QUIZ_KEYWORDS: &[&str] = &[
    "fact",
    "process",
    "explain",
    "describe",
    "how",
    "why",
    "what",
    "which",
    "correct",
    "incorrect",
    "true",
    "false",
    "example",
    "demonstrate",
    "show",
];

const REPORT_KEYWORDS: &[&str] = &[
    "summary",
    "analysis",
    "conclusion",
    "finding",
    "result",
    "evidence",
    "data",
    "research",
    "study",
    "investigation",
    "overview",
    "detail",
];

const PODCAST_KEYWORDS: &[&str] = &[
    "story",
    "narrative",
    "explain",
    "discuss",
    "explore",
    "understand",
    "learn",
    "discover",
    "journey",
    "example",
    "case",
    "scenario",
    "context",
];

const VIDEO_KEYWORDS: &[&str] = &[
    "visual",
    "show",
    "demonstrate",
    "illustrate",
    "example",
    "diagram",
    "chart",
    "graph",
    "image",
    "picture",
    "scene",
    "display",
    "present",
];

/// The keyword table for a task type. Empty for unknown task types.
pub fn keywords(task: TaskType) -> &'static [&'static str] {
    match task {
        TaskType::Mindmap => MINDMAP_KEYWORDS,
        TaskType::Flashcard => FLASHCARD_KEYWORDS,
        TaskType::Quiz => QUIZ_KEYWORDS,
        TaskType::Report => REPORT_KEYWORDS,
        TaskType::Podcast => PODCAST_KEYWORDS,
        TaskType::Video => VIDEO_KEYWORDS,
        TaskType::Unknown => &[],
    }
}

/// Selects the most relevant chunks for a task, preserving document order.
#[derive(Debug, Clone, Default)]
pub struct Retriever {
    scoring: ScoringConfig,
}

impl Retriever {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    /// Return at most `max_chunks` chunks, as a subsequence of `chunks`.
    ///
    /// When ranking fails outright the first `max_chunks` chunks are returned.
    pub fn retrieve(&self, chunks: &[Chunk], task: TaskType, max_chunks: usize) -> Vec<Chunk> {
        if chunks.len() <= max_chunks {
            debug!(chunks = chunks.len(), max = max_chunks, "Chunk count within K, keeping all");
            return chunks.to_vec();
        }

        let mut ranked = match self.rank(chunks, task) {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, %task, "Ranking failed, keeping the first {max_chunks} chunks");
                return chunks[..max_chunks].to_vec();
            }
        };

        ranked.truncate(max_chunks);
        ranked.sort_by_key(|scored| scored.chunk.ordinal);

        debug!(
            %task,
            total = chunks.len(),
            selected = ranked.len(),
            "Retrieved relevant chunks"
        );
        ranked.into_iter().map(|scored| scored.chunk).collect()
    }

    /// Score every chunk and order by score descending, earlier chunks first
    /// on ties.
    ///
    /// A chunk whose score cannot be computed scores 0.
    pub fn rank(&self, chunks: &[Chunk], task: TaskType) -> Result<Vec<ScoredChunk>, RetrievalError> {
        self.check_weights(task)?;

        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|chunk| {
                let score = self.score_chunk(chunk, task).unwrap_or_else(|e| {
                    warn!(error = %e, "Scoring failed, assigning 0");
                    0.0
                });
                ScoredChunk {
                    chunk: chunk.clone(),
                    score,
                }
            })
            .collect();

        // Stable sort keeps the original order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }

    /// Relevance of one chunk for a task, in `[0, 1]`.
    pub fn score_chunk(&self, chunk: &Chunk, task: TaskType) -> Result<f64, RetrievalError> {
        if chunk.text.is_empty() {
            return Ok(0.0);
        }

        let table = keywords(task);
        let raw = if table.is_empty() {
            self.general_score(&chunk.text)
        } else {
            self.keyword_score(&chunk.text, table)
        };

        if !raw.is_finite() {
            return Err(RetrievalError::NonFiniteScore {
                ordinal: chunk.ordinal,
            });
        }
        Ok(raw.clamp(0.0, 1.0))
    }

    fn keyword_score(&self, text: &str, table: &[&str]) -> f64 {
        // ASCII folding keeps `lower` byte-aligned with `text`.
        let lower = text.to_ascii_lowercase();
        let length = text.len() as f64;

        let weight: usize = table
            .iter()
            .map(|keyword| lower.matches(keyword).count() * keyword.len())
            .sum();

        let density = if weight > 0 {
            (weight as f64 / length * self.scoring.density_amplification).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let length_score = (length / self.scoring.ideal_length_chars as f64).min(1.0);

        density * self.scoring.keyword_weight + length_score * self.scoring.length_weight
    }

    fn general_score(&self, text: &str) -> f64 {
        let ideal = self.scoring.general_ideal_length_chars as f64;
        let diff = (text.len() as f64 - ideal).abs();
        let length_score = (1.0 - diff / ideal).max(0.0);

        let sentences = SENTENCE_END.find_iter(text).count() as f64;
        let sentence_score = (sentences / self.scoring.sentence_saturation as f64).min(1.0);

        length_score * self.scoring.general_length_weight
            + sentence_score * self.scoring.general_sentence_weight
    }

    fn check_weights(&self, task: TaskType) -> Result<(), RetrievalError> {
        let s = &self.scoring;
        let (a, b, label) = if keywords(task).is_empty() {
            (s.general_length_weight, s.general_sentence_weight, "general")
        } else {
            (s.keyword_weight, s.length_weight, "keyword")
        };

        if !(a.is_finite() && b.is_finite()) || a < 0.0 || b < 0.0 || a + b <= 0.0 {
            return Err(RetrievalError::InvalidWeights(format!(
                "{label} weights {a} and {b} must be non-negative with a positive sum"
            )));
        }
        Ok(())
    }
}

/// Join chunks with a blank line between them.
pub fn combine(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
