//! Context assembly: reduce a source text to one bounded generation context.
//!
//! Small inputs pass through untouched. Large inputs are chunked, the most
//! relevant chunks for the task are retrieved and joined, and the result is
//! cut down to the output ceiling. Any failure on that path drops to a plain
//! truncation of the original text, and failing that, to a fixed-length
//! prefix. [`ContextAssembler::bound`] never fails.

use std::time::Instant;

use lectern_config::{AppConfig, BoundingConfig, ScoringConfig};
use lectern_core::TaskType;
use lectern_core::error::BoundingError;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chunker::Chunker;
use crate::retriever::{Retriever, combine};
use crate::slice::head;
use crate::token::{count_words, estimate_tokens, tokens_to_chars};

/// Prefixed to the fallback truncation so readers know content is missing.
pub const TRUNCATION_NOTE: &str = "\n\n[Note: Content has been truncated due to length. \
This is a partial view of the full material.]\n\n";

/// Number of chunks retrieved for a task type.
///
/// Broad and narrative tasks get wider context than focused Q&A tasks.
pub fn max_chunks_for(task: TaskType) -> usize {
    match task {
        TaskType::Report => 8,
        TaskType::Mindmap | TaskType::Podcast | TaskType::Video => 6,
        TaskType::Flashcard | TaskType::Quiz | TaskType::Unknown => 5,
    }
}

/// How a bounded context was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundingStrategy {
    /// Input was under the threshold and returned unchanged.
    Passthrough,
    Retrieved,
    FallbackTruncated,
    Emergency,
}

impl BoundingStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::Retrieved => "retrieved",
            Self::FallbackTruncated => "fallback_truncated",
            Self::Emergency => "emergency",
        }
    }

    /// True when the normal retrieval path failed.
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::FallbackTruncated | Self::Emergency)
    }
}

impl std::fmt::Display for BoundingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bounded context and how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct BoundedContext {
    pub text: String,
    pub task: TaskType,
    pub strategy: BoundingStrategy,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub chunks_total: usize,
    pub chunks_selected: usize,
    /// K passed to the retriever, when retrieval ran.
    pub max_chunks: Option<usize>,
}

/// Size statistics for a source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextStats {
    pub total_tokens: usize,
    pub total_chars: usize,
    pub word_count: usize,
    pub needs_bounding: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_chunk_tokens: Option<usize>,
}

/// Drives chunking, retrieval and truncation for one source text.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    bounding: BoundingConfig,
    chunker: Chunker,
    retriever: Retriever,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(BoundingConfig::default(), ScoringConfig::default())
    }
}

impl ContextAssembler {
    pub fn new(bounding: BoundingConfig, scoring: ScoringConfig) -> Self {
        Self {
            chunker: Chunker::from_config(&bounding),
            retriever: Retriever::new(scoring),
            bounding,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.bounding.clone(), config.scoring.clone())
    }

    pub fn bounding(&self) -> &BoundingConfig {
        &self.bounding
    }

    /// Whether `text` is large enough to need bounding.
    pub fn needs_bounding(&self, text: &str) -> bool {
        !text.is_empty() && estimate_tokens(text) > self.bounding.threshold_tokens
    }

    /// Bound `text` for `task`. Never fails.
    pub fn bound(&self, text: &str, task: TaskType) -> String {
        self.bound_with_report(text, task).text
    }

    /// Bound `text` for `task` and report how it was done.
    pub fn bound_with_report(&self, text: &str, task: TaskType) -> BoundedContext {
        let input_tokens = estimate_tokens(text);

        if !self.needs_bounding(text) {
            debug!(tokens = input_tokens, %task, "Content under threshold, skipping bounding");
            return BoundedContext {
                text: text.to_string(),
                task,
                strategy: BoundingStrategy::Passthrough,
                input_tokens,
                output_tokens: input_tokens,
                chunks_total: 0,
                chunks_selected: 0,
                max_chunks: None,
            };
        }

        let started = Instant::now();
        info!(tokens = input_tokens, %task, "Bounding content");

        match self.try_bound(text, task) {
            Ok(bounded) => {
                info!(
                    %task,
                    chunks = bounded.chunks_selected,
                    tokens = bounded.output_tokens,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Bounding complete"
                );
                bounded
            }
            Err(e) => {
                warn!(error = %e, %task, "Bounding failed, truncating original content");
                self.degrade(text, task, input_tokens)
            }
        }
    }

    /// The retrieval path alone, without fallbacks.
    pub fn try_bound(&self, text: &str, task: TaskType) -> Result<BoundedContext, BoundingError> {
        let ceiling = self.bounding.output_ceiling_tokens;
        if ceiling == 0 {
            return Err(BoundingError::CeilingTooSmall(ceiling));
        }

        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            return Err(BoundingError::NoChunks);
        }

        let k = max_chunks_for(task);
        let selected = self.retriever.retrieve(&chunks, task, k);
        if selected.is_empty() {
            return Err(BoundingError::NoRelevantChunks);
        }

        let mut combined = combine(&selected);
        if combined.trim().is_empty() {
            return Err(BoundingError::EmptyContext);
        }

        let combined_tokens = estimate_tokens(&combined);
        if combined_tokens > ceiling {
            debug!(tokens = combined_tokens, ceiling, "Retrieved context over ceiling, truncating");
            combined = truncate_to_tokens(&combined, ceiling);
        }

        Ok(BoundedContext {
            output_tokens: estimate_tokens(&combined),
            text: combined,
            task,
            strategy: BoundingStrategy::Retrieved,
            input_tokens: estimate_tokens(text),
            chunks_total: chunks.len(),
            chunks_selected: selected.len(),
            max_chunks: Some(k),
        })
    }

    /// Truncate the original text to the ceiling, prefixed with
    /// [`TRUNCATION_NOTE`] when anything was cut.
    pub fn fallback_truncate(&self, text: &str) -> Result<String, BoundingError> {
        let ceiling = self.bounding.output_ceiling_tokens;
        if estimate_tokens(text) <= ceiling {
            return Ok(text.to_string());
        }

        // One spare token absorbs rounding when the two estimates are summed.
        let reserved = estimate_tokens(TRUNCATION_NOTE) + 1;
        if ceiling <= reserved {
            return Err(BoundingError::CeilingTooSmall(ceiling));
        }

        let body = truncate_to_tokens(text, ceiling - reserved);
        if body.is_empty() {
            return Err(BoundingError::EmptyContext);
        }
        warn!(from = text.len(), to = body.len(), "Content truncated");
        Ok(format!("{TRUNCATION_NOTE}{body}"))
    }

    fn degrade(&self, text: &str, task: TaskType, input_tokens: usize) -> BoundedContext {
        let (text, strategy) = match self.fallback_truncate(text) {
            Ok(truncated) => (truncated, BoundingStrategy::FallbackTruncated),
            Err(e) => {
                warn!(
                    error = %e,
                    chars = self.bounding.emergency_chars,
                    "Fallback truncation failed, using emergency prefix"
                );
                (
                    head(text, self.bounding.emergency_chars).to_string(),
                    BoundingStrategy::Emergency,
                )
            }
        };

        BoundedContext {
            output_tokens: estimate_tokens(&text),
            text,
            task,
            strategy,
            input_tokens,
            chunks_total: 0,
            chunks_selected: 0,
            max_chunks: None,
        }
    }

    /// Size statistics, including the chunk layout when bounding is needed.
    pub fn stats(&self, text: &str) -> ContextStats {
        let total_tokens = estimate_tokens(text);
        let needs_bounding = self.needs_bounding(text);

        let (chunk_count, avg_chunk_tokens) = if needs_bounding {
            let count = self.chunker.chunk(text).len();
            let avg = if count > 0 { total_tokens / count } else { 0 };
            (Some(count), Some(avg))
        } else {
            (None, None)
        };

        ContextStats {
            total_tokens,
            total_chars: text.len(),
            word_count: count_words(text),
            needs_bounding,
            chunk_count,
            avg_chunk_tokens,
        }
    }
}

/// Cut `text` so its estimate is at most `max_tokens`.
///
/// The cut prefers the last sentence end within the final 20% of the
/// allowed length, then the last space within the final 10%. If the
/// estimate is still over budget the allowed length shrinks by 10% and the
/// cut is retried.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }

    let mut max_chars = tokens_to_chars(max_tokens);
    loop {
        let cut = cut_at_boundary(text, max_chars);
        if max_chars == 0 || estimate_tokens(cut) <= max_tokens {
            return cut.to_string();
        }
        max_chars = max_chars * 9 / 10;
    }
}

fn cut_at_boundary(text: &str, max_chars: usize) -> &str {
    let window = head(text, max_chars);
    let limit = max_chars as f64;

    if let Some(end) = window.rfind(['.', '?', '!']) {
        if end as f64 > limit * 0.8 {
            return window[..=end].trim();
        }
    }
    if let Some(space) = window.rfind(' ') {
        if space as f64 > limit * 0.9 {
            return window[..space].trim();
        }
    }
    window.trim()
}
