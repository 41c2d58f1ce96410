//! Error types for the Lectern domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error enum. Everything below the
//! generation orchestrator is fail-soft: its errors are matched by the
//! caller and turned into a simpler fallback, never surfaced to users.

use std::time::Duration;

use thiserror::Error;

use crate::task::TaskType;

/// Chunking could not produce segments with the requested strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkingError {
    #[error("no usable semantic boundaries in {length} bytes of text")]
    NoBoundaries { length: usize },

    #[error("semantic pass produced no chunks")]
    NoChunks,

    #[error("chunk window must be at least one character")]
    EmptyWindow,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error("scoring weights are invalid: {0}")]
    InvalidWeights(String),

    #[error("chunk {ordinal} scored a non-finite value")]
    NonFiniteScore { ordinal: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundingError {
    #[error("chunking produced no chunks")]
    NoChunks,

    #[error("retrieval selected no chunks")]
    NoRelevantChunks,

    #[error("combined context is empty")]
    EmptyContext,

    #[error("output ceiling of {0} tokens leaves no room for content")]
    CeilingTooSmall(usize),
}

/// A generation response failed its task-specific structural checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("response is empty")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` has the wrong shape: expected {expected}")]
    WrongShape {
        field: &'static str,
        expected: &'static str,
    },

    #[error("no well-formed items in batch ({dropped} dropped)")]
    NoValidItems { dropped: usize },
}

// --- Surfaced errors ---

/// Errors raised by the external text-generation capability.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Why one generation attempt failed. Both kinds are retried identically.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    #[error("transport: {0}")]
    Transport(#[from] ProviderError),

    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error(
        "{task} generation failed after {attempts} attempt(s) in {:.1}s: {last_error}",
        elapsed.as_secs_f64()
    )]
    Exhausted {
        task: TaskType,
        attempts: u32,
        last_error: String,
        elapsed: Duration,
    },
}

impl GenerationError {
    pub fn task(&self) -> TaskType {
        match self {
            Self::Exhausted { task, .. } => *task,
        }
    }

    /// The terse message recorded against a unit/task pair.
    pub fn last_error(&self) -> &str {
        match self {
            Self::Exhausted { last_error, .. } => last_error,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source text for unit {0} is empty")]
    EmptySource(String),

    #[error("no task types are enabled")]
    NothingEnabled,

    #[error("all {failed} enabled task type(s) failed for unit {unit_id}")]
    AllTasksFailed { unit_id: String, failed: usize },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}
