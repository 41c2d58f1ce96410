//! # Lectern Core
//!
//! Domain types, traits, and stage error definitions for the Lectern
//! content-bounding and generation pipeline. This crate has **no framework
//! dependencies**. It defines the domain model the other crates implement
//! against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (the generation capability, result storage,
//! error tracking, alerting) is a trait here. Implementations live in their
//! respective crates, which keeps the pipeline testable with plain mocks.

pub mod chunk;
pub mod error;
pub mod generation;
pub mod provider;
pub mod sink;
pub mod task;

// Re-export key types at crate root for ergonomics
pub use chunk::{Chunk, ScoredChunk};
pub use generation::{
    Branch, Difficulty, Flashcard, GenerationOptions, GenerationRequest, GenerationResult,
    QuizQuestion,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use sink::{AlertSink, ErrorRecord, ErrorSink, ResultSink};
pub use task::{ResponseShape, TaskType};
