//! # Lectern Generation
//!
//! Turns a bounded context into a validated [`GenerationResult`]:
//! task prompts, a retrying orchestrator over any [`Provider`], lenient
//! JSON extraction and per-task structural validation. The
//! [`GenerationPipeline`] runs every enabled task type for a unit and
//! hands results, failures and alerts to the configured sinks.
//!
//! [`GenerationResult`]: lectern_core::GenerationResult
//! [`Provider`]: lectern_core::Provider

pub mod json;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod prompt;
pub mod sinks;
pub mod validate;

#[cfg(test)]
mod test_helpers;

pub use json::extract_json;
pub use orchestrator::{GenerationOrchestrator, GenerationOutcome, Phase, RetryPolicy, RetryState};
pub use pipeline::{GenerationPipeline, RunReport, TaskReport, TaskStatus};
pub use prompt::{DEFAULT_ITEM_COUNT, build_prompt};
pub use sinks::{InMemoryErrorTracker, InMemoryResultSink, LogAlertSink, NoopAlertSink};
pub use validate::{BatchReport, Validated, validate};
