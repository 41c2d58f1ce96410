//! Generation orchestrator: prompt, call, validate and retry.
//!
//! One call to [`GenerationOrchestrator::generate`] walks the state machine
//!
//! ```text
//! Building → Calling → Validating → Succeeded
//!               ↑          │
//!               └─ RetryWait ← (transport or validation failure)
//!                          │
//!                          └→ Failed (attempts exhausted)
//! ```
//!
//! Transport and validation failures are retried identically. Backoff is
//! `initial_delay × 2^(attempt-1)`; there is no wait after the last attempt.

use std::sync::Arc;
use std::time::Duration;

use lectern_config::{AppConfig, RetryConfig};
use lectern_core::error::{AttemptError, GenerationError};
use lectern_core::{
    GenerationRequest, GenerationResult, Provider, ProviderRequest, TaskType, Usage,
};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::prompt::build_prompt;
use crate::validate::{BatchReport, Validated, validate};

/// Attempt budget and backoff for one generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.initial_delay())
    }

    /// Wait after the given failed attempt (1-based): 1s, 2s, 4s, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay.saturating_mul(1u32 << exponent)
    }
}

/// Where an invocation is in its lifecycle. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Building,
    Calling,
    Validating,
    RetryWait,
    Succeeded,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Building => "building",
            Self::Calling => "calling",
            Self::Validating => "validating",
            Self::RetryWait => "retry_wait",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Attempt bookkeeping for a single invocation.
#[derive(Debug, Default)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<AttemptError>,
}

/// A successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub task: TaskType,
    pub result: GenerationResult,
    pub attempts: u32,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchReport>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Runs one task against the generation capability.
pub struct GenerationOrchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    system: Option<String>,
    retry: RetryPolicy,
}

impl GenerationOrchestrator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            system: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self::new(provider, config.default_model.clone())
            .with_retry(RetryPolicy::from_config(&config.retry))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Generate a validated result for `request`, retrying with backoff.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome, GenerationError> {
        let task = request.task;
        let started = Instant::now();

        debug!(%task, phase = %Phase::Building, "Building prompt");
        let provider_request = ProviderRequest {
            model: self.model.clone(),
            system: self.system.clone(),
            prompt: build_prompt(request),
            temperature: request.options.temperature,
            max_tokens: Some(request.options.max_tokens),
        };

        let mut state = RetryState::default();
        loop {
            state.attempt += 1;

            match self.attempt(task, &provider_request, request.options.item_count).await {
                Ok((validated, model, usage)) => {
                    let elapsed = started.elapsed();
                    if let Some(batch) = validated.batch.filter(BatchReport::is_short) {
                        warn!(
                            %task,
                            accepted = batch.accepted,
                            dropped = batch.dropped,
                            requested = batch.requested,
                            "Partial batch accepted"
                        );
                    }
                    info!(
                        %task,
                        phase = %Phase::Succeeded,
                        attempt = state.attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Generation succeeded"
                    );
                    return Ok(GenerationOutcome {
                        task,
                        result: validated.result,
                        attempts: state.attempt,
                        elapsed,
                        batch: validated.batch,
                        model,
                        usage,
                    });
                }
                Err(e) => {
                    warn!(
                        %task,
                        attempt = state.attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Generation attempt failed"
                    );
                    state.last_error = Some(e);
                }
            }

            if state.attempt >= self.retry.max_attempts {
                break;
            }

            let delay = self.retry.delay_after(state.attempt);
            debug!(
                %task,
                phase = %Phase::RetryWait,
                delay_ms = delay.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::time::sleep(delay).await;
        }

        let elapsed = started.elapsed();
        let last_error = state
            .last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".into());
        warn!(
            %task,
            phase = %Phase::Failed,
            attempts = state.attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            "Generation failed"
        );

        Err(GenerationError::Exhausted {
            task,
            attempts: state.attempt,
            last_error,
            elapsed,
        })
    }

    async fn attempt(
        &self,
        task: TaskType,
        request: &ProviderRequest,
        requested: Option<usize>,
    ) -> Result<(Validated, String, Option<Usage>), AttemptError> {
        debug!(%task, phase = %Phase::Calling, provider = self.provider.name(), "Calling provider");
        let response = self.provider.generate(request.clone()).await?;

        debug!(%task, phase = %Phase::Validating, bytes = response.text.len(), "Validating response");
        let validated = validate(task, &response.text, requested)?;

        Ok((validated, response.model, response.usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use lectern_core::error::{ProviderError, ValidationError};
    use lectern_core::{GenerationOptions, ProviderResponse};

    fn orchestrator(provider: &Arc<ScriptedProvider>) -> GenerationOrchestrator {
        GenerationOrchestrator::new(provider.clone(), "test-model")
    }

    #[test]
    fn backoff_doubles_from_initial_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[test]
    fn backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert!(policy.delay_after(90) >= policy.delay_after(40));
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_provider_is_tried_exactly_max_attempts() {
        let provider = Arc::new(ScriptedProvider::always_err(ProviderError::Network(
            "connection refused".into(),
        )));
        let request = GenerationRequest::new(TaskType::Report, "context");

        let err = orchestrator(&provider).generate(&request).await.unwrap_err();

        assert_eq!(provider.call_count(), 3);
        let GenerationError::Exhausted {
            task,
            attempts,
            last_error,
            elapsed,
        } = err;
        assert_eq!(task, TaskType::Report);
        assert_eq!(attempts, 3);
        assert!(last_error.contains("connection refused"), "{last_error}");
        // 1s + 2s of backoff; no wait after the final attempt.
        assert_eq!(elapsed, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_waits_follow_exponential_schedule() {
        let provider = Arc::new(ScriptedProvider::always_err(ProviderError::Timeout("slow".into())));
        let orchestrator = orchestrator(&provider).with_retry(RetryPolicy::new(4, Duration::from_secs(1)));

        let err = orchestrator
            .generate(&GenerationRequest::new(TaskType::Podcast, "c"))
            .await
            .unwrap_err();

        let GenerationError::Exhausted { elapsed, .. } = err;
        assert_eq!(elapsed, Duration::from_secs(1 + 2 + 4));
        assert_eq!(
            provider.call_offsets(),
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3),
                Duration::from_secs(7)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failures_are_retried_like_transport_errors() {
        let provider = Arc::new(ScriptedProvider::sequence(vec![
            Ok(ProviderResponse::text("not json at all")),
            Err(ProviderError::RateLimited { retry_after_secs: 1 }),
            Ok(ProviderResponse::text(r#"{"central": "Cells", "branches": ["Nucleus"]}"#)),
        ]));

        let outcome = orchestrator(&provider)
            .generate(&GenerationRequest::new(TaskType::Mindmap, "c"))
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.elapsed, Duration::from_secs(3));
        assert!(matches!(outcome.result, GenerationResult::MindMap { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_validation_reports_last_validation_error() {
        let provider = Arc::new(ScriptedProvider::always_ok("   "));
        let err = orchestrator(&provider)
            .generate(&GenerationRequest::new(TaskType::Video, "c"))
            .await
            .unwrap_err();
        assert!(err.last_error().contains(&ValidationError::Empty.to_string()));
    }

    #[tokio::test]
    async fn first_success_makes_one_call() {
        let provider = Arc::new(ScriptedProvider::always_ok("HOST: Welcome to the show."));
        let outcome = orchestrator(&provider)
            .generate(&GenerationRequest::new(TaskType::Podcast, "c"))
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 1);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            outcome.result,
            GenerationResult::FreeText { body: "HOST: Welcome to the show.".into() }
        );
    }

    #[tokio::test]
    async fn request_carries_prompt_and_options() {
        let provider = Arc::new(ScriptedProvider::always_ok(
            r#"[{"question": "Q", "answer": "A", "difficulty": "hard"}]"#,
        ));
        let request = GenerationRequest::new(TaskType::Flashcard, "Mitochondria notes").with_options(
            GenerationOptions {
                temperature: 0.2,
                max_tokens: 512,
                item_count: Some(3),
            },
        );

        let outcome = orchestrator(&provider)
            .with_system("You write study material.")
            .generate(&request)
            .await
            .unwrap();

        let sent = provider.last_request().unwrap();
        assert_eq!(sent.model, "test-model");
        assert_eq!(sent.system.as_deref(), Some("You write study material."));
        assert!(sent.prompt.starts_with("Generate 3 educational flashcards"));
        assert!(sent.prompt.ends_with("Mitochondria notes"));
        assert!((sent.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(sent.max_tokens, Some(512));

        let batch = outcome.batch.unwrap();
        assert_eq!(batch.accepted, 1);
        assert!(batch.is_short());
    }

    #[tokio::test]
    async fn unknown_task_sends_context_verbatim() {
        let provider = Arc::new(ScriptedProvider::always_ok("done"));
        orchestrator(&provider)
            .generate(&GenerationRequest::new(TaskType::Unknown, "just this"))
            .await
            .unwrap();
        assert_eq!(provider.last_request().unwrap().prompt, "just this");
    }
}
