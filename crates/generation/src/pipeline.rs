//! Per-unit generation pipeline.
//!
//! Runs every enabled task type for one content unit, one at a time:
//! bound → prompt → generate → store. A failed task is recorded and
//! alerted on, and the run moves on to the next task. The run as a whole
//! only fails when every enabled task failed.

use std::sync::Arc;

use lectern_config::{AppConfig, GenerationConfig};
use lectern_core::error::{GenerationError, PipelineError};
use lectern_core::{
    AlertSink, ErrorSink, GenerationOptions, GenerationRequest, Provider, ResultSink, TaskType,
};
use lectern_rag::{BoundedContext, BoundingStrategy, ContextAssembler};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::orchestrator::{GenerationOrchestrator, GenerationOutcome};

/// What happened to one task type in a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded { attempts: u32, items: usize },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub task: TaskType,
    pub strategy: BoundingStrategy,
    pub context_tokens: usize,
    #[serde(flatten)]
    pub status: TaskStatus,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, TaskStatus::Succeeded { .. })
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub unit_id: String,
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.tasks.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.tasks.len() - self.succeeded()
    }
}

/// Drives all enabled task types for a unit.
pub struct GenerationPipeline {
    assembler: ContextAssembler,
    orchestrator: GenerationOrchestrator,
    results: Arc<dyn ResultSink>,
    errors: Arc<dyn ErrorSink>,
    alerts: Arc<dyn AlertSink>,
    generation: GenerationConfig,
    notifications_enabled: bool,
}

impl GenerationPipeline {
    pub fn new(
        assembler: ContextAssembler,
        orchestrator: GenerationOrchestrator,
        results: Arc<dyn ResultSink>,
        errors: Arc<dyn ErrorSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            assembler,
            orchestrator,
            results,
            errors,
            alerts,
            generation: GenerationConfig::default(),
            notifications_enabled: true,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        results: Arc<dyn ResultSink>,
        errors: Arc<dyn ErrorSink>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self::new(
            ContextAssembler::from_config(config),
            GenerationOrchestrator::from_config(provider, config),
            results,
            errors,
            alerts,
        )
        .with_generation(config.generation.clone())
        .with_notifications(config.notifications.enabled)
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Known enabled task types, deduplicated, in pipeline order.
    pub fn enabled_tasks(&self) -> Vec<TaskType> {
        TaskType::ALL
            .into_iter()
            .filter(|task| self.generation.enabled_tasks.contains(task))
            .collect()
    }

    /// Options for one task, from the generation settings.
    pub fn options_for(&self, task: TaskType) -> GenerationOptions {
        GenerationOptions {
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
            item_count: self.generation.item_count(task),
        }
    }

    /// Run every enabled task type for `unit_id`.
    pub async fn run(&self, unit_id: &str, source: &str) -> Result<RunReport, PipelineError> {
        if source.trim().is_empty() {
            return Err(PipelineError::EmptySource(unit_id.to_string()));
        }
        let tasks = self.enabled_tasks();
        if tasks.is_empty() {
            return Err(PipelineError::NothingEnabled);
        }

        let run_id = Uuid::new_v4();
        info!(%run_id, unit_id, tasks = tasks.len(), "Starting generation run");

        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            let bounded = self.bound(unit_id, source, task).await;
            let status = match self.generate_bounded(&bounded).await {
                Ok(outcome) => self.accept(unit_id, outcome).await,
                Err(e) => {
                    self.reject(unit_id, &e).await;
                    TaskStatus::Failed {
                        error: e.last_error().to_string(),
                    }
                }
            };
            reports.push(TaskReport {
                task,
                strategy: bounded.strategy,
                context_tokens: bounded.output_tokens,
                status,
            });
        }

        let report = RunReport {
            run_id,
            unit_id: unit_id.to_string(),
            tasks: reports,
        };
        info!(
            %run_id,
            unit_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Generation run finished"
        );

        if report.succeeded() == 0 {
            return Err(PipelineError::AllTasksFailed {
                unit_id: unit_id.to_string(),
                failed: report.failed(),
            });
        }
        Ok(report)
    }

    /// Bound, prompt and generate a single task type. Nothing is stored.
    pub async fn run_task(
        &self,
        unit_id: &str,
        source: &str,
        task: TaskType,
    ) -> Result<GenerationOutcome, GenerationError> {
        let bounded = self.bound(unit_id, source, task).await;
        self.generate_bounded(&bounded).await
    }

    async fn bound(&self, unit_id: &str, source: &str, task: TaskType) -> BoundedContext {
        let bounded = self.assembler.bound_with_report(source, task);
        if bounded.strategy.is_degraded() {
            self.alert(
                &format!("Content bounding fell back for unit {unit_id}"),
                &format!(
                    "Bounding for {task} used {} ({} of {} tokens kept)",
                    bounded.strategy, bounded.output_tokens, bounded.input_tokens
                ),
            )
            .await;
        }
        bounded
    }

    async fn generate_bounded(
        &self,
        bounded: &BoundedContext,
    ) -> Result<GenerationOutcome, GenerationError> {
        let request = GenerationRequest::new(bounded.task, bounded.text.clone())
            .with_options(self.options_for(bounded.task));
        self.orchestrator.generate(&request).await
    }

    async fn accept(&self, unit_id: &str, outcome: GenerationOutcome) -> TaskStatus {
        let task = outcome.task;
        if let Err(e) = self.results.store(unit_id, task, &outcome.result).await {
            let message = format!("failed to store {task} result: {e}");
            warn!(unit_id, %task, error = %e, "Storing result failed");
            self.record_failure(unit_id, task, &message).await;
            return TaskStatus::Failed { error: message };
        }
        if let Err(e) = self.errors.clear(unit_id, task).await {
            warn!(unit_id, %task, error = %e, "Clearing error marker failed");
        }
        TaskStatus::Succeeded {
            attempts: outcome.attempts,
            items: outcome.result.len(),
        }
    }

    async fn reject(&self, unit_id: &str, error: &GenerationError) {
        warn!(unit_id, task = %error.task(), error = %error, "Task failed, continuing with the next");
        self.record_failure(unit_id, error.task(), error.last_error())
            .await;
    }

    async fn record_failure(&self, unit_id: &str, task: TaskType, message: &str) {
        if let Err(e) = self.errors.record(unit_id, task, message).await {
            warn!(unit_id, %task, error = %e, "Recording error marker failed");
        }
        self.alert(
            &format!("{task} generation failed for unit {unit_id}"),
            message,
        )
        .await;
    }

    async fn alert(&self, subject: &str, message: &str) {
        if !self.notifications_enabled {
            return;
        }
        if let Err(e) = self.alerts.notify(subject, message).await {
            warn!(subject, error = %e, "Alert delivery failed");
        }
    }
}
