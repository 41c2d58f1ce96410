//! `lectern generate`: run the pipeline over one source file.

use std::path::Path;
use std::sync::Arc;

use lectern_config::AppConfig;
use lectern_core::{AlertSink, GenerationResult, TaskType};
use lectern_generation::{
    GenerationPipeline, InMemoryErrorTracker, InMemoryResultSink, LogAlertSink, NoopAlertSink,
    RunReport,
};
use lectern_providers::build_from_config;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct GenerateOutput {
    run: RunReport,
    results: Vec<TaskResult>,
}

#[derive(Serialize)]
struct TaskResult {
    task: TaskType,
    result: GenerationResult,
}

pub async fn run(
    mut config: AppConfig,
    input: &Path,
    unit: Option<String>,
    tasks: Vec<TaskType>,
    html: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = super::read_source(input, html)?;
    if !tasks.is_empty() {
        config.generation.enabled_tasks = tasks;
    }
    if !config.has_api_key() && config.default_provider != "ollama" {
        warn!(provider = %config.default_provider, "No API key configured; requests will likely be rejected");
    }

    let router = build_from_config(&config);
    let provider = router
        .primary()
        .ok_or_else(|| format!("provider '{}' is not configured", config.default_provider))?;

    let results = Arc::new(InMemoryResultSink::new());
    let errors = Arc::new(InMemoryErrorTracker::new());
    let alerts: Arc<dyn AlertSink> = if config.notifications.enabled {
        Arc::new(LogAlertSink)
    } else {
        Arc::new(NoopAlertSink)
    };

    let pipeline =
        GenerationPipeline::from_config(&config, provider, results.clone(), errors, alerts);

    let unit_id = unit.unwrap_or_else(|| unit_id_for(input));
    let report = pipeline.run(&unit_id, &source).await?;

    let output = GenerateOutput {
        results: results
            .for_unit(&unit_id)
            .await
            .into_iter()
            .map(|(task, result)| TaskResult { task, result })
            .collect(),
        run: report,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Default unit id: the input's file stem.
fn unit_id_for(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("unit")
        .to_string()
}
