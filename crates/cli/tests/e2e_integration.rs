//! End-to-end tests for the Lectern generation pipeline.
//!
//! These exercise the whole path from a long source text to stored,
//! validated results: bounding, prompting, the provider call with retries,
//! validation, and the result/error/alert sinks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lectern_config::AppConfig;
use lectern_core::error::{PipelineError, ProviderError, SinkError};
use lectern_core::{
    AlertSink, ErrorSink, GenerationResult, Provider, ProviderRequest, ProviderResponse, TaskType,
    Usage,
};
use lectern_generation::{GenerationPipeline, InMemoryErrorTracker, InMemoryResultSink};
use lectern_rag::{BoundingStrategy, ContextAssembler, combine_sources, estimate_tokens, html_section};

// ── Source material ──────────────────────────────────────────────────────

const FILLER: &[&str] = &[
    "The river carried fine silt toward the delta every spring.",
    "Farmers planted rice along the wide banks near the old mill.",
    "Herons waited in the reeds while the water rose slowly.",
    "Boats moved grain downstream to the market towns.",
    "Willow roots held the soil against the current.",
    "Fog settled over the fields before dawn and lifted by noon.",
    "Fishermen mended their nets on the stone quay.",
];

const FINDINGS: &[&str] = &[
    "The survey summary lists each finding with supporting evidence and data.",
    "Our analysis of the research reached a clear conclusion.",
    "An overview of the investigation records every detail of the data.",
    "Each result in the summary rests on evidence from the field research.",
];

/// Paragraphs of `sentences` cycled until `words` words are written.
fn prose(sentences: &[&str], words: usize) -> String {
    let mut out = String::new();
    let mut written = 0;
    let mut i = 0;
    while written < words {
        let sentence = sentences[i % sentences.len()];
        out.push_str(sentence);
        out.push_str(if i % 6 == 5 { "\n\n" } else { " " });
        written += sentence.split_whitespace().count();
        i += 1;
    }
    out.trim().to_string()
}

/// A 10,000-word document: 6,000 words of narrative, then 4,000 words of
/// research findings.
fn long_document() -> String {
    format!("{}\n\n{}", prose(FILLER, 6_000), prose(FINDINGS, 4_000))
}

const SHORT_SOURCE: &str = "Rice grows in flooded paddies. Herons hunt in the shallows.";

// ── Mock provider ────────────────────────────────────────────────────────

/// Splits a prompt into its instructions and the bounded context.
fn split_prompt(prompt: &str) -> (&str, &str) {
    prompt.split_once("\n\nContent:\n").unwrap_or(("", prompt))
}

fn task_of(instructions: &str) -> TaskType {
    if instructions.contains("mind map") {
        TaskType::Mindmap
    } else if instructions.contains("flashcards") {
        TaskType::Flashcard
    } else if instructions.contains("quiz questions") {
        TaskType::Quiz
    } else if instructions.contains("podcast") {
        TaskType::Podcast
    } else if instructions.contains("video") {
        TaskType::Video
    } else {
        TaskType::Report
    }
}

fn well_formed(task: TaskType) -> &'static str {
    match task {
        TaskType::Mindmap => {
            "Sure! Here it is:\n```json\n{\"central\": \"The river delta\", \"branches\": [{\"topic\": \"Farming\", \"subtopics\": [\"Rice\"]}, \"Wildlife\"]}\n```"
        }
        TaskType::Flashcard => {
            r#"[{"question": "Where does silt settle?", "answer": "In the delta", "difficulty": "easy"}, {"question": "Missing answer"}]"#
        }
        TaskType::Quiz => {
            r#"{"questions": [{"question": "What do farmers plant?", "options": ["Wheat", "Rice", "Corn", "Barley"], "correct_answer": "B", "explanation": "Rice needs flooded fields."}]}"#
        }
        TaskType::Podcast => "HOST: Welcome back to the river.",
        TaskType::Video => "[VISUAL: fog over fields] NARRATOR: Dawn on the delta.",
        _ => "# Executive Summary\nThe delta sustains farming and wildlife.",
    }
}

/// How the mock answers a given task type.
#[derive(Clone)]
enum Script {
    Valid,
    /// Always replies with prose that is not JSON.
    Garbage,
    /// Fails with a transport error this many times, then answers.
    FlakyTimes(usize),
    Down,
}

/// A mock provider that answers by task type and records every call.
struct ScriptedProvider {
    scripts: HashMap<TaskType, Script>,
    calls: Mutex<Vec<(TaskType, String)>>,
}

impl ScriptedProvider {
    fn valid() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with(mut self, task: TaskType, script: Script) -> Self {
        self.scripts.insert(task, script);
        self
    }

    fn calls_for(&self, task: TaskType) -> usize {
        self.calls.lock().unwrap().iter().filter(|(t, _)| *t == task).count()
    }

    fn contexts(&self) -> Vec<(TaskType, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let (instructions, context) = split_prompt(&request.prompt);
        let task = task_of(instructions);
        let seen = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((task, context.to_string()));
            calls.iter().filter(|(t, _)| *t == task).count()
        };

        let text = match self.scripts.get(&task).cloned().unwrap_or(Script::Valid) {
            Script::Valid => well_formed(task),
            Script::Garbage => "I'm sorry, I can only answer in prose today.",
            Script::FlakyTimes(n) if seen <= n => {
                return Err(ProviderError::RateLimited { retry_after_secs: 1 });
            }
            Script::FlakyTimes(_) => well_formed(task),
            Script::Down => return Err(ProviderError::Network("connection refused".into())),
        };

        Ok(ProviderResponse {
            text: text.to_string(),
            model: "mock-model".into(),
            usage: Some(Usage {
                prompt_tokens: estimate_tokens(&request.prompt) as u32,
                completion_tokens: estimate_tokens(text) as u32,
                total_tokens: (estimate_tokens(&request.prompt) + estimate_tokens(text)) as u32,
            }),
        })
    }
}

#[derive(Default)]
struct RecordingAlerts {
    subjects: Mutex<Vec<String>>,
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn notify(&self, subject: &str, _message: &str) -> Result<(), SinkError> {
        self.subjects.lock().unwrap().push(subject.to_string());
        Ok(())
    }
}

struct Harness {
    provider: Arc<ScriptedProvider>,
    results: Arc<InMemoryResultSink>,
    errors: Arc<InMemoryErrorTracker>,
    alerts: Arc<RecordingAlerts>,
    pipeline: GenerationPipeline,
}

fn harness(provider: ScriptedProvider) -> Harness {
    harness_with(provider, &AppConfig::default())
}

fn harness_with(provider: ScriptedProvider, config: &AppConfig) -> Harness {
    let provider = Arc::new(provider);
    let results = Arc::new(InMemoryResultSink::new());
    let errors = Arc::new(InMemoryErrorTracker::new());
    let alerts = Arc::new(RecordingAlerts::default());
    let pipeline = GenerationPipeline::from_config(
        config,
        provider.clone(),
        results.clone(),
        errors.clone(),
        alerts.clone(),
    );
    Harness {
        provider,
        results,
        errors,
        alerts,
        pipeline,
    }
}

// ── E2E: Bounding ────────────────────────────────────────────────────────

#[test]
fn e2e_long_document_is_bounded_for_every_task() {
    let doc = long_document();
    assert!(doc.split_whitespace().count() >= 10_000);

    let assembler = ContextAssembler::from_config(&AppConfig::default());
    let stats = assembler.stats(&doc);
    assert!(stats.needs_bounding);
    assert!(stats.chunk_count.unwrap() > 8);

    for task in TaskType::ALL {
        let bounded = assembler.bound_with_report(&doc, task);
        assert_eq!(bounded.strategy, BoundingStrategy::Retrieved, "{task}");
        assert!(bounded.output_tokens <= 3000, "{task}: {}", bounded.output_tokens);
        assert!(bounded.output_tokens < bounded.input_tokens);
    }
}

#[test]
fn e2e_report_reaches_wider_than_quiz() {
    let doc = long_document();
    let assembler = ContextAssembler::default();

    let report = assembler.bound_with_report(&doc, TaskType::Report);
    let quiz = assembler.bound_with_report(&doc, TaskType::Quiz);

    assert_eq!(report.max_chunks, Some(8));
    assert_eq!(quiz.max_chunks, Some(5));
    assert!(report.chunks_selected > quiz.chunks_selected);

    // The findings sit deep in the document; only report retrieval pulls
    // them forward.
    assert!(report.text.contains("evidence"));
    assert!(!quiz.text.contains("evidence"));
}

#[test]
fn e2e_short_source_passes_through() {
    let assembler = ContextAssembler::default();
    let bounded = assembler.bound_with_report(SHORT_SOURCE, TaskType::Video);
    assert_eq!(bounded.strategy, BoundingStrategy::Passthrough);
    assert_eq!(bounded.text, SHORT_SOURCE);
}

// ── E2E: Full pipeline ───────────────────────────────────────────────────

#[tokio::test]
async fn e2e_pipeline_generates_all_tasks_within_budget() {
    let h = harness(ScriptedProvider::valid());
    let report = h.pipeline.run("chapter-1", &long_document()).await.unwrap();

    assert_eq!(report.unit_id, "chapter-1");
    assert_eq!(report.succeeded(), 6);
    assert_eq!(h.results.len().await, 6);

    // Every call carried a bounded context.
    let contexts = h.provider.contexts();
    assert_eq!(contexts.len(), 6);
    for (task, context) in &contexts {
        assert!(estimate_tokens(context) <= 3000, "{task}: {}", estimate_tokens(context));
    }
    let order: Vec<TaskType> = contexts.iter().map(|(t, _)| *t).collect();
    assert_eq!(order, TaskType::ALL.to_vec());

    // Lenient parsing and normalization held up.
    let Some(GenerationResult::MindMap { central, branches }) =
        h.results.get("chapter-1", TaskType::Mindmap).await
    else {
        panic!("mind map missing");
    };
    assert_eq!(central, "The river delta");
    assert_eq!(branches.len(), 2);

    let Some(GenerationResult::FlashcardSet { items }) =
        h.results.get("chapter-1", TaskType::Flashcard).await
    else {
        panic!("flashcards missing");
    };
    assert_eq!(items.len(), 1);

    let Some(GenerationResult::QuizSet { items }) = h.results.get("chapter-1", TaskType::Quiz).await
    else {
        panic!("quiz missing");
    };
    assert_eq!(items[0].correct_index, 1);
    assert_eq!(items[0].options[1], "Rice");

    assert!(h.alerts.subjects.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn e2e_exhausted_task_is_recorded_and_siblings_survive() {
    let h = harness(ScriptedProvider::valid().with(TaskType::Quiz, Script::Garbage));
    let started = tokio::time::Instant::now();

    let report = h.pipeline.run("chapter-2", &long_document()).await.unwrap();

    assert_eq!(report.succeeded(), 5);
    assert_eq!(report.failed(), 1);
    assert_eq!(h.provider.calls_for(TaskType::Quiz), 3);
    // 1s + 2s of backoff, nothing after the final attempt.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_secs(4), "{elapsed:?}");

    let marker = h
        .errors
        .last_error("chapter-2", TaskType::Quiz)
        .await
        .unwrap()
        .expect("quiz failure recorded");
    assert!(marker.message.contains("JSON"));
    assert!(h.results.get("chapter-2", TaskType::Quiz).await.is_none());

    let subjects = h.alerts.subjects.lock().unwrap().clone();
    assert_eq!(subjects.len(), 1);
    assert!(subjects[0].contains("quiz"));
}

#[tokio::test(start_paused = true)]
async fn e2e_flaky_provider_recovers_within_retry_budget() {
    let h = harness(ScriptedProvider::valid().with(TaskType::Report, Script::FlakyTimes(2)));
    h.errors
        .record("chapter-3", TaskType::Report, "failed last night")
        .await
        .unwrap();

    let report = h.pipeline.run("chapter-3", SHORT_SOURCE).await.unwrap();

    assert_eq!(report.succeeded(), 6);
    assert_eq!(h.provider.calls_for(TaskType::Report), 3);
    assert!(h.results.get("chapter-3", TaskType::Report).await.is_some());
    assert!(h.errors.last_error("chapter-3", TaskType::Report).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn e2e_provider_outage_fails_the_run() {
    let mut provider = ScriptedProvider::valid();
    for task in TaskType::ALL {
        provider = provider.with(task, Script::Down);
    }
    let mut config = AppConfig::default();
    config.generation.enabled_tasks = vec![TaskType::Report, TaskType::Quiz];
    let h = harness_with(provider, &config);

    let err = h.pipeline.run("chapter-4", SHORT_SOURCE).await.unwrap_err();
    assert!(matches!(err, PipelineError::AllTasksFailed { failed: 2, .. }));
    assert_eq!(h.errors.count().await, 2);
    assert_eq!(h.results.len().await, 0);
}

#[tokio::test]
async fn e2e_html_chapters_feed_the_pipeline() {
    let chapters = [
        html_section(
            Some("Spring floods"),
            "<p>The river carried fine silt toward the delta.</p><img alt=\"Map of the delta\">",
        ),
        html_section(None, "   "),
        html_section(
            Some("Harvest"),
            "<ul><li>Rice</li><li>Millet</li></ul><p>Boats moved grain downstream.</p>",
        ),
    ];
    let source = combine_sources(&chapters);
    assert!(source.contains("[Images in this section: Map of the delta]"));
    assert!(source.contains("• Rice"));

    let mut config = AppConfig::default();
    config.generation.enabled_tasks = vec![TaskType::Report];
    let h = harness_with(ScriptedProvider::valid(), &config);
    h.pipeline.run("unit-html", &source).await.unwrap();

    let contexts = h.provider.contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].1, source);
}
