//! Shared test helpers for orchestrator and pipeline tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use lectern_core::error::ProviderError;
use lectern_core::{Provider, ProviderRequest, ProviderResponse};
use tokio::time::Instant;

type Responder =
    Box<dyn Fn(&ProviderRequest) -> Result<ProviderResponse, ProviderError> + Send + Sync>;

/// A mock provider whose answers come from a closure.
///
/// Records every request along with its offset from construction, so
/// paused-clock tests can check backoff timing.
pub struct ScriptedProvider {
    responder: Responder,
    calls: Mutex<Vec<(Duration, ProviderRequest)>>,
    created: Instant,
}

impl ScriptedProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ProviderRequest) -> Result<ProviderResponse, ProviderError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            created: Instant::now(),
        }
    }

    pub fn always_ok(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(ProviderResponse::text(text.clone())))
    }

    pub fn always_err(error: ProviderError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Each call takes the next scripted result.
    ///
    /// Panics if more calls are made than results provided.
    pub fn sequence(results: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        let queue = Mutex::new(VecDeque::from(results));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .expect("ScriptedProvider: no more scripted results")
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.calls.lock().unwrap().last().map(|(_, r)| r.clone())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.prompt.clone())
            .collect()
    }

    pub fn call_offsets(&self) -> Vec<Duration> {
        self.calls.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn generate(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let offset = self.created.elapsed();
        let result = (self.responder)(&request);
        self.calls.lock().unwrap().push((offset, request));
        result
    }
}

/// A well-formed response for whichever task the prompt asks for.
pub fn canned_response(prompt: &str) -> Result<ProviderResponse, ProviderError> {
    let text = if prompt.contains("mind map") {
        r#"{"central": "Cells", "branches": [{"topic": "Organelles", "subtopics": ["Nucleus"]}]}"#
    } else if prompt.contains("flashcards") {
        r#"[{"question": "What is ATP?", "answer": "The energy currency of the cell", "difficulty": "easy"}]"#
    } else if prompt.contains("quiz questions") {
        r#"[{"question": "Which organelle makes ATP?", "options": ["Nucleus", "Mitochondrion", "Ribosome", "Golgi"], "correctanswer": 1, "explanation": "Cellular respiration.", "difficulty": "medium"}]"#
    } else if prompt.contains("podcast") {
        "HOST: Today we look inside the cell."
    } else if prompt.contains("video") {
        "[VISUAL: a cell] NARRATOR: Every living thing is made of cells."
    } else {
        "# Executive Summary\nCells are the basic unit of life."
    };
    Ok(ProviderResponse::text(text))
}
