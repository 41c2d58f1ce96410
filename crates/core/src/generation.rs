//! Generation request and result types.
//!
//! A [`GenerationResult`] only exists once a response has passed its
//! task-specific structural validation, so sinks never see malformed data.

use serde::{Deserialize, Serialize};

use crate::task::TaskType;

/// Per-call generation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// How many items a collection task should ask for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<usize>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2000
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            item_count: None,
        }
    }
}

/// Everything needed to run one task against one bounded context.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: TaskType,
    pub bounded_context: String,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(task: TaskType, bounded_context: impl Into<String>) -> Self {
        Self {
            task,
            bounded_context: bounded_context.into(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Lenient parse; anything unrecognised is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" | "beginner" | "low" => Some(Self::Easy),
            "medium" | "moderate" | "intermediate" => Some(Self::Medium),
            "hard" | "difficult" | "advanced" | "high" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub topic: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
}

/// A multiple-choice question with exactly four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: [String; 4],
    /// Index into `options`, always `0..=3`.
    pub correct_index: u8,
    pub explanation: String,
    pub difficulty: Difficulty,
}

/// A validated generation result, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationResult {
    MindMap { central: String, branches: Vec<Branch> },
    FreeText { body: String },
    FlashcardSet { items: Vec<Flashcard> },
    QuizSet { items: Vec<QuizQuestion> },
}

impl GenerationResult {
    /// Item count for collection results, branch count for mind maps, 1 for text.
    pub fn len(&self) -> usize {
        match self {
            Self::MindMap { branches, .. } => branches.len(),
            Self::FreeText { .. } => 1,
            Self::FlashcardSet { items } => items.len(),
            Self::QuizSet { items } => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
