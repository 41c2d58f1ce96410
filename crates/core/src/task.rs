//! Task types: the kinds of derived artifact generated from a unit's text.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The artifact being generated.
///
/// The set is closed. Anything unrecognised parses to [`TaskType::Unknown`],
/// which every stage treats as a generic, pass-through task rather than an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Mindmap,
    Podcast,
    Video,
    Report,
    Flashcard,
    Quiz,
    #[serde(other)]
    Unknown,
}

/// How a task's response is shaped on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A single JSON object (mind map).
    JsonObject,
    /// A JSON array of items, tolerant of individual bad items.
    JsonCollection,
    /// Free text (scripts, reports).
    FreeText,
}

impl TaskType {
    /// Every known task type, in pipeline execution order.
    pub const ALL: [TaskType; 6] = [
        TaskType::Mindmap,
        TaskType::Podcast,
        TaskType::Video,
        TaskType::Report,
        TaskType::Flashcard,
        TaskType::Quiz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mindmap => "mindmap",
            Self::Podcast => "podcast",
            Self::Video => "video",
            Self::Report => "report",
            Self::Flashcard => "flashcard",
            Self::Quiz => "quiz",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a task name, case-insensitively. Never fails.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mindmap" | "mind_map" => Self::Mindmap,
            "podcast" => Self::Podcast,
            "video" => Self::Video,
            "report" => Self::Report,
            "flashcard" | "flashcards" => Self::Flashcard,
            "quiz" => Self::Quiz,
            _ => Self::Unknown,
        }
    }

    pub fn shape(&self) -> ResponseShape {
        match self {
            Self::Mindmap => ResponseShape::JsonObject,
            Self::Flashcard | Self::Quiz => ResponseShape::JsonCollection,
            Self::Podcast | Self::Video | Self::Report | Self::Unknown => ResponseShape::FreeText,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}
