//! Task-specific structural validation of raw responses.
//!
//! Only output that passes here becomes a [`GenerationResult`].

use lectern_core::error::ValidationError;
use lectern_core::{GenerationResult, ResponseShape, TaskType};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::json::extract_json;
use crate::normalize::{
    BRANCHES_ALIASES, CENTRAL_ALIASES, COLLECTION_KEYS, first_present, normalize_branch,
    normalize_flashcard, normalize_quiz_item,
};

/// Soft outcome of a collection task: how many items survived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub accepted: usize,
    pub dropped: usize,
    pub requested: Option<usize>,
}

impl BatchReport {
    /// True when items were dropped or fewer than requested came back.
    pub fn is_short(&self) -> bool {
        self.dropped > 0 || self.requested.is_some_and(|r| self.accepted < r)
    }
}

/// A validated response.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub result: GenerationResult,
    pub batch: Option<BatchReport>,
}

impl Validated {
    fn single(result: GenerationResult) -> Self {
        Self {
            result,
            batch: None,
        }
    }
}

/// Validate and normalize `raw` for `task`.
///
/// `requested` is the item count asked for by collection prompts.
pub fn validate(task: TaskType, raw: &str, requested: Option<usize>) -> Result<Validated, ValidationError> {
    match task.shape() {
        ResponseShape::FreeText => validate_free_text(raw).map(Validated::single),
        ResponseShape::JsonObject => validate_mindmap(raw).map(Validated::single),
        ResponseShape::JsonCollection if task == TaskType::Flashcard => {
            validate_flashcards(raw, requested)
        }
        ResponseShape::JsonCollection => validate_quiz(raw, requested),
    }
}

pub fn validate_free_text(raw: &str) -> Result<GenerationResult, ValidationError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(ValidationError::Empty);
    }
    Ok(GenerationResult::FreeText {
        body: body.to_string(),
    })
}

/// A mind map needs a non-empty `central` topic and a `branches` array in
/// which every branch has a topic.
pub fn validate_mindmap(raw: &str) -> Result<GenerationResult, ValidationError> {
    let value = extract_json(raw)?;
    let map = value.as_object().ok_or(ValidationError::WrongShape {
        field: "mindmap",
        expected: "a JSON object",
    })?;

    let central = first_present(map, CENTRAL_ALIASES)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::MissingField("central"))?
        .to_string();

    let branches = first_present(map, BRANCHES_ALIASES)
        .ok_or(ValidationError::MissingField("branches"))?
        .as_array()
        .ok_or(ValidationError::WrongShape {
            field: "branches",
            expected: "an array",
        })?
        .iter()
        .map(|b| {
            normalize_branch(b).ok_or(ValidationError::WrongShape {
                field: "branches",
                expected: "topics or objects with a topic",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GenerationResult::MindMap { central, branches })
}

pub fn validate_flashcards(raw: &str, requested: Option<usize>) -> Result<Validated, ValidationError> {
    let value = extract_json(raw)?;
    let (items, batch) = collect_items(&value, requested, normalize_flashcard)?;
    Ok(Validated {
        result: GenerationResult::FlashcardSet { items },
        batch: Some(batch),
    })
}

pub fn validate_quiz(raw: &str, requested: Option<usize>) -> Result<Validated, ValidationError> {
    let value = extract_json(raw)?;
    let (items, batch) = collect_items(&value, requested, normalize_quiz_item)?;
    Ok(Validated {
        result: GenerationResult::QuizSet { items },
        batch: Some(batch),
    })
}

/// The item array of a collection response, bare or wrapped in an object.
fn collection(value: &Value) -> Result<&Vec<Value>, ValidationError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(map) => COLLECTION_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or(ValidationError::WrongShape {
                field: "items",
                expected: "an array",
            }),
        _ => Err(ValidationError::WrongShape {
            field: "items",
            expected: "an array",
        }),
    }
}

fn collect_items<T, E, F>(
    value: &Value,
    requested: Option<usize>,
    normalize: F,
) -> Result<(Vec<T>, BatchReport), ValidationError>
where
    F: Fn(&Value) -> Result<T, E>,
    E: std::fmt::Debug,
{
    let raw_items = collection(value)?;

    let mut items = Vec::with_capacity(raw_items.len());
    let mut dropped = 0;
    for (index, raw) in raw_items.iter().enumerate() {
        match normalize(raw) {
            Ok(item) => items.push(item),
            Err(defect) => {
                debug!(index, ?defect, "Dropping malformed item");
                dropped += 1;
            }
        }
    }

    if items.is_empty() {
        return Err(ValidationError::NoValidItems { dropped });
    }

    let batch = BatchReport {
        accepted: items.len(),
        dropped,
        requested,
    };
    Ok((items, batch))
}
