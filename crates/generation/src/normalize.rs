//! Field-alias normalization for structured responses.
//!
//! Each canonical field has an ordered alias list; the first alias present
//! (and not `null`) on an item wins. Keeping the tables as data means new
//! variants are a one-line change and the lookup is testable without a
//! provider.

use lectern_core::{Branch, Difficulty, Flashcard, QuizQuestion};
use serde_json::{Map, Value};

pub const QUESTION_ALIASES: &[&str] = &["question", "prompt", "text"];
pub const OPTIONS_ALIASES: &[&str] = &["options", "choices", "answers"];
pub const CORRECT_ALIASES: &[&str] = &[
    "correctIndex",
    "correct_index",
    "correctanswer",
    "correctAnswer",
    "correct_answer",
    "answerIndex",
    "answer_index",
    "answer",
    "correct",
];
pub const EXPLANATION_ALIASES: &[&str] = &["explanation", "why", "rationale"];
pub const DIFFICULTY_ALIASES: &[&str] = &["difficulty", "level"];

pub const CARD_QUESTION_ALIASES: &[&str] = &["question", "front", "term", "prompt"];
pub const CARD_ANSWER_ALIASES: &[&str] = &["answer", "back", "definition", "response"];

pub const CENTRAL_ALIASES: &[&str] = &["central", "central_topic", "centralTopic", "root"];
pub const BRANCHES_ALIASES: &[&str] = &["branches", "children"];
pub const TOPIC_ALIASES: &[&str] = &["topic", "name", "title"];
pub const SUBTOPICS_ALIASES: &[&str] = &["subtopics", "sub_topics", "subTopics", "children"];

/// Keys under which a collection may be wrapped in an object.
pub const COLLECTION_KEYS: &[&str] = &["flashcards", "cards", "questions", "quiz", "items"];

/// Number of options on every normalized quiz question.
pub const QUIZ_OPTION_COUNT: usize = 4;

/// Why a single collection item was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDefect {
    NotAnObject,
    MissingQuestion,
    MissingAnswer,
    MissingOptions,
    UnresolvedAnswer,
}

/// The value of the first alias present on `item`.
pub fn first_present<'a>(item: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| item.get(*alias))
        .find(|value| !value.is_null())
}

fn text_field(item: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    first_present(item, aliases)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn difficulty(item: &Map<String, Value>) -> Difficulty {
    first_present(item, DIFFICULTY_ALIASES)
        .and_then(Value::as_str)
        .and_then(Difficulty::parse)
        .unwrap_or_default()
}

/// Normalize one quiz item onto the canonical schema.
///
/// Options are padded with empty strings or truncated to four. The correct
/// answer may be an index, a digit string, a letter `A`-`D` or the exact
/// text of an option; it must point at a real option. An item with no
/// correct-answer field at all defaults to the first option.
pub fn normalize_quiz_item(value: &Value) -> Result<QuizQuestion, ItemDefect> {
    let item = value.as_object().ok_or(ItemDefect::NotAnObject)?;

    let question = text_field(item, QUESTION_ALIASES).ok_or(ItemDefect::MissingQuestion)?;

    let mut options = first_present(item, OPTIONS_ALIASES)
        .map(option_list)
        .unwrap_or_default();
    if options.is_empty() {
        return Err(ItemDefect::MissingOptions);
    }
    let real_options = options.len().min(QUIZ_OPTION_COUNT);
    options.resize(QUIZ_OPTION_COUNT, String::new());

    let correct = match first_present(item, CORRECT_ALIASES) {
        Some(value) => resolve_correct_index(value, &options[..real_options])
            .ok_or(ItemDefect::UnresolvedAnswer)?,
        None => 0,
    };

    let [a, b, c, d]: [String; QUIZ_OPTION_COUNT] = options
        .try_into()
        .map_err(|_| ItemDefect::MissingOptions)?;

    Ok(QuizQuestion {
        question,
        options: [a, b, c, d],
        correct_index: correct,
        explanation: text_field(item, EXPLANATION_ALIASES).unwrap_or_default(),
        difficulty: difficulty(item),
    })
}

/// Options as strings. Objects such as `{"A": "...", "B": "..."}` yield
/// their values in key order.
fn option_list(value: &Value) -> Vec<String> {
    let values: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => return Vec::new(),
    };
    values
        .into_iter()
        .map(|v| scalar_text(v).unwrap_or_else(|| v.to_string()).trim().to_string())
        .collect()
}

/// Resolve a correct-answer value against the real (unpadded) options.
pub fn resolve_correct_index(value: &Value, options: &[String]) -> Option<u8> {
    let index = match value {
        Value::Number(n) => {
            let f = n.as_f64()?;
            if f.fract() != 0.0 || f < 0.0 {
                return None;
            }
            f as usize
        }
        Value::String(s) => resolve_answer_text(s.trim(), options)?,
        _ => return None,
    };

    (index < options.len() && index < QUIZ_OPTION_COUNT).then_some(index as u8)
}

fn resolve_answer_text(answer: &str, options: &[String]) -> Option<usize> {
    if answer.is_empty() {
        return None;
    }
    if let Some(i) = options.iter().position(|o| o == answer) {
        return Some(i);
    }
    if let Ok(i) = answer.parse::<usize>() {
        return Some(i);
    }

    // "B", "b)", "C."
    let letter = answer.strip_suffix([')', '.']).unwrap_or(answer);
    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            let i = (c.to_ascii_uppercase() as u8).checked_sub(b'A')? as usize;
            (i < QUIZ_OPTION_COUNT).then_some(i)
        }
        _ => options
            .iter()
            .position(|o| o.eq_ignore_ascii_case(answer)),
    }
}

/// Normalize one flashcard. A missing or unknown difficulty is `medium`.
pub fn normalize_flashcard(value: &Value) -> Result<Flashcard, ItemDefect> {
    let item = value.as_object().ok_or(ItemDefect::NotAnObject)?;
    Ok(Flashcard {
        question: text_field(item, CARD_QUESTION_ALIASES).ok_or(ItemDefect::MissingQuestion)?,
        answer: text_field(item, CARD_ANSWER_ALIASES).ok_or(ItemDefect::MissingAnswer)?,
        difficulty: difficulty(item),
    })
}

/// A mind-map branch: an object with a topic, or a bare topic string.
pub fn normalize_branch(value: &Value) -> Option<Branch> {
    match value {
        Value::String(topic) => {
            let topic = topic.trim();
            (!topic.is_empty()).then(|| Branch {
                topic: topic.to_string(),
                subtopics: Vec::new(),
            })
        }
        Value::Object(item) => {
            let topic = text_field(item, TOPIC_ALIASES)?;
            let subtopics = first_present(item, SUBTOPICS_ALIASES)
                .and_then(Value::as_array)
                .map(|subs| subs.iter().filter_map(subtopic_text).collect())
                .unwrap_or_default();
            Some(Branch { topic, subtopics })
        }
        _ => None,
    }
}

fn subtopic_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Object(item) => text_field(item, TOPIC_ALIASES)?,
        other => scalar_text(other)?,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
