//! Prompt templates per task type.

use lectern_core::{GenerationRequest, TaskType};

/// Item count used when a collection request does not specify one.
pub const DEFAULT_ITEM_COUNT: usize = 15;

const MINDMAP_PROMPT: &str = "Generate a comprehensive mind map structure in JSON format based on \
the following content. The mind map should have a central topic and multiple branches with \
sub-topics. Format: {\"central\": \"main topic\", \"branches\": [{\"topic\": \"branch1\", \
\"subtopics\": [\"sub1\", \"sub2\"]}, ...]}";

const PODCAST_PROMPT: &str = "Create an engaging podcast script based on the following educational \
content. The script should be conversational, informative, and suitable for audio narration. \
Include an introduction, main points discussion, and conclusion. Format it with speaker labels \
(HOST:) where appropriate.";

const VIDEO_PROMPT: &str = "Create a detailed video script for an educational explainer video based \
on the following content. Include visual descriptions in [VISUAL: ...] tags and narration. Make it \
engaging and educational.";

const REPORT_PROMPT: &str = "Generate a comprehensive educational report based on the following \
content. Include: Executive Summary, Key Topics, Detailed Analysis, and Conclusions. Use proper \
headings and formatting.";

/// Build the complete prompt for a request.
///
/// Unknown task types get the bounded context back unmodified.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let context = &request.bounded_context;
    let count = request.options.item_count.unwrap_or(DEFAULT_ITEM_COUNT);

    let instructions = match request.task {
        TaskType::Mindmap => MINDMAP_PROMPT.to_string(),
        TaskType::Podcast => PODCAST_PROMPT.to_string(),
        TaskType::Video => VIDEO_PROMPT.to_string(),
        TaskType::Report => REPORT_PROMPT.to_string(),
        TaskType::Flashcard => format!(
            "Generate {count} educational flashcards based on the following content. Each \
             flashcard should have a question and answer. Format as JSON: [{{\"question\": \
             \"...\", \"answer\": \"...\", \"difficulty\": \"easy|medium|hard\"}}, ...]"
        ),
        TaskType::Quiz => format!(
            "Generate {count} multiple-choice quiz questions based on the following content. \
             Each question should have 4 options with one correct answer. Format as JSON: \
             [{{\"question\": \"...\", \"options\": [\"opt1\", \"opt2\", \"opt3\", \"opt4\"], \
             \"correctanswer\": 0-3, \"explanation\": \"...\", \"difficulty\": \
             \"easy|medium|hard\"}}, ...]"
        ),
        TaskType::Unknown => return context.clone(),
    };

    format!("{instructions}\n\nContent:\n{context}")
}
