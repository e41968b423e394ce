//! Prompt composition.
//!
//! Deterministically renders a generation request into the two-part
//! prompt the generation engine sends to the model: an era-parameterized
//! system instruction carrying the schema contract and retrieved context,
//! and a user instruction with the target date and article count. Pure
//! functions; same inputs produce the same strings.

use crate::models::Era;
use crate::retriever::DatedCandidate;

/// The system and user messages for one model invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

/// Machine-readable description of the required output shape, embedded in
/// the system instruction so the model emits exactly that JSON.
pub fn format_instructions() -> String {
    let schema = serde_json::json!({
        "articles": [
            {
                "headline": "string — the article headline",
                "rubric": "string — category label, e.g. Politics, Society",
                "date_location": "string — date and place line, e.g. 'Paris, 14 July 1789'",
                "body": "string — the article prose",
                "reporter": "string — fictional reporter byline"
            }
        ]
    });
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Serialize retained candidates into the context text: contents in
/// filtered order, joined by a blank line.
pub fn render_context(candidates: &[DatedCandidate]) -> String {
    candidates
        .iter()
        .map(|c| c.document.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the full prompt for a generation attempt.
pub fn compose(target_date: &str, era: Era, num_articles: usize, context: &str) -> RenderedPrompt {
    let system = format!(
        "You are a witty and slightly sarcastic editor of the historical gazette 'Chronograph'.\n\
         Your task is to write the news digest for the issue of the gazette on the given date.\n\
         Use the following real historical events as the basis, but add details, humor, fictional\n\
         characters, or commentary in the style of a {era} century newspaper.\n\
         \n\
         IMPORTANT: Your entire reply MUST be ONLY a JSON object, with no other text before or\n\
         after it. The JSON must conform exactly to the following structure (do not include\n\
         ```json fences):\n\
         {instructions}\n\
         \n\
         Real events (context):\n\
         {context}",
        era = era.label(),
        instructions = format_instructions(),
        context = context,
    );

    let user = format!(
        "Please write the news for {target_date}. Use roughly {num_articles} events from the \
         context. Style: {era} century.",
        era = era.label(),
    );

    RenderedPrompt { system, user }
}
