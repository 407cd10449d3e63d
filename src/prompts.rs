//! Prompt templates and prompt assembly.
//!
//! Document text is cut to a character budget before it is placed in the
//! prompt so that it fits the context window of the smaller local models.

use crate::model::Sentiment;

/// Characters of document text sent with each question
pub const DEFAULT_CONTEXT_LIMIT: usize = 8000;

/// Characters of document text shown in the preview
pub const DEFAULT_PREVIEW_LIMIT: usize = 1500;

/// System prompt for plain chat without a document.
pub const ASSISTANT_SYSTEM_PROMPT: &str =
    "You are a helpful, respectful, and honest AI assistant.";

/// Reply the analyst prompt asks for when the document has no answer.
pub const CANNOT_ANSWER_REPLY: &str = "I cannot answer that based on the provided document.";

/// Role line that opens every document-grounded prompt.
pub const DOCUMENT_ANALYST_ROLE: &str = "You are an expert document analyst.";

/// Closing instruction of the document-grounded prompt.
pub const ANSWER_FROM_DOCUMENT_ONLY: &str = "Answer concisely and accurately based ONLY on the document above. If the question cannot be answered from the document, say";

/// First `limit` characters of `text` (char-safe)
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Preview shown to the user: the first `limit` characters plus "..." when cut
pub fn preview(text: &str, limit: usize) -> String {
    let head = truncate_chars(text, limit);
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Build the prompt for one question.
///
/// With a document, the analyst template is filled with the first
/// `context_limit` characters of it; otherwise the general template is used.
pub fn build_prompt(
    question: &str,
    document: Option<&str>,
    sentiment: Sentiment,
    context_limit: usize,
) -> String {
    match document {
        Some(text) if !text.trim().is_empty() => format!(
            "{} The following document has a {} sentiment.\n\n\
             Document:\n{}\n\n\
             User Question: {}\n\n\
             {} '{}'",
            DOCUMENT_ANALYST_ROLE,
            sentiment.as_str(),
            truncate_chars(text, context_limit),
            question,
            ANSWER_FROM_DOCUMENT_ONLY,
            CANNOT_ANSWER_REPLY,
        ),
        _ => format!("Answer this general question: {}", question),
    }
}
