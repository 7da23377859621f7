//! Prompt text for LLM-based tag generation.
//!
//! The template is kept here, apart from the HTTP client, so that unit
//! tests can inspect the exact text sent to the model without a network
//! round-trip.

/// Instructions placed before the vocabulary and the summary.
pub const TAGGING_INSTRUCTIONS: &str = r#"You are a document tagging assistant. Analyze the document summary and generate relevant tags.

GUIDELINES:
1. PRIORITIZE using existing tags when applicable
2. Avoid overly specific tags
3. Focus on general categories, topics, document types, or themes
4. Keep tags concise (1–3 words)
5. Return 2–5 tags maximum
6. Return ONLY a JSON array of tag names, nothing else
7. Do NOT include any explanations or additional text
8. Start with uppercase letters for each word in tags"#;

/// Label introducing the existing tag vocabulary.
pub const EXISTING_TAGS_HEADER: &str = "Existing tags in the system:";

/// Closing reminder, repeated after the summary because small models tend
/// to forget the output format once they have read the document.
pub const TAGGING_REMINDER: &str = r#"Return ONLY a JSON array of 2–5 tag names (1–3 words each). Example: ["Finance", "Invoice", "2024"]"#;

/// Build the user message for one document.
///
/// `existing_tags` is advisory: when empty, the vocabulary section is left
/// out entirely rather than rendered as an empty list.
pub fn compose_tagging_prompt(summary: &str, existing_tags: &[String]) -> String {
    let vocabulary = if existing_tags.is_empty() {
        String::new()
    } else {
        format!("\n\n{EXISTING_TAGS_HEADER}\n{}", existing_tags.join(", "))
    };

    format!(
        "{TAGGING_INSTRUCTIONS}\n{vocabulary}\n\nDOCUMENT SUMMARY\n----------------\n{summary}\n\n{TAGGING_REMINDER}"
    )
}
