//! Response resolution: turn a raw chat-completion reply into an untrusted
//! JSON value holding the tag candidates.
//!
//! Models do not reliably answer in the requested format. Reasoning models
//! sometimes leave `content` empty and put the answer inside `reasoning`;
//! others wrap the array in a Markdown fence or add a sentence around it.
//! Resolution is therefore a short chain of stages, each of which either
//! produces a value ([`Stage::Parsed`]) or hands over to the next one
//! ([`Stage::Next`]). Only the end of the chain turns "nothing found" into an
//! error.
//!
//! ```text
//! reply ─▶ choices[0].message ─▶ content ──┐
//!                               reasoning ─┴▶ strip fences ─▶ strict JSON
//!                                                           └▶ first [...] in text
//! ```
//!
//! The shape of the resulting value is not checked here; see
//! [`crate::pipeline::normalize`].

use crate::error::AutotagError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// Greedy, multi-line match of the first `[` through the last `]`.
static RE_BRACKETED_ARRAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\[.*\]").unwrap());

static RE_CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*").unwrap());

/// Reasoning text kept in a [`AutotagError::NoTagsFound`] message.
const REASONING_PREVIEW_CHARS: usize = 300;

/// Which message field the candidate text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// The regular `content` field.
    Content,
    /// A bracketed array found inside the `reasoning` field.
    Reasoning,
}

/// How the candidate text was turned into JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMethod {
    /// The whole (fence-stripped) text was valid JSON.
    Strict,
    /// Only the first bracketed array inside the text parsed.
    BracketedArray,
}

/// The resolver output: a JSON value plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCandidates {
    pub value: Value,
    pub source: CandidateSource,
    pub method: ParseMethod,
}

/// Outcome of one resolution stage.
enum Stage<T> {
    Parsed(T),
    /// Nothing usable; the reason is logged before moving on.
    Next(&'static str),
}

/// Resolve the tag candidates out of a chat-completion reply.
pub fn resolve_tag_candidates(reply: &Value) -> Result<ResolvedCandidates, AutotagError> {
    let message = first_message(reply)?;

    let (text, source) = match content_stage(message) {
        Stage::Parsed(text) => (text, CandidateSource::Content),
        Stage::Next(reason) => {
            debug!("{reason}, checking reasoning field");
            match reasoning_stage(message)? {
                Stage::Parsed(text) => (text, CandidateSource::Reasoning),
                Stage::Next(_) => return Err(AutotagError::EmptyResponse),
            }
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AutotagError::EmptyResponse);
    }

    let (value, method) = match strict_stage(trimmed) {
        Stage::Parsed(value) => (value, ParseMethod::Strict),
        Stage::Next(reason) => {
            debug!("{reason}, trying to extract array");
            match bracketed_array_stage(trimmed)? {
                Stage::Parsed(value) => (value, ParseMethod::BracketedArray),
                Stage::Next(_) => {
                    return Err(AutotagError::UnparsableTags {
                        text: trimmed.to_string(),
                    })
                }
            }
        }
    };

    debug!("Resolved tag candidates from {:?} ({:?}): {}", source, method, value);
    Ok(ResolvedCandidates {
        value,
        source,
        method,
    })
}

/// `choices[0].message`, or a shape error naming what is missing.
fn first_message(reply: &Value) -> Result<&Value, AutotagError> {
    let choice = reply
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| AutotagError::ResponseShape(format!("no choices in {reply}")))?;
    choice
        .get("message")
        .filter(|m| !m.is_null())
        .ok_or_else(|| AutotagError::ResponseShape(format!("no message in {choice}")))
}

fn content_stage(message: &Value) -> Stage<String> {
    match message.get("content").and_then(Value::as_str) {
        Some(content) if !content.trim().is_empty() => Stage::Parsed(content.to_string()),
        _ => Stage::Next("Content field is empty"),
    }
}

/// The first bracketed array in `reasoning`.
///
/// A non-empty reasoning without any array is a hard failure: the model
/// thought about the document but never committed to an answer.
fn reasoning_stage(message: &Value) -> Result<Stage<String>, AutotagError> {
    let Some(reasoning) = message
        .get("reasoning")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
    else {
        return Ok(Stage::Next("No reasoning field"));
    };

    match RE_BRACKETED_ARRAY.find(reasoning) {
        Some(m) => {
            debug!("Extracted from reasoning: {}", m.as_str());
            Ok(Stage::Parsed(m.as_str().to_string()))
        }
        None => Err(AutotagError::NoTagsFound {
            reasoning: reasoning.chars().take(REASONING_PREVIEW_CHARS).collect(),
        }),
    }
}

fn strict_stage(text: &str) -> Stage<Value> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Stage::Next("Content is empty after removing code fences");
    }
    match serde_json::from_str(&cleaned) {
        Ok(value) => Stage::Parsed(value),
        Err(_) => Stage::Next("JSON parse failed"),
    }
}

/// Parse the first bracketed array of the unstripped text.
///
/// Finding brackets that still do not parse is reported with the bracketed
/// slice, which is usually the more useful diagnostic.
fn bracketed_array_stage(text: &str) -> Result<Stage<Value>, AutotagError> {
    let Some(m) = RE_BRACKETED_ARRAY.find(text) else {
        return Ok(Stage::Next("No bracketed array"));
    };
    serde_json::from_str(m.as_str())
        .map(Stage::Parsed)
        .map_err(|_| AutotagError::UnparsableTags {
            text: m.as_str().to_string(),
        })
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker (with trailing
/// whitespace) and trim.
pub fn strip_code_fences(text: &str) -> String {
    RE_CODE_FENCE.replace_all(text, "").trim().to_string()
}
