//! Error types for the papra-ingest library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`IngestError`]: **Fatal** for the operation that raised it. The source
//!   path does not exist, the configuration file is unreadable, the document
//!   store rejected a request. Returned from [`crate::upload::upload_pdfs`]
//!   and the [`crate::papra::PapraClient`] calls.
//!
//! * [`AutotagError`]: **Non-fatal** for a batch. The auto-tagging pipeline
//!   failed for one document (unreadable PDF, malformed model reply, no
//!   usable tags). The upload loop logs it, falls back to the manually
//!   supplied tags, and moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// Longest slice of a response body kept inside an error message.
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 500;

/// Cut `body` to [`MAX_ERROR_BODY_CHARS`] characters for diagnostics.
pub(crate) fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}

/// Fatal errors returned by the upload loop, the Papra client and the
/// configuration layer.
#[derive(Debug, Error)]
pub enum IngestError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The source path does not exist.
    #[error("Path does not exist: '{path}'")]
    PathNotFound { path: PathBuf },

    /// The source is a file but not a PDF.
    #[error("The specified file is not a PDF: '{path}'")]
    NotAPdf { path: PathBuf },

    /// The source is neither a regular file nor a directory.
    #[error("The specified path is neither a file nor a directory: '{path}'")]
    UnsupportedPath { path: PathBuf },

    /// A directory was given but contains no PDF files.
    #[error("No PDF files found in '{path}'")]
    NoPdfFiles { path: PathBuf },

    /// One or more OCR language codes are not recognised by Papra.
    #[error("Unsupported OCR language(s): {}", invalid.join(", "))]
    InvalidOcrLanguages { invalid: Vec<String> },

    // ── Document store errors ─────────────────────────────────────────────
    /// Papra answered with a non-2xx status.
    #[error("Papra request failed with status {status}: {body}")]
    PapraApi { status: u16, body: String },

    /// Papra answered 2xx but the body did not have the expected shape.
    #[error("Unexpected Papra response: {0}")]
    UnexpectedResponse(String),

    /// Connection, DNS, TLS or body-read failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a file from disk failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write configuration '{path}': {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`crate::IngestConfig`].
    #[error("Configuration '{path}' is malformed: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Builder or file validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Transport failures and 5xx answers are transient; 4xx answers and
    /// local errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestError::Http(e) => !e.is_builder() && !e.is_decode(),
            IngestError::PapraApi { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// A failure of the auto-tagging pipeline for a single document.
///
/// Variants are ordered roughly by pipeline stage. The reply-parsing
/// variants (`ResponseShape` → `UnparsableTags`) describe the model reply at
/// increasing levels of recoverability.
#[derive(Debug, Error)]
pub enum AutotagError {
    /// Autotag was requested but no OpenRouter API key is configured.
    #[error("OpenRouter API key is not configured. Run with --setup to configure.")]
    Configuration,

    /// `openrouter_endpoint` is not an absolute URL.
    #[error("Invalid OpenRouter endpoint '{endpoint}': {detail}")]
    InvalidEndpoint { endpoint: String, detail: String },

    /// The PDF could not be read or is not a parseable PDF container.
    #[error("Failed to extract PDF text from '{path}': {detail}")]
    Extraction { path: PathBuf, detail: String },

    /// The LLM endpoint answered with a non-2xx status.
    #[error("OpenRouter API request failed with status {status}: {body}")]
    LlmApi { status: u16, body: String },

    /// The LLM request never produced a response (connection refused, DNS…).
    #[error("OpenRouter request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The LLM endpoint answered 2xx with a body that is not JSON.
    #[error("Failed to parse OpenRouter response: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The reply has no `choices[0]` or no `choices[0].message`.
    #[error("Invalid response structure: {0}")]
    ResponseShape(String),

    /// Neither `content` nor `reasoning` carried any text.
    #[error("Empty content in LLM response")]
    EmptyResponse,

    /// `content` was empty and `reasoning` holds no bracketed array.
    #[error("No content in response and no JSON array found in reasoning field. Reasoning: {reasoning}")]
    NoTagsFound { reasoning: String },

    /// The candidate text is not JSON and holds no parseable array.
    #[error("Failed to parse tags from LLM response: {text}")]
    UnparsableTags { text: String },

    /// The reply parsed, but normalisation left nothing usable.
    #[error("No valid tags generated by LLM")]
    NoValidTags,

    /// The blocking extraction task panicked or was cancelled.
    #[error("Internal error: {0}")]
    Internal(String),
}
