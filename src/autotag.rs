//! Auto-tagging: derive tag names for one PDF from its content.
//!
//! ```text
//! config check ─▶ extract ─▶ summary ─▶ vocabulary ─▶ prompt ─▶ LLM ─▶ resolve ─▶ normalize
//! ```
//!
//! The existing tag vocabulary is fetched fresh for every document and is
//! advisory only: if Papra cannot be reached the prompt simply goes out
//! without it.

use crate::config::IngestConfig;
use crate::error::AutotagError;
use crate::papra::PapraClient;
use crate::pipeline::extract::extract_pdf;
use crate::pipeline::llm::OpenRouterClient;
use crate::pipeline::normalize::validate_and_normalize_tags;
use crate::pipeline::resolve::resolve_tag_candidates;
use crate::pipeline::summary::build_document_summary;
use crate::prompts::compose_tagging_prompt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Whether autotagging can run with this configuration.
pub fn is_autotag_available(config: &IngestConfig) -> bool {
    config.is_autotag_available()
}

/// Generate 1–5 normalised tags for the PDF at `path`.
///
/// `papra`, when given, supplies the existing tag vocabulary so the model
/// can reuse it. Fails with [`AutotagError::Configuration`] before touching
/// the file when no OpenRouter key is configured, and with
/// [`AutotagError::NoValidTags`] when the reply contains nothing usable.
pub async fn generate_tags_for_document(
    path: &Path,
    config: &IngestConfig,
    papra: Option<&PapraClient>,
) -> Result<Vec<String>, AutotagError> {
    let llm = OpenRouterClient::from_config(config)?;
    generate_tags_with(&llm, path, papra).await
}

/// [`generate_tags_for_document`] with an already-built LLM client.
pub async fn generate_tags_with(
    llm: &OpenRouterClient,
    path: &Path,
    papra: Option<&PapraClient>,
) -> Result<Vec<String>, AutotagError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!("Extracting PDF text from {}", file_name);
    let document = extract_pdf(path).await?;
    let summary = build_document_summary(&document, &file_name);

    let existing_tags = match papra {
        Some(client) => fetch_vocabulary(client).await,
        None => Vec::new(),
    };

    let prompt = compose_tagging_prompt(&summary, &existing_tags);
    info!("Sending {} to {}", file_name, llm.model());
    let reply = llm.complete(&prompt).await?;

    let candidates = resolve_tag_candidates(&reply)?;
    let tags = validate_and_normalize_tags(&candidates.value);
    if tags.is_empty() {
        return Err(AutotagError::NoValidTags);
    }

    info!("Generated tags for {}: {}", file_name, tags.join(", "));
    Ok(tags)
}

/// Existing tag names, or an empty list when they cannot be fetched.
async fn fetch_vocabulary(client: &PapraClient) -> Vec<String> {
    match client.list_tags().await {
        Ok(tags) => {
            debug!("Using {} existing tags as vocabulary", tags.len());
            tags.into_iter().map(|t| t.name).collect()
        }
        Err(e) => {
            warn!("Could not fetch existing tags: {}", e);
            Vec::new()
        }
    }
}
