//! # papra-ingest
//!
//! Upload PDF files to a [Papra](https://papra.app) document store and tag
//! them, either with tags given on the command line or with tags an LLM
//! derives from the document's content.
//!
//! ## Why summarise before tagging?
//!
//! Sending whole documents to a model is slow, costly and pointless for
//! tagging. Instead the text layer is reduced by cheap heuristics (headings,
//! dates, amounts, keywords, a coarse document type) to a summary of at most
//! 2000 characters, and only that summary goes to the model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Extract    text layer + /Info metadata (lopdf, spawn_blocking)
//!  ├─ 2. Analyze    headings, entities, keywords, document type
//!  ├─ 3. Summarize  labeled sections, ≤ 2000 chars
//!  ├─ 4. Prompt     summary + existing Papra tag vocabulary
//!  ├─ 5. LLM        one OpenRouter chat completion
//!  ├─ 6. Resolve    content / reasoning / fenced / embedded array
//!  └─ 7. Normalize  ≤ 5 lower-case tags of 1–3 words
//! ```
//!
//! The upload loop in [`upload`] runs this per file, falls back to the manual
//! tags when it fails, and never lets one file abort the batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use papra_ingest::{upload_pdfs, IngestConfig, UploadOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = IngestConfig::load(&IngestConfig::default_path())?
//!         .ok_or("run `papra-ingest --setup` first")?;
//!     let options = UploadOptions {
//!         tags: vec!["Inbox".into()],
//!         autotag: config.is_autotag_available(),
//!         ..Default::default()
//!     };
//!     let summary = upload_pdfs(Path::new("scans/"), &config, &options).await?;
//!     eprintln!("{} uploaded, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `papra-ingest` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod autotag;
pub mod config;
pub mod error;
pub mod output;
pub mod papra;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use autotag::{generate_tags_for_document, is_autotag_available};
pub use config::{IngestConfig, IngestConfigBuilder};
pub use error::{AutotagError, IngestError};
pub use output::{FileOutcome, UploadSummary};
pub use papra::{PapraClient, Tag, UploadedDocument};
pub use pipeline::extract::{extract_pdf, ExtractedDocument};
pub use pipeline::normalize::validate_and_normalize_tags;
pub use pipeline::resolve::{resolve_tag_candidates, ResolvedCandidates};
pub use pipeline::summary::build_document_summary;
pub use progress::{NoopProgressCallback, ProgressCallback, UploadProgressCallback};
pub use upload::{upload_pdfs, validate_ocr_languages, UploadOptions, SUPPORTED_OCR_LANGUAGES};
