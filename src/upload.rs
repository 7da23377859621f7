//! Upload loop: resolve a file or directory to PDFs, tag them and push them
//! to Papra one at a time.
//!
//! ## Failure model
//!
//! Problems before the first upload (missing path, no PDFs, bad OCR codes,
//! manual tags that cannot be created) abort the batch with an
//! [`IngestError`]. Once the loop is running, nothing aborts it:
//!
//! * autotag failure → warning, the file keeps the manual tags;
//! * upload failure → retried for transport errors and 5xx answers, then
//!   recorded on the file's [`FileOutcome`];
//! * tag attachment failure → warning on an otherwise successful upload.
//!
//! ## Retry Strategy
//!
//! Backoff is `retry_backoff_ms * 2^(attempt-1)`: with the 500 ms default and
//! 2 retries the waits are 500 ms then 1 s.

use crate::autotag::generate_tags_with;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::output::{FileOutcome, UploadSummary};
use crate::papra::{PapraClient, Tag, UploadedDocument};
use crate::pipeline::llm::OpenRouterClient;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

/// Tesseract language codes accepted by Papra's OCR.
pub const SUPPORTED_OCR_LANGUAGES: &[&str] = &[
    "afr", "amh", "ara", "asm", "aze", "aze_cyrl", "bel", "ben", "bod", "bos", "bul", "cat",
    "ceb", "ces", "chi_sim", "chi_tra", "chr", "cym", "dan", "deu", "dzo", "ell", "eng", "enm",
    "epo", "est", "eus", "fas", "fin", "fra", "frk", "frm", "gle", "glg", "grc", "guj", "hat",
    "heb", "hin", "hrv", "hun", "iku", "ind", "isl", "ita", "ita_old", "jav", "jpn", "kan",
    "kat", "kat_old", "kaz", "khm", "kir", "kor", "kur", "lao", "lat", "lav", "lit", "mal",
    "mar", "mkd", "mlt", "msa", "mya", "nep", "nld", "nor", "ori", "pan", "pol", "por", "pus",
    "ron", "rus", "san", "sin", "slk", "slv", "spa", "spa_old", "sqi", "srp", "srp_latn", "swa",
    "swe", "syr", "tam", "tel", "tgk", "tgl", "tha", "tir", "tur", "uig", "ukr", "urd", "uzb",
    "uzb_cyrl", "vie", "yid",
];

/// Reject any code not in [`SUPPORTED_OCR_LANGUAGES`], listing all of them.
pub fn validate_ocr_languages(languages: &[String]) -> Result<(), IngestError> {
    let invalid: Vec<String> = languages
        .iter()
        .filter(|lang| !SUPPORTED_OCR_LANGUAGES.contains(&lang.as_str()))
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(IngestError::InvalidOcrLanguages { invalid })
    }
}

/// Whether `path` has a `.pdf` extension, in any case.
pub fn is_pdf_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
}

/// Every PDF below `dir`, recursively, sorted by path.
pub async fn find_pdf_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| IngestError::Io { path, source }
    };

    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&current)
            .await
            .map_err(io_err(&current))?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err(&current))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(io_err(&path))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && is_pdf_file(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Turn the user-supplied source into the list of PDFs to upload.
pub async fn resolve_source(source: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let metadata = match tokio::fs::metadata(source).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(IngestError::PathNotFound {
                path: source.to_path_buf(),
            })
        }
        Err(source_err) => {
            return Err(IngestError::Io {
                path: source.to_path_buf(),
                source: source_err,
            })
        }
    };

    if metadata.is_dir() {
        info!("Searching for PDF files in {}", source.display());
        let files = find_pdf_files(source).await?;
        if files.is_empty() {
            return Err(IngestError::NoPdfFiles {
                path: source.to_path_buf(),
            });
        }
        info!("Found {} PDF file(s)", files.len());
        Ok(files)
    } else if metadata.is_file() {
        if !is_pdf_file(source) {
            return Err(IngestError::NotAPdf {
                path: source.to_path_buf(),
            });
        }
        Ok(vec![source.to_path_buf()])
    } else {
        Err(IngestError::UnsupportedPath {
            path: source.to_path_buf(),
        })
    }
}

/// Per-batch settings for [`upload_pdfs`].
#[derive(Clone)]
pub struct UploadOptions {
    /// Passed to Papra's OCR; validated before anything is uploaded.
    pub ocr_languages: Vec<String>,
    /// Tags attached to every document.
    pub tags: Vec<String>,
    /// Ask the LLM for tags per document, on top of `tags`.
    pub autotag: bool,
    /// Extra upload attempts after a transient failure.
    pub max_retries: u32,
    /// Base backoff between upload attempts.
    pub retry_backoff_ms: u64,
    /// Receives per-file events.
    pub progress: Option<ProgressCallback>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            ocr_languages: Vec::new(),
            tags: Vec::new(),
            autotag: false,
            max_retries: 2,
            retry_backoff_ms: 500,
            progress: None,
        }
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("ocr_languages", &self.ocr_languages)
            .field("tags", &self.tags)
            .field("autotag", &self.autotag)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Upload `source` (a PDF or a directory of PDFs) to Papra.
pub async fn upload_pdfs(
    source: &Path,
    config: &IngestConfig,
    options: &UploadOptions,
) -> Result<UploadSummary, IngestError> {
    validate_ocr_languages(&options.ocr_languages)?;
    let files = resolve_source(source).await?;
    let papra = PapraClient::new(config)?;

    let progress: ProgressCallback = options
        .progress
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));

    if !options.ocr_languages.is_empty() {
        info!("OCR languages: {}", options.ocr_languages.join(", "));
    }

    // Manual tags are shared by every file: resolve them once.
    let manual_tags = if options.tags.is_empty() {
        Vec::new()
    } else {
        let tags = papra.ensure_tags_exist(&options.tags).await?;
        info!("Tags ready ({} tag(s)): {}", tags.len(), options.tags.join(", "));
        tags
    };

    let llm = if options.autotag {
        match OpenRouterClient::from_config(config) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("AI tagging unavailable, using manual tags only: {}", e);
                None
            }
        }
    } else {
        None
    };

    let total = files.len();
    progress.on_batch_start(total);
    let mut summary = UploadSummary::default();

    for (i, path) in files.into_iter().enumerate() {
        let index = i + 1;
        progress.on_file_start(index, total, &path);
        info!("[{}/{}] Uploading {}", index, total, path.display());

        let outcome = process_file(
            &papra,
            llm.as_ref(),
            &manual_tags,
            path,
            index,
            options,
            &progress,
        )
        .await;

        match &outcome.error {
            None => progress.on_file_complete(index, total, outcome.document_id.as_deref()),
            Some(e) => progress.on_file_error(index, total, e),
        }
        summary.push(outcome);
    }

    progress.on_batch_complete(summary.total, summary.succeeded);
    info!(
        "Upload finished: {} total, {} succeeded, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
    Ok(summary)
}

/// Tag and upload one file. Never fails; problems end up on the outcome.
async fn process_file(
    papra: &PapraClient,
    llm: Option<&OpenRouterClient>,
    manual_tags: &[Tag],
    path: PathBuf,
    index: usize,
    options: &UploadOptions,
    progress: &ProgressCallback,
) -> FileOutcome {
    let mut outcome = FileOutcome::new(path);
    let warn_file = |outcome: &mut FileOutcome, message: String| {
        warn!("{}: {}", outcome.path.display(), message);
        progress.on_file_warning(index, &message);
        outcome.warnings.push(message);
    };

    let mut tags: Vec<Tag> = manual_tags.to_vec();
    if let Some(llm) = llm {
        match generate_tags_with(llm, &outcome.path, Some(papra)).await {
            Ok(names) => {
                progress.on_tags_generated(index, &names);
                match papra.ensure_tags_exist(&names).await {
                    Ok(generated) => {
                        for tag in generated {
                            if !tags.iter().any(|t| t.id == tag.id) {
                                tags.push(tag);
                            }
                        }
                        outcome.autotagged = true;
                    }
                    Err(e) => warn_file(
                        &mut outcome,
                        format!("Could not create generated tags, using manual tags: {e}"),
                    ),
                }
            }
            Err(e) => warn_file(
                &mut outcome,
                format!("Autotag failed, using manual tags: {e}"),
            ),
        }
    }

    let (result, retries) = upload_with_retry(papra, &outcome.path, index, options, progress).await;
    outcome.retries = retries;

    let document = match result {
        Ok(document) => document,
        Err(e) => {
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    let Some(UploadedDocument { id, .. }) = document else {
        if !tags.is_empty() {
            warn_file(
                &mut outcome,
                "Papra reply carried no document id, tags not attached".to_string(),
            );
        }
        return outcome;
    };
    info!("Uploaded {} as document {}", outcome.path.display(), id);
    outcome.document_id = Some(id.clone());

    if !tags.is_empty() {
        match papra.attach_resolved_tags(&id, &tags).await {
            Ok(()) => outcome.tags = tags.into_iter().map(|t| t.name).collect(),
            Err(e) => warn_file(&mut outcome, format!("Tag attachment warning: {e}")),
        }
    }
    outcome
}

/// Upload with retries for transient failures. Returns the last result and
/// the number of retries that were made.
async fn upload_with_retry(
    papra: &PapraClient,
    path: &Path,
    index: usize,
    options: &UploadOptions,
    progress: &ProgressCallback,
) -> (Result<Option<UploadedDocument>, IngestError>, u32) {
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let backoff = retry_backoff_ms(options.retry_backoff_ms, attempt);
            let message = format!(
                "retry {}/{} after {}ms",
                attempt, options.max_retries, backoff
            );
            warn!("{}: {}", path.display(), message);
            progress.on_file_warning(index, &message);
            sleep(Duration::from_millis(backoff)).await;
        }

        match papra.upload_document(path, &options.ocr_languages).await {
            Ok(document) => return (Ok(document), attempt),
            Err(e) if e.is_retryable() && attempt < options.max_retries => {
                warn!("{}: attempt {} failed: {}", path.display(), attempt + 1, e);
                attempt += 1;
            }
            Err(e) => return (Err(e), attempt),
        }
    }
}

/// Wait before retry `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// saturating instead of overflowing for large retry counts.
fn retry_backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}
