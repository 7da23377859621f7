//! Batch results returned by [`crate::upload::upload_pdfs`].
//!
//! Both types serialise to JSON so the binary can print a machine-readable
//! report with `--json`.

use serde::Serialize;
use std::path::PathBuf;

/// What happened to one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    /// The PDF that was processed.
    pub path: PathBuf,
    /// Papra's id for the uploaded document, when the reply carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    /// Names of the tags attached to the document.
    pub tags: Vec<String>,
    /// Whether LLM-generated tags were merged into `tags`.
    pub autotagged: bool,
    /// Non-fatal problems: autotag fallback, tag attachment failure.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Number of upload retries that were needed.
    pub retries: u32,
    /// Why the upload failed. `None` on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// True when the file reached Papra.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Totals and per-file outcomes for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl UploadSummary {
    /// Record one file and update the counters.
    pub fn push(&mut self, outcome: FileOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.files.push(outcome);
    }

    /// True when at least one file failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}
