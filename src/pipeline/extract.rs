//! Text extraction: read a PDF's embedded text layer, page count and
//! `/Info` metadata.
//!
//! ## Why spawn_blocking?
//!
//! Parsing the cross-reference table and decoding every content stream is
//! CPU-bound and can take hundreds of milliseconds on large documents.
//! Running it on the blocking pool keeps the Tokio worker threads free for
//! the HTTP calls that surround it.
//!
//! There is no OCR here. A scanned PDF yields an [`ExtractedDocument`] with
//! empty text, which the summary builder handles as a degenerate case.

use crate::error::AutotagError;
use lopdf::{Document, Object};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The PDF header may be preceded by junk; readers accept it within 1 KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Text and metadata pulled out of one PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Concatenated text of all pages, pages separated by a newline.
    pub text: String,
    /// Number of pages in the page tree.
    pub page_count: usize,
    /// String entries of the `/Info` dictionary (`Title`, `Author`, …).
    pub info: BTreeMap<String, String>,
    /// Container facts: `pdf_version`, `encrypted`, `file_size`.
    pub metadata: BTreeMap<String, String>,
}

impl ExtractedDocument {
    /// The `/Info` title, if present and non-blank.
    pub fn title(&self) -> Option<&str> {
        self.info
            .get("Title")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
    }
}

/// Read and parse the PDF at `path`.
///
/// The whole file is loaded into memory before parsing.
pub async fn extract_pdf(path: &Path) -> Result<ExtractedDocument, AutotagError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AutotagError::Extraction {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;

    let owned: PathBuf = path.to_path_buf();
    let doc = tokio::task::spawn_blocking(move || extract_pdf_from_bytes(&bytes, &owned))
        .await
        .map_err(|e| AutotagError::Internal(format!("Extraction task panicked: {e}")))??;

    info!(
        "PDF extracted: {} chars, {} pages",
        doc.text.chars().count(),
        doc.page_count
    );
    Ok(doc)
}

/// Blocking implementation of [`extract_pdf`] over an in-memory buffer.
///
/// `path` is only used for error messages.
pub fn extract_pdf_from_bytes(
    bytes: &[u8],
    path: &Path,
) -> Result<ExtractedDocument, AutotagError> {
    let extraction_err = |detail: String| AutotagError::Extraction {
        path: path.to_path_buf(),
        detail,
    };

    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if !window.windows(4).any(|w| w == b"%PDF") {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(extraction_err(format!(
            "not a PDF (first bytes: {magic:?})"
        )));
    }

    let document =
        Document::load_mem(bytes).map_err(|e| extraction_err(format!("corrupt PDF: {e}")))?;

    let pages = document.get_pages();
    let mut page_texts = Vec::with_capacity(pages.len());
    for &page_number in pages.keys() {
        match document.extract_text(&[page_number]) {
            Ok(text) => page_texts.push(text),
            Err(e) => warn!("Page {}: no extractable text ({})", page_number, e),
        }
    }
    let text = page_texts.join("\n");

    let info = read_info_dictionary(&document);

    let mut metadata = BTreeMap::new();
    metadata.insert("pdf_version".to_string(), document.version.clone());
    metadata.insert(
        "encrypted".to_string(),
        document.trailer.get(b"Encrypt").is_ok().to_string(),
    );
    metadata.insert("file_size".to_string(), bytes.len().to_string());

    debug!(
        "Parsed PDF {}: version {}, {} info entries",
        path.display(),
        document.version,
        info.len()
    );

    Ok(ExtractedDocument {
        text,
        page_count: pages.len(),
        info,
        metadata,
    })
}

/// Collect the string values of the trailer's `/Info` dictionary.
fn read_info_dictionary(document: &Document) -> BTreeMap<String, String> {
    let mut info = BTreeMap::new();

    let Ok(entry) = document.trailer.get(b"Info") else {
        return info;
    };
    let resolved = match entry {
        Object::Reference(id) => match document.get_object(*id) {
            Ok(obj) => obj,
            Err(e) => {
                warn!("Dangling /Info reference: {}", e);
                return info;
            }
        },
        other => other,
    };
    let Ok(dict) = resolved.as_dict() else {
        return info;
    };

    for (key, value) in dict.iter() {
        let value = match value {
            Object::Reference(id) => match document.get_object(*id) {
                Ok(obj) => obj,
                Err(_) => continue,
            },
            other => other,
        };
        if let Object::String(bytes, _) = value {
            if let Some(decoded) = decode_pdf_string(bytes) {
                info.insert(String::from_utf8_lossy(key).into_owned(), decoded);
            }
        }
    }
    info
}

/// Decode a PDF text string.
///
/// UTF-16BE when it starts with the `FE FF` byte-order mark, UTF-8 when it
/// starts with `EF BB BF`, otherwise PDFDocEncoding (treated as Latin-1,
/// which agrees on every printable code point that matters for titles).
pub fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    let decoded = if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units).ok()?
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8(rest.to_vec()).ok()?
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };

    let cleaned: String = decoded.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
