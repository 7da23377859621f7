//! Summary building: compress an [`ExtractedDocument`] into at most 2000
//! characters of labeled sections for the tagging prompt.
//!
//! ```text
//! Title: <metadata title or file stem>
//! Type: <invoice|contract|…|unknown>
//! Headings: h1 | h2 | …
//! Key-Entities: e1, e2, …
//! Keywords: k1, k2, …
//! Excerpt (first): …
//! Excerpt (last): …
//! ```
//!
//! Only Title and Type are always present. Documents with (almost) no text
//! get a three-line summary with a note instead, so the model still has the
//! file name to work from.

use crate::pipeline::analyze::{
    detect_document_type, extract_entities, extract_headings, extract_keywords, UNKNOWN_TYPE,
};
use crate::pipeline::extract::ExtractedDocument;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Hard upper bound on the summary length, in characters.
pub const MAX_SUMMARY_CHARS: usize = 2000;

/// Below this many (trimmed) characters the document is treated as empty.
const MIN_TEXT_CHARS: usize = 50;

/// Note emitted for documents without a usable text layer.
pub const SCANNED_NOTE: &str = "Document appears to be empty or scanned (no extractable text)";

const EXCERPT_WINDOW_CHARS: usize = 1000;
const EXCERPT_SENTENCES: usize = 5;
const FIRST_EXCERPT_CHARS: usize = 500;
const LAST_EXCERPT_CHARS: usize = 300;

const SUMMARY_HEADINGS: usize = 8;
const SUMMARY_ENTITIES: usize = 10;
const SUMMARY_KEYWORDS: usize = 12;

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Build the tagging summary for `doc`, titled after `file_name` when the
/// PDF carries no title of its own.
pub fn build_document_summary(doc: &ExtractedDocument, file_name: &str) -> String {
    let stem = file_stem(file_name);

    if doc.text.trim().chars().count() < MIN_TEXT_CHARS {
        warn!(
            "PDF has minimal/no text ({} chars). This may be a scanned document.",
            doc.text.chars().count()
        );
        return format!("Title: {stem}\nType: {UNKNOWN_TYPE}\nNote: {SCANNED_NOTE}");
    }

    let title = doc.title().unwrap_or(stem);
    let headings = extract_headings(&doc.text);
    let entities = extract_entities(&doc.text);
    let keywords = extract_keywords(&doc.text);
    let doc_type = detect_document_type(&doc.text, &headings);

    let total_chars = doc.text.chars().count();
    let chars_per_page = total_chars as f64 / doc.page_count.max(1) as f64;
    let window = ((chars_per_page * 1.5) as usize).min(EXCERPT_WINDOW_CHARS);

    let first_text = take_chars(&doc.text, window);
    let first_excerpt = take_chars(
        &RE_SENTENCE_END
            .split(first_text)
            .take(EXCERPT_SENTENCES)
            .collect::<Vec<_>>()
            .join(". "),
        FIRST_EXCERPT_CHARS,
    )
    .trim()
    .to_string();

    let last_text = skip_chars(&doc.text, total_chars.saturating_sub(window));
    let sentences: Vec<&str> = RE_SENTENCE_END.split(last_text).collect();
    let tail = &sentences[sentences.len().saturating_sub(EXCERPT_SENTENCES)..];
    let last_excerpt = take_chars(&tail.join(". "), LAST_EXCERPT_CHARS)
        .trim()
        .to_string();

    let mut summary = format!("Title: {title}\nType: {doc_type}\n");

    if !headings.is_empty() {
        let shown = &headings[..headings.len().min(SUMMARY_HEADINGS)];
        summary.push_str(&format!("Headings: {}\n", shown.join(" | ")));
    }
    if !entities.is_empty() {
        let shown = &entities[..entities.len().min(SUMMARY_ENTITIES)];
        summary.push_str(&format!("Key-Entities: {}\n", shown.join(", ")));
    }
    if !keywords.is_empty() {
        let shown = &keywords[..keywords.len().min(SUMMARY_KEYWORDS)];
        summary.push_str(&format!("Keywords: {}\n", shown.join(", ")));
    }
    if !first_excerpt.is_empty() {
        summary.push_str(&format!("Excerpt (first): {first_excerpt}\n"));
    }
    if !last_excerpt.is_empty() && last_excerpt != first_excerpt {
        summary.push_str(&format!("Excerpt (last): {last_excerpt}\n"));
    }

    let summary = take_chars(&summary, MAX_SUMMARY_CHARS).to_string();
    debug!("Summary generated: {} chars", summary.chars().count());
    summary
}

/// File name without a trailing `.pdf` (any case).
fn file_stem(file_name: &str) -> &str {
    let cut = file_name.len().saturating_sub(4);
    match file_name.get(cut..) {
        Some(ext) if ext.eq_ignore_ascii_case(".pdf") => &file_name[..cut],
        _ => file_name,
    }
}

/// The first `n` characters of `s`.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `s` without its first `n` characters.
fn skip_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str, pages: usize) -> ExtractedDocument {
        ExtractedDocument {
            text: text.to_string(),
            page_count: pages,
            ..Default::default()
        }
    }

    #[test]
    fn empty_text_gives_minimal_summary() {
        let s = build_document_summary(&doc("", 3), "Scan_0001.PDF");
        assert_eq!(
            s,
            "Title: Scan_0001\nType: unknown\nNote: Document appears to be empty or scanned (no extractable text)"
        );
        for section in ["Headings:", "Key-Entities:", "Keywords:", "Excerpt"] {
            assert!(!s.contains(section), "unexpected {section} in {s}");
        }
    }

    #[test]
    fn short_text_counts_as_empty() {
        let s = build_document_summary(&doc("   page 1 of 1   ", 1), "x.pdf");
        assert!(s.contains("Type: unknown"));
        assert!(s.contains("scanned"));
    }

    #[test]
    fn metadata_title_wins_over_file_name() {
        let mut d = doc(&"Quarterly results were strong. ".repeat(10), 1);
        d.info.insert("Title".into(), "Q3 Results".into());
        let s = build_document_summary(&d, "upload.pdf");
        assert!(s.starts_with("Title: Q3 Results\n"), "got: {s}");
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let text = "INVOICE SUMMARY\nBilled to billing@acme.io on 01/02/2024. Amount due $1,200.00. \
                    Payment terms are thirty days. Please remit payment promptly.\n\
                    Thank you for your business. Questions go to billing. Late fees apply after the due date. \
                    Final notice follows. Keep this copy.";
        let s = build_document_summary(&doc(text, 1), "inv.pdf");
        let labels = [
            "Title:",
            "Type:",
            "Headings:",
            "Key-Entities:",
            "Keywords:",
            "Excerpt (first):",
            "Excerpt (last):",
        ];
        let positions: Vec<usize> = labels
            .iter()
            .map(|l| s.find(l).unwrap_or_else(|| panic!("missing {l} in {s}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "order wrong: {s}");
        assert!(s.contains("Type: invoice"));
        assert!(s.contains("Headings: INVOICE SUMMARY"));
    }

    #[test]
    fn identical_excerpts_are_not_repeated() {
        let text = "One short paragraph that says the same thing from start to end";
        let s = build_document_summary(&doc(text, 1), "a.pdf");
        assert!(s.contains("Excerpt (first):"));
        assert!(!s.contains("Excerpt (last):"), "got: {s}");
    }

    #[test]
    fn long_input_is_capped() {
        let mut d = doc(&"ANNUAL REPORT SECTION\nRevenue grew. ".repeat(5000), 40);
        d.info.insert("Title".into(), "T".repeat(5000));
        let s = build_document_summary(&d, "big.pdf");
        assert!(s.chars().count() <= MAX_SUMMARY_CHARS);
    }

    #[test]
    fn file_stem_strips_pdf_extension_only() {
        assert_eq!(file_stem("report.pdf"), "report");
        assert_eq!(file_stem("REPORT.Pdf"), "REPORT");
        assert_eq!(file_stem("notes.txt"), "notes.txt");
        assert_eq!(file_stem("é.pdf"), "é");
        assert_eq!(file_stem("ab"), "ab");
    }

    #[test]
    fn char_helpers_respect_boundaries() {
        assert_eq!(take_chars("héllo", 2), "hé");
        assert_eq!(take_chars("hi", 5), "hi");
        assert_eq!(skip_chars("héllo", 2), "llo");
        assert_eq!(skip_chars("hi", 5), "");
    }
}
