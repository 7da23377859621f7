//! Heuristic text analysis: headings, entities, keywords and a coarse
//! document-type label.
//!
//! Every function here is pure and deterministic: same text in, same result
//! out, no I/O. The caps (10 headings, 5/5/3/3 entities, 15 keywords) are
//! fixed constants tuned by hand; they bound the size of the summary the
//! LLM sees rather than aiming for completeness.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Maximum headings returned by [`extract_headings`].
pub const MAX_HEADINGS: usize = 10;
/// Maximum entities returned by [`extract_entities`].
pub const MAX_ENTITIES: usize = 15;
/// Maximum keywords returned by [`extract_keywords`].
pub const MAX_KEYWORDS: usize = 15;

const MAX_DATES: usize = 5;
const MAX_AMOUNTS: usize = 5;
const MAX_EMAILS: usize = 3;
const MAX_IDS: usize = 3;

/// Only this many leading characters take part in type detection.
const TYPE_WINDOW_CHARS: usize = 2000;

// ── Headings ─────────────────────────────────────────────────────────────────

static RE_TITLE_CASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][a-z]+(\s+[A-Z][a-z]+)+").unwrap());

static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.|\d+\)|\([a-z]\)|\([0-9]\))").unwrap());

/// Scan lines for heading-like text, in document order, at most 10.
///
/// A trimmed line of 3–100 characters counts when it is fully upper-case
/// with at least two tokens, starts with two or more capitalised words, or
/// starts with a list marker such as `1.`, `2)`, `(a)` or `(3)`.
pub fn extract_headings(text: &str) -> Vec<String> {
    let mut headings = Vec::new();

    for line in text.lines().map(str::trim) {
        let len = line.chars().count();
        if !(3..=100).contains(&len) {
            continue;
        }

        let all_caps = line == line.to_uppercase() && line.split_whitespace().count() >= 2;
        if all_caps || RE_TITLE_CASE.is_match(line) || RE_LIST_MARKER.is_match(line) {
            headings.push(line.to_string());
        }

        if headings.len() >= MAX_HEADINGS {
            break;
        }
    }

    headings
}

// ── Entities ─────────────────────────────────────────────────────────────────

static RE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}[/\-]\d{1,2}[/\-]\d{1,2}|\w+ \d{1,2},? \d{4})\b",
    )
    .unwrap()
});

static RE_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\$€£¥]\s?\d{1,3}(,\d{3})*(\.\d{2})?").unwrap());

static RE_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b").unwrap()
});

static RE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(INV|ORDER|REF|NO)[:\s#-]*[A-Z0-9-]{5,}\b").unwrap());

/// Pull dates, currency amounts, e-mail addresses and reference IDs.
///
/// Families are scanned independently, each capped (5 dates, 5 amounts,
/// 3 e-mails, 3 IDs), then concatenated in that order and capped at 15.
pub fn extract_entities(text: &str) -> Vec<String> {
    let families: [(&Regex, usize); 4] = [
        (&*RE_DATE, MAX_DATES),
        (&*RE_AMOUNT, MAX_AMOUNTS),
        (&*RE_EMAIL, MAX_EMAILS),
        (&*RE_ID, MAX_IDS),
    ];

    families
        .iter()
        .flat_map(|(re, cap)| re.find_iter(text).take(*cap).map(|m| m.as_str().to_string()))
        .take(MAX_ENTITIES)
        .collect()
}

// ── Keywords ─────────────────────────────────────────────────────────────────

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").unwrap());

/// Terms that are never keywords, applied after ranking.
const KEYWORD_STOP_LIST: [&str; 7] = ["this", "that", "with", "from", "have", "been", "will"];

/// General English function words, dropped while tokenising.
///
/// Only entries longer than three characters are listed; shorter tokens are
/// discarded by the length rule anyway.
const ENGLISH_STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "another", "because", "before", "being",
    "below", "between", "both", "came", "cannot", "come", "could", "does", "doing", "during",
    "each", "further", "here", "himself", "into", "itself", "like", "make", "many", "might",
    "more", "most", "much", "must", "myself", "never", "only", "other", "ours", "ourselves",
    "over", "said", "same", "should", "since", "some", "still", "such", "take", "than",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "those",
    "through", "under", "until", "very", "well", "were", "what", "when", "where", "which", "while",
    "whom", "would", "your", "yours", "yourself",
];

/// Rank terms by TF-IDF with the whole document as the only corpus entry.
///
/// With a single document every term has the same inverse document
/// frequency, so the ranking reduces to term frequency; ties keep the order
/// in which terms first appear. Terms of three characters or fewer and the
/// fixed stop list are dropped. Returns at most 15 terms.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in RE_NON_WORD.split(&lowered).filter(|t| !t.is_empty()) {
        if ENGLISH_STOP_WORDS.contains(&token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // One document in the corpus, and it contains every term.
    let documents = 1.0_f64;
    let idf = 1.0 + (documents / (1.0 + 1.0)).ln();

    let mut scored: Vec<(&str, f64)> = order
        .into_iter()
        .map(|term| (term, counts[term] as f64 * idf))
        .collect();
    // Stable sort: equal scores stay in first-occurrence order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    scored
        .into_iter()
        .map(|(term, _)| term)
        .filter(|term| term.chars().count() > 3 && !KEYWORD_STOP_LIST.contains(term))
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

// ── Document type ────────────────────────────────────────────────────────────

/// One row of the classification table: every pattern must match.
struct TypeRule {
    label: &'static str,
    patterns: &'static [&'static str],
}

/// Evaluated top to bottom; the first rule whose patterns all match wins.
const TYPE_RULES: &[TypeRule] = &[
    TypeRule {
        label: "invoice",
        patterns: &[r"invoice|bill|payment|amount due", r"\$|€|£|total"],
    },
    TypeRule {
        label: "contract",
        patterns: &[r"contract|agreement|terms|parties"],
    },
    TypeRule {
        label: "resume",
        patterns: &[r"resume|curriculum vitae|cv|experience|education"],
    },
    TypeRule {
        label: "report",
        patterns: &[r"report|analysis|summary|findings|conclusion"],
    },
    TypeRule {
        label: "proposal",
        patterns: &[r"proposal|recommendation|objective"],
    },
    TypeRule {
        label: "statement",
        patterns: &[r"statement|account|balance"],
    },
    TypeRule {
        label: "receipt",
        patterns: &[r"receipt|purchase|transaction"],
    },
];

/// Label used when no rule matches.
pub const UNKNOWN_TYPE: &str = "unknown";

static TYPE_MATCHERS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    TYPE_RULES
        .iter()
        .map(|rule| {
            let compiled = rule
                .patterns
                .iter()
                .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
                .collect();
            (rule.label, compiled)
        })
        .collect()
});

/// Classify the document from keyword groups in its first 2000 characters
/// (text followed by the headings).
pub fn detect_document_type(text: &str, headings: &[String]) -> &'static str {
    let combined = format!(
        "{} {}",
        text.to_lowercase(),
        headings.join(" ").to_lowercase()
    );
    let window: String = combined.chars().take(TYPE_WINDOW_CHARS).collect();

    TYPE_MATCHERS
        .iter()
        .find(|(_, patterns)| patterns.iter().all(|re| re.is_match(&window)))
        .map(|(label, _)| *label)
        .unwrap_or(UNKNOWN_TYPE)
}
