//! Normalization of raw extracted text before chunking.
//!
//! Extraction (text layer or OCR) tends to leave behind page counters such as `Page 3 of 12`,
//! large vertical gaps between pages, and stray whitespace at the edges. [`sanitize`] removes
//! those artifacts while keeping paragraph breaks intact.

use regex::Regex;
use std::sync::OnceLock;

static PAGE_ARTIFACT: OnceLock<Regex> = OnceLock::new();
static BLANK_RUN: OnceLock<Regex> = OnceLock::new();

fn page_artifact() -> &'static Regex {
    PAGE_ARTIFACT.get_or_init(|| {
        Regex::new(r"(?i)page\s+\d+(?:\s+of\s+\d+)?").expect("page artifact pattern is valid")
    })
}

fn blank_run() -> &'static Regex {
    BLANK_RUN.get_or_init(|| Regex::new(r"\n{2,}").expect("blank run pattern is valid"))
}

/// Normalize raw extracted text.
///
/// - Removes every case-insensitive `Page <n>` / `Page <n> of <m>` artifact, wherever it sits:
///   `homepage 4` loses its `page 4` and `Page 12abc` becomes `abc`. Removal repeats until
///   nothing matches, so stripping one counter never leaves a new one behind.
/// - Collapses runs of two or more newlines into exactly one blank line.
/// - Trims leading and trailing whitespace.
///
/// Empty input yields an empty string.
pub fn sanitize(text: &str) -> String {
    let mut cleaned = text.to_string();
    while page_artifact().is_match(&cleaned) {
        cleaned = page_artifact().replace_all(&cleaned, "").into_owned();
    }
    let collapsed = blank_run().replace_all(&cleaned, "\n\n");
    collapsed.trim().to_string()
}
