//! Whitespace cleanup pipeline for extracted text.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Every pass is idempotent, so the pipeline is too.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleanup pipeline on raw extracted text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = normalize_line_endings(text);

    result = collapse_inline_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = trim_document(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Line endings
// ---------------------------------------------------------------------------

/// Convert `\r\n` and lone `\r` to `\n`.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Inline whitespace
// ---------------------------------------------------------------------------

/// Collapse runs of non-newline whitespace (including NBSP) to one space
/// and trim every line.
fn collapse_inline_whitespace(text: &str) -> String {
    static INLINE_WS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[^\S\n]+").expect("valid regex")
    });

    text.lines()
        .map(|line| INLINE_WS_RE.replace_all(line, " "))
        .map(|line| line.trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Blank lines
// ---------------------------------------------------------------------------

/// Collapse any run of blank lines into exactly one.
fn collapse_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\n{3,}").expect("valid regex")
    });

    MULTI_BLANK_RE.replace_all(text, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 4: Document edges
// ---------------------------------------------------------------------------

fn trim_document(text: &str) -> String {
    text.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
