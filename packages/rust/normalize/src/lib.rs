//! Markup-to-text normalization and section extraction.
//!
//! Converts a filing's raw markup (DART XML or HTML) into a canonical flat
//! text: non-content nodes are dropped, tables become pipe-delimited rows,
//! and whitespace is canonicalized by the passes in `cleanup`. The
//! [`section`] module then isolates the business description.

mod cleanup;
pub mod section;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, instrument};

pub use section::{Section, SectionAnchors, SectionSpan, extract_section};

/// Elements whose subtree never carries document content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "head", "meta", "iframe", "noscript", "object", "embed", "template",
];

/// Elements that start and end on their own line.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "div", "dl", "dt",
    "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "title", "ul",
    // Registry document structure
    "cover", "cover-title", "document", "document-name", "library", "part", "pgbrk",
    "section-1", "section-2", "section-3",
];

/// Table cell tags. `te`/`tu` are rewritten to `td` before parsing.
const CELL_TAGS: &[&str] = &["td", "th"];

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Normalize raw filing markup into flat text.
///
/// This is the main entry point. It:
/// 1. Maps registry-specific cell tags onto HTML cells
/// 2. Parses the markup and walks the tree, skipping non-content nodes
/// 3. Linearizes every table into pipe-delimited rows
/// 4. Runs the whitespace cleanup pipeline
///
/// The output is a pure function of the input. Entities are decoded, so
/// re-normalizing is a no-op only when the output carries no text that
/// reads as markup: escaped tags like `&lt;b&gt;` come out as `<b>` and a
/// second pass strips them.
#[instrument(skip_all, fields(raw_len = raw.len()))]
pub fn normalize(raw: &str) -> String {
    let markup = rewrite_registry_cells(raw);
    let doc = Html::parse_document(&markup);

    let mut text = String::with_capacity(markup.len() / 2);
    walk(doc.root_element(), &mut text);

    let cleaned = cleanup::run_pipeline(&text);
    debug!(text_len = cleaned.len(), "normalization complete");
    cleaned
}

/// DART marks table cells with `<TE>` and `<TU>`. An HTML parser would
/// foster-parent unknown elements out of the table, so rename them to `td`.
fn rewrite_registry_cells(raw: &str) -> String {
    static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)<(/?)t[eu]([\s>/])").expect("valid regex")
    });

    CELL_RE.replace_all(raw, "<${1}td${2}").into_owned()
}

/// Append the visible text under `element` to `out`.
fn walk(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_TAGS.contains(&name) {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                match name {
                    "table" => out.push_str(&render_table(child_el)),
                    "br" => out.push('\n'),
                    _ if BLOCK_TAGS.contains(&name) => {
                        out.push('\n');
                        walk(child_el, out);
                        out.push('\n');
                    }
                    _ => walk(child_el, out),
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Table linearization
// ---------------------------------------------------------------------------

/// Convert a table element to pipe-delimited rows.
///
/// The first row made only of header cells becomes the column header and is
/// followed by a `| --- |` separator. Without such a row the table is
/// rendered as body rows only. Nested tables are flattened into their cell.
fn render_table(table: ElementRef<'_>) -> String {
    let mut header: Option<Vec<String>> = None;
    let mut body: Vec<Vec<String>> = Vec::new();

    for tr in own_rows(table) {
        let cells: Vec<(bool, String)> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| CELL_TAGS.contains(&cell.value().name()))
            .map(|cell| (cell.value().name() == "th", cell_text(cell)))
            .collect();

        if cells.iter().all(|(_, text)| text.is_empty()) {
            continue;
        }

        let all_header = cells.iter().all(|(is_th, _)| *is_th);
        let texts: Vec<String> = cells.into_iter().map(|(_, text)| text).collect();

        if header.is_none() && all_header {
            header = Some(texts);
        } else {
            body.push(texts);
        }
    }

    if header.is_none() && body.is_empty() {
        return String::new();
    }

    let mut out = String::from("\n");

    if let Some(header) = &header {
        push_row(&mut out, header);
        let separator: Vec<&str> = header.iter().map(|_| "---").collect();
        out.push_str("| ");
        out.push_str(&separator.join(" | "));
        out.push_str(" |\n");
    }

    for row in &body {
        push_row(&mut out, row);
    }

    out.push('\n');
    out
}

fn push_row(out: &mut String, cells: &[String]) {
    out.push_str("| ");
    out.push_str(&cells.join(" | "));
    out.push_str(" |\n");
}

/// Rows that belong to `table` itself, skipping rows of nested tables.
fn own_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    fn collect<'a>(parent: ElementRef<'a>, rows: &mut Vec<ElementRef<'a>>) {
        for child in parent.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "tr" => rows.push(child),
                "table" => {}
                _ => collect(child, rows),
            }
        }
    }

    let mut rows = Vec::new();
    collect(table, &mut rows);
    rows
}

/// Whitespace-collapsed text of one cell.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
