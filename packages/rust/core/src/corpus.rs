//! Assembly of the summarizer's input from normalized documents.

use filinglens_shared::NormalizedDocument;

/// Width of the closing rule under each document block.
const RULE_WIDTH: usize = 58;

/// Header line naming a document's filing.
pub fn delimiter(doc: &NormalizedDocument) -> String {
    format!(
        "=== [Filing: {} (received {})] ===",
        doc.title,
        display_date(&doc.receipt_date)
    )
}

/// Concatenate documents in the given order, each wrapped in a delimiter
/// block. Documents with blank text contribute nothing.
pub fn assemble(documents: &[NormalizedDocument]) -> String {
    let rule = "=".repeat(RULE_WIDTH);

    documents
        .iter()
        .filter(|doc| !doc.text.trim().is_empty())
        .map(|doc| format!("{}\n{}\n{rule}", delimiter(doc), doc.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `20240312` -> `2024-03-12`; anything else is shown as-is.
fn display_date(date: &str) -> String {
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}-{}-{}", &date[..4], &date[4..6], &date[6..])
    } else {
        date.to_string()
    }
}
