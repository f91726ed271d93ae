//! Anchor-based section extraction with graceful degradation.
//!
//! Filings do not mark their sections structurally once flattened, so the
//! business description is located by searching for its heading and the
//! heading that follows it. When either is missing the extractor falls back
//! to a fixed window; it never fails.

use filinglens_shared::SectionConfig;

/// Anchors and fallback window sizes. Window sizes count characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionAnchors {
    pub start: String,
    pub end: String,
    pub window_chars: usize,
    pub prefix_chars: usize,
}

impl From<&SectionConfig> for SectionAnchors {
    fn from(config: &SectionConfig) -> Self {
        Self {
            start: config.start_anchor.clone(),
            end: config.end_anchor.clone(),
            window_chars: config.window_chars,
            prefix_chars: config.prefix_chars,
        }
    }
}

impl Default for SectionAnchors {
    fn default() -> Self {
        Self::from(&SectionConfig::default())
    }
}

/// Which rule of the degradation chain produced a [`Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionSpan {
    /// Both anchors found: start anchor up to (excluding) the end anchor.
    Bounded,
    /// Only the start anchor found: a window from the start anchor.
    StartWindow,
    /// No start anchor: a prefix of the whole text.
    Prefix,
}

/// A slice of the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    pub text: &'a str,
    pub span: SectionSpan,
}

/// Isolate the section between the anchors.
///
/// The end anchor is searched only after the start anchor. Empty anchors
/// count as not found.
pub fn extract_section<'a>(text: &'a str, anchors: &SectionAnchors) -> Section<'a> {
    let Some(start) = find_anchor(text, &anchors.start) else {
        return Section {
            text: take_chars(text, anchors.prefix_chars),
            span: SectionSpan::Prefix,
        };
    };

    let after_start = start + anchors.start.len();
    if let Some(offset) = find_anchor(&text[after_start..], &anchors.end) {
        return Section {
            text: &text[start..after_start + offset],
            span: SectionSpan::Bounded,
        };
    }

    Section {
        text: take_chars(&text[start..], anchors.window_chars),
        span: SectionSpan::StartWindow,
    }
}

fn find_anchor(haystack: &str, anchor: &str) -> Option<usize> {
    if anchor.is_empty() {
        return None;
    }
    haystack.find(anchor)
}

/// The first `n` characters of `s`, never splitting a character.
fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
