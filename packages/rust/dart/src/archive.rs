//! Archive Fetcher: zipped payload handling for `document.xml` and
//! `corpCode.xml`.

use std::io::{Cursor, Read};

use filinglens_shared::{FilingLensError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info, instrument};
use zip::ZipArchive;

use crate::DartClient;

/// Entry suffixes that hold a filing's markup.
const MARKUP_SUFFIXES: &[&str] = &[".xml", ".html", ".htm"];

/// Upper bound on the buffer reserved up front for one entry.
const MAX_CAPACITY_HINT: usize = 64 << 20;

impl DartClient {
    /// Download a filing's archive and return its primary markup document.
    ///
    /// The first entry in archive order whose name ends in `.xml`, `.html`,
    /// or `.htm` (any case) wins. Its bytes are decoded as UTF-8 with
    /// invalid sequences replaced.
    #[instrument(skip(self))]
    pub async fn fetch_document(&self, receipt_id: &str) -> Result<String> {
        let payload = self
            .get_bytes("document.xml", &[("rcept_no", receipt_id)])
            .await?;

        let document = first_entry(&payload, is_markup_entry)?.ok_or_else(|| {
            FilingLensError::NoContent(format!(
                "archive for {receipt_id} has no .xml/.html entry"
            ))
        })?;

        info!(receipt_id, chars = document.len(), "document fetched");
        Ok(document)
    }
}

fn is_markup_entry(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    MARKUP_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Inflate `payload` and decode the first entry accepted by `accept`.
///
/// A payload that is not a zip but a registry status document becomes an
/// `Upstream` error carrying the registry's message.
pub(crate) fn first_entry(payload: &[u8], accept: fn(&str) -> bool) -> Result<Option<String>> {
    let mut archive = match ZipArchive::new(Cursor::new(payload)) {
        Ok(archive) => archive,
        Err(zip_err) => {
            if let Some(status) = registry_status(payload) {
                return Err(FilingLensError::Upstream(status.to_string()));
            }
            return Err(FilingLensError::parse(format!(
                "payload is not a zip archive: {zip_err}"
            )));
        }
    };

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| FilingLensError::parse(format!("zip entry {index}: {e}")))?;

        if entry.is_dir() || !accept(entry.name()) {
            continue;
        }

        debug!(entry = entry.name(), index, "selected archive entry");
        let mut bytes = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| FilingLensError::parse(format!("zip entry {index}: {e}")))?;

        return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
    }

    Ok(None)
}

/// Entry sizes are declared by the archive header and not trusted beyond a
/// preallocation hint.
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared)
        .unwrap_or(MAX_CAPACITY_HINT)
        .min(MAX_CAPACITY_HINT)
}

// ---------------------------------------------------------------------------
// Registry status documents
// ---------------------------------------------------------------------------

/// `<result><status>..</status><message>..</message></result>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RegistryStatus {
    pub status: String,
    pub message: String,
}

impl std::fmt::Display for RegistryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "registry status {}: {}", self.status, self.message)
    }
}

/// Parse a registry status document, or `None` if `payload` is not one.
pub(crate) fn registry_status(payload: &[u8]) -> Option<RegistryStatus> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut status = None;
    let mut message = None;
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.name().as_ref().to_vec()),
            Ok(Event::Text(t)) => {
                let value = t.unescape().ok()?.into_owned();
                match current.as_deref() {
                    Some(b"status") => status = Some(value),
                    Some(b"message") => message = Some(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    Some(RegistryStatus {
        status: status?,
        message: message.unwrap_or_default(),
    })
}
