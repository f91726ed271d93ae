//! OpenDART registry client.
//!
//! Wraps the three registry endpoints the pipeline needs:
//! - `corpCode.xml`: the zipped issuer catalog, see [`IssuerCatalog`]
//! - `list.json`: paged filing listings, see [`DartClient::list_filings`]
//! - `document.xml`: a zipped filing document, see [`DartClient::fetch_document`]
//!
//! The API key travels as the `crtfc_key` query parameter. It is never
//! logged and request errors are stripped of their URL before surfacing.

mod archive;
mod filings;
mod issuers;
#[cfg(test)]
mod testutil;

use std::fmt;
use std::time::Duration;

use filinglens_shared::{DartConfig, FilingLensError, Result};
use reqwest::Client;
use tracing::debug;

pub use filings::{FilingPage, format_date, parse_date};
pub use issuers::{IssuerCatalog, IssuerEntry};

/// User-Agent string for registry requests.
const USER_AGENT: &str = concat!("FilingLens/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Connection settings for [`DartClient`].
#[derive(Clone)]
pub struct DartSettings {
    pub api_key: String,
    pub base_url: String,
    /// `pblntf_ty` filter; `A` selects periodic reports.
    pub category_code: String,
    pub page_count: u32,
    /// Upper bound on pages followed by [`DartClient::list_all_filings`].
    pub max_pages: u32,
    pub timeout: Duration,
}

impl DartSettings {
    /// Build settings from the `[dart]` config section and a resolved key.
    pub fn from_config(config: &DartConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            category_code: config.category_code.clone(),
            page_count: config.page_count,
            max_pages: config.max_pages.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl fmt::Debug for DartSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DartSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("category_code", &self.category_code)
            .field("page_count", &self.page_count)
            .field("max_pages", &self.max_pages)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the OpenDART API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DartClient {
    http: Client,
    settings: DartSettings,
}

impl DartClient {
    pub fn new(settings: DartSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                FilingLensError::Upstream(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &DartSettings {
        &self.settings
    }

    /// GET `endpoint` with the API key plus `params`, returning the raw body.
    async fn get_bytes(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
        let url = format!("{}/{endpoint}", self.settings.base_url);
        debug!(%endpoint, ?params, "registry request");

        let response = self
            .http
            .get(&url)
            .query(&[("crtfc_key", self.settings.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| FilingLensError::Upstream(format!("{endpoint}: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FilingLensError::Upstream(format!(
                "{endpoint}: HTTP {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            FilingLensError::Upstream(format!(
                "{endpoint}: failed to read body: {}",
                e.without_url()
            ))
        })?;

        Ok(body.to_vec())
    }
}
