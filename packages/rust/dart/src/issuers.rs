//! Issuer Resolver: maps a user token (trading id or company name) to the
//! registry's canonical issuer identifier.

use std::sync::LazyLock;

use filinglens_shared::{FilingLensError, IssuerInfo, Result, UNLISTED_TRADING_ID};
use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use tracing::{debug, info, instrument, warn};

use crate::DartClient;
use crate::archive::first_entry;

/// A token made only of digits is a trading id.
static TRADING_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// One row of the registry's issuer catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuerEntry {
    pub corp_code: String,
    pub corp_name: String,
    /// Blank for unlisted issuers.
    pub stock_code: String,
    pub modify_date: String,
}

impl IssuerEntry {
    pub fn is_listed(&self) -> bool {
        !self.stock_code.is_empty()
    }

    pub fn to_info(&self) -> IssuerInfo {
        IssuerInfo {
            issuer_id: self.corp_code.clone(),
            trading_id: if self.is_listed() {
                self.stock_code.clone()
            } else {
                UNLISTED_TRADING_ID.to_string()
            },
            display_name: self.corp_name.clone(),
        }
    }
}

/// The full issuer catalog, in registry order.
#[derive(Debug, Clone, Default)]
pub struct IssuerCatalog {
    entries: Vec<IssuerEntry>,
}

#[derive(Clone, Copy)]
enum Field {
    CorpCode,
    CorpName,
    StockCode,
    ModifyDate,
}

impl IssuerCatalog {
    pub fn from_entries(entries: Vec<IssuerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[IssuerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `CORPCODE.xml`: a `<result>` of `<list>` rows.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut entries = Vec::new();
        let mut row: Option<IssuerEntry> = None;
        let mut field: Option<Field> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    field = None;
                    match e.name().as_ref() {
                        b"list" => row = Some(IssuerEntry::default()),
                        b"corp_code" => field = Some(Field::CorpCode),
                        b"corp_name" => field = Some(Field::CorpName),
                        b"stock_code" => field = Some(Field::StockCode),
                        b"modify_date" => field = Some(Field::ModifyDate),
                        _ => {}
                    }
                }
                Ok(Event::Text(t)) => {
                    let (Some(entry), Some(field)) = (row.as_mut(), field) else {
                        continue;
                    };
                    let value = t
                        .unescape()
                        .map_err(|e| FilingLensError::parse(format!("issuer catalog: {e}")))?;
                    let value = value.trim().to_string();
                    match field {
                        Field::CorpCode => entry.corp_code = value,
                        Field::CorpName => entry.corp_name = value,
                        Field::StockCode => entry.stock_code = value,
                        Field::ModifyDate => entry.modify_date = value,
                    }
                }
                Ok(Event::End(e)) => {
                    field = None;
                    if e.name().as_ref() == b"list" {
                        if let Some(entry) = row.take() {
                            entries.push(entry);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(FilingLensError::parse(format!(
                        "issuer catalog at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        debug!(entries = entries.len(), "issuer catalog parsed");
        Ok(Self { entries })
    }

    /// Resolve a token to an issuer.
    ///
    /// All-digit tokens match trading ids exactly. Anything else matches a
    /// registered name exactly, then falls back to the first name that
    /// starts with the token, in catalog order.
    pub fn resolve(&self, token: &str) -> Result<IssuerInfo> {
        let token = token.trim();
        if token.is_empty() {
            return Err(FilingLensError::validation("issuer token is empty"));
        }

        let entry = if TRADING_ID_RE.is_match(token) {
            self.by_trading_id(token)
        } else {
            self.by_name(token)
        };

        let entry = entry.ok_or_else(|| {
            FilingLensError::not_found(format!("no issuer matches '{token}'"))
        })?;

        debug!(token, corp_code = %entry.corp_code, name = %entry.corp_name, "issuer resolved");
        Ok(entry.to_info())
    }

    fn by_trading_id(&self, token: &str) -> Option<&IssuerEntry> {
        let mut matches = self.entries.iter().filter(|e| e.stock_code == token);
        let first = matches.next()?;
        let extra = matches.count();
        if extra > 0 {
            warn!(token, extra, "trading id matches several issuers; using the first");
        }
        Some(first)
    }

    fn by_name(&self, token: &str) -> Option<&IssuerEntry> {
        self.entries
            .iter()
            .find(|e| e.corp_name == token)
            .or_else(|| self.entries.iter().find(|e| e.corp_name.starts_with(token)))
    }
}

impl DartClient {
    /// Download and parse the registry's issuer catalog.
    #[instrument(skip(self))]
    pub async fn issuer_catalog(&self) -> Result<IssuerCatalog> {
        let payload = self.get_bytes("corpCode.xml", &[]).await?;

        let xml = first_entry(&payload, |name| name.to_ascii_lowercase().ends_with(".xml"))?
            .ok_or_else(|| {
                FilingLensError::NoContent("issuer catalog archive has no .xml entry".into())
            })?;

        let catalog = IssuerCatalog::parse(&xml)?;
        info!(issuers = catalog.len(), "issuer catalog loaded");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{client_for, zip_of};

    const CATALOG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<result>
    <list>
        <corp_code>00434003</corp_code>
        <corp_name>다코</corp_name>
        <stock_code> </stock_code>
        <modify_date>20170630</modify_date>
    </list>
    <list>
        <corp_code>00126380</corp_code>
        <corp_name>삼성전자</corp_name>
        <stock_code>005930</stock_code>
        <modify_date>20230110</modify_date>
    </list>
    <list>
        <corp_code>00126371</corp_code>
        <corp_name>삼성전기</corp_name>
        <stock_code>009150</stock_code>
        <modify_date>20230110</modify_date>
    </list>
    <list>
        <corp_code>00164742</corp_code>
        <corp_name>현대자동차</corp_name>
        <stock_code>005380</stock_code>
        <modify_date>20230110</modify_date>
    </list>
    <list>
        <corp_code>00999999</corp_code>
        <corp_name>R&amp;D홀딩스</corp_name>
        <stock_code>005380</stock_code>
        <modify_date>20230110</modify_date>
    </list>
</result>"#;

    fn catalog() -> IssuerCatalog {
        IssuerCatalog::parse(CATALOG_XML).unwrap()
    }

    #[test]
    fn parses_rows_in_order() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.entries()[1].corp_code, "00126380");
        assert_eq!(catalog.entries()[1].modify_date, "20230110");
        assert_eq!(catalog.entries()[4].corp_name, "R&D홀딩스");
    }

    #[test]
    fn blank_stock_code_is_unlisted() {
        let info = catalog().resolve("다코").unwrap();
        assert_eq!(info.trading_id, UNLISTED_TRADING_ID);
        assert_eq!(info.issuer_id, "00434003");
    }

    #[test]
    fn resolves_by_trading_id() {
        let info = catalog().resolve("005930").unwrap();
        assert_eq!(info.issuer_id, "00126380");
        assert_eq!(info.trading_id, "005930");
        assert_eq!(info.display_name, "삼성전자");
    }

    #[test]
    fn duplicate_trading_id_takes_first() {
        let info = catalog().resolve("005380").unwrap();
        assert_eq!(info.issuer_id, "00164742");
    }

    #[test]
    fn trading_id_never_matches_names() {
        let err = catalog().resolve("00126380").unwrap_err();
        assert!(matches!(err, FilingLensError::NotFound { .. }));
    }

    #[test]
    fn exact_name_beats_prefix() {
        let info = catalog().resolve("삼성전기").unwrap();
        assert_eq!(info.issuer_id, "00126371");
    }

    #[test]
    fn prefix_takes_first_in_catalog_order() {
        let info = catalog().resolve("삼성").unwrap();
        assert_eq!(info.issuer_id, "00126380");
        assert_eq!(info.display_name, "삼성전자");
    }

    #[test]
    fn token_is_trimmed() {
        let info = catalog().resolve("  005930 \n").unwrap();
        assert_eq!(info.issuer_id, "00126380");
    }

    #[test]
    fn empty_token_is_validation_error() {
        let err = catalog().resolve("   ").unwrap_err();
        assert!(matches!(err, FilingLensError::Validation { .. }));
    }

    #[test]
    fn unknown_name_is_not_found() {
        let err = catalog().resolve("없는회사").unwrap_err();
        assert!(matches!(err, FilingLensError::NotFound { .. }));
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let err = IssuerCatalog::parse("<result><list><corp_code>1</corp_name></list>").unwrap_err();
        assert!(matches!(err, FilingLensError::Parse { .. }));
    }

    #[tokio::test]
    async fn downloads_zipped_catalog() {
        let server = wiremock::MockServer::start().await;
        let payload = zip_of(&[("CORPCODE.xml", CATALOG_XML.as_bytes())]);

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/corpCode.xml"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(payload))
            .mount(&server)
            .await;

        let catalog = client_for(&server).issuer_catalog().await.unwrap();
        assert_eq!(catalog.len(), 5);
    }

    #[tokio::test]
    async fn catalog_archive_without_xml_is_no_content() {
        let server = wiremock::MockServer::start().await;
        let payload = zip_of(&[("readme.txt", b"nothing here")]);

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/corpCode.xml"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_bytes(payload))
            .mount(&server)
            .await;

        let err = client_for(&server).issuer_catalog().await.unwrap_err();
        assert!(matches!(err, FilingLensError::NoContent(_)));
    }
}
