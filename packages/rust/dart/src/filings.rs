//! Filing Catalog Client: paged `list.json` queries.

use chrono::NaiveDate;
use filinglens_shared::{FilingLensError, FilingRecord, Result, UNLISTED_TRADING_ID};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::DartClient;

/// Registry date format.
const DATE_FORMAT: &str = "%Y%m%d";

/// Request succeeded.
const STATUS_OK: &str = "000";
/// Request succeeded but nothing matched.
const STATUS_NO_DATA: &str = "013";

/// Format a date the way the registry expects (`YYYYMMDD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a registry `YYYYMMDD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 {
        return Err(FilingLensError::validation(format!(
            "date '{value}' is not in YYYYMMDD form"
        )));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| FilingLensError::validation(format!("date '{value}': {e}")))
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    page_no: Option<u32>,
    #[serde(default)]
    total_page: Option<u32>,
    #[serde(default)]
    list: Vec<ListRow>,
}

#[derive(Debug, Deserialize)]
struct ListRow {
    rcept_no: String,
    report_nm: String,
    rcept_dt: String,
    corp_code: String,
    #[serde(default)]
    stock_code: String,
}

impl From<ListRow> for FilingRecord {
    fn from(row: ListRow) -> Self {
        let stock_code = row.stock_code.trim();
        Self {
            receipt_id: row.rcept_no,
            title: row.report_nm.trim().to_string(),
            receipt_date: row.rcept_dt,
            issuer_id: row.corp_code,
            trading_id: if stock_code.is_empty() {
                UNLISTED_TRADING_ID.to_string()
            } else {
                stock_code.to_string()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// FilingPage
// ---------------------------------------------------------------------------

/// One page of catalog results, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingPage {
    pub records: Vec<FilingRecord>,
    pub page_no: u32,
    pub total_pages: u32,
}

impl FilingPage {
    fn empty(page_no: u32) -> Self {
        Self {
            records: Vec::new(),
            page_no,
            total_pages: 0,
        }
    }

    /// True when the registry says no page follows this one.
    pub fn is_exhausted(&self) -> bool {
        self.page_no >= self.total_pages
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl DartClient {
    /// Fetch one page of filings for `issuer_id` received in `[start, end]`.
    #[instrument(skip(self, start, end), fields(start = %start, end = %end))]
    pub async fn list_filings(
        &self,
        issuer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        page_no: u32,
    ) -> Result<FilingPage> {
        if start > end {
            return Err(FilingLensError::validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        if issuer_id.trim().is_empty() {
            return Err(FilingLensError::validation("issuer id is empty"));
        }

        let bgn_de = format_date(start);
        let end_de = format_date(end);
        let page = page_no.max(1).to_string();
        let page_count = self.settings.page_count.to_string();

        let body = self
            .get_bytes(
                "list.json",
                &[
                    ("corp_code", issuer_id),
                    ("bgn_de", bgn_de.as_str()),
                    ("end_de", end_de.as_str()),
                    ("pblntf_ty", self.settings.category_code.as_str()),
                    ("page_no", page.as_str()),
                    ("page_count", page_count.as_str()),
                ],
            )
            .await?;

        let response: ListResponse = serde_json::from_slice(&body)
            .map_err(|e| FilingLensError::parse(format!("list.json: {e}")))?;

        match response.status.as_str() {
            STATUS_OK => {}
            STATUS_NO_DATA => {
                debug!(issuer_id, "registry reports no filings");
                return Ok(FilingPage::empty(page_no.max(1)));
            }
            status => {
                return Err(FilingLensError::Upstream(format!(
                    "registry status {status}: {}",
                    response.message
                )));
            }
        }

        let page_no = response.page_no.unwrap_or(page_no.max(1));
        let records: Vec<FilingRecord> = response.list.into_iter().map(Into::into).collect();
        let total_pages = response.total_page.unwrap_or(page_no);

        debug!(issuer_id, page_no, total_pages, count = records.len(), "filing page");
        Ok(FilingPage {
            records,
            page_no,
            total_pages,
        })
    }

    /// Follow pages until the registry is exhausted or `max_pages` is reached.
    #[instrument(skip(self, start, end), fields(start = %start, end = %end))]
    pub async fn list_all_filings(
        &self,
        issuer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<FilingRecord>> {
        let mut records = Vec::new();

        for page_no in 1..=self.settings.max_pages {
            let page = self.list_filings(issuer_id, start, end, page_no).await?;
            let exhausted = page.is_exhausted();
            records.extend(page.records);
            if exhausted {
                break;
            }
        }

        info!(issuer_id, count = records.len(), "filings listed");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::client_for;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn page_json(page_no: u32, total_page: u32, rows: &[(&str, &str, &str)]) -> String {
        let list: Vec<serde_json::Value> = rows
            .iter()
            .map(|(no, name, dt)| {
                serde_json::json!({
                    "corp_code": "00126380",
                    "corp_name": "삼성전자",
                    "stock_code": "005930",
                    "corp_cls": "Y",
                    "report_nm": name,
                    "rcept_no": no,
                    "flr_nm": "삼성전자",
                    "rcept_dt": dt,
                    "rm": ""
                })
            })
            .collect();

        serde_json::json!({
            "status": "000",
            "message": "정상",
            "page_no": page_no,
            "page_count": 10,
            "total_count": list.len(),
            "total_page": total_page,
            "list": list,
        })
        .to_string()
    }

    #[test]
    fn date_helpers() {
        assert_eq!(format_date(date("20240312")), "20240312");
        assert!(parse_date("2024-03-12").is_err());
        assert!(parse_date("20241340").is_err());
    }

    #[tokio::test]
    async fn lists_one_page() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/list.json"))
            .and(wiremock::matchers::query_param("corp_code", "00126380"))
            .and(wiremock::matchers::query_param("bgn_de", "20210101"))
            .and(wiremock::matchers::query_param("end_de", "20240101"))
            .and(wiremock::matchers::query_param("pblntf_ty", "A"))
            .and(wiremock::matchers::query_param("page_no", "1"))
            .and(wiremock::matchers::query_param("page_count", "10"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(page_json(
                1,
                1,
                &[
                    ("20231114000123", "분기보고서 (2023.09)", "20231114"),
                    ("20230314000456", "  사업보고서 (2022.12) ", "20230314"),
                ],
            )))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let page = client
            .list_filings("00126380", date("20210101"), date("20240101"), 1)
            .await
            .unwrap();

        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].receipt_id, "20231114000123");
        assert_eq!(page.records[1].title, "사업보고서 (2022.12)");
        assert_eq!(page.records[1].trading_id, "005930");
        assert!(page.is_exhausted());
    }

    #[tokio::test]
    async fn no_data_status_is_empty_page() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/list.json"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"status":"013","message":"조회된 데이타가 없습니다."}"#,
            ))
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_filings("00126380", date("20210101"), date("20240101"), 1)
            .await
            .unwrap();

        assert!(page.records.is_empty());
        assert!(page.is_exhausted());
    }

    #[tokio::test]
    async fn other_status_is_upstream_with_message() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/list.json"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                r#"{"status":"010","message":"등록되지 않은 키입니다."}"#,
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_filings("00126380", date("20210101"), date("20240101"), 1)
            .await
            .unwrap_err();

        match err {
            FilingLensError::Upstream(message) => assert!(message.contains("등록되지 않은 키입니다.")),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn inverted_range_fails_before_request() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::any())
            .respond_with(wiremock::ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_filings("00126380", date("20240101"), date("20210101"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FilingLensError::Validation { .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/list.json"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_filings("00126380", date("20210101"), date("20240101"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FilingLensError::Parse { .. }));
    }

    #[tokio::test]
    async fn follows_pages_until_exhausted() {
        let server = wiremock::MockServer::start().await;

        for (page_no, receipt) in [(1u32, "20230101000001"), (2, "20220101000002")] {
            wiremock::Mock::given(wiremock::matchers::method("GET"))
                .and(wiremock::matchers::path("/list.json"))
                .and(wiremock::matchers::query_param("page_no", page_no.to_string()))
                .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(page_json(
                    page_no,
                    2,
                    &[(receipt, "사업보고서", &receipt[..8])],
                )))
                .expect(1)
                .mount(&server)
                .await;
        }

        let records = client_for(&server)
            .list_all_filings("00126380", date("20210101"), date("20240101"))
            .await
            .unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.receipt_id.as_str()).collect();
        assert_eq!(ids, ["20230101000001", "20220101000002"]);
    }
}
