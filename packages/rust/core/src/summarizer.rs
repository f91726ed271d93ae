//! Gemini-backed [`Summarizer`].
//!
//! Calls the Generative Language REST API (`models/{model}:generateContent`)
//! with an analyst prompt wrapped around the corpus. Failures never reach the
//! pipeline: they are logged and replaced by [`FALLBACK_MESSAGE`].

use std::time::Duration;

use filinglens_shared::{FilingLensError, GeminiConfig, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::sources::Summarizer;

/// Returned in place of an analysis when the model call fails.
pub const FALLBACK_MESSAGE: &str =
    "AI 분석 서비스가 일시적으로 원활하지 않습니다. 잠시 후 다시 시도해 주세요.";

/// Generation method a model must support to be usable here.
const GENERATE_METHOD: &str = "generateContent";

const USER_AGENT: &str = concat!("FilingLens/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiSettings {
    pub fn from_config(config: &GeminiConfig, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// One entry of the model listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-2.0-flash`.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Name without the `models/` prefix, as used in config.
    pub fn id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Build the analyst prompt for one issuer.
pub fn build_prompt(corpus: &str, display_name: &str, trading_id: &str) -> String {
    format!(
        "당신은 20년 경력의 기업 분석가입니다. 아래 정기공시 발췌문을 읽고 개인 투자자가 \
놓치기 쉬운 리스크와 핵심 투자 포인트를 정리해 주세요.

분석 대상: {display_name} ({trading_id})
자료 구성: 최근 1년은 분기/반기 보고서, 최근 3년은 사업보고서 (오래된 순)

각 항목마다 보고서의 수치와 섹션명을 인용하여 Markdown으로 답하세요.

### 1. 비즈니스 모델
- 매출 비중이 가장 큰 핵심 제품은 무엇입니까?
- 원재료 가격과 제품 가격의 추이를 비교해 원가 상승을 판가에 전가할 수 있는 가격 결정력이 있는지 판단하세요.

### 2. 재무 건전성
- 최근 3년간 매출액과 영업이익률의 추세는 개선, 정체, 악화 중 어디에 해당합니까?
- 영업활동 현금흐름이 당기순이익보다 큽니까? 현금흐름이 음수이거나 순이익에 크게 못 미치면 이익의 질 또는 매출채권 회수 지연 가능성을 경고하세요.

### 3. 자금 조달 및 오버행 리스크
- 자본금 변동사항과 사채 관련 주석을 근거로 미상환 전환사채(CB), 신주인수권부사채(BW), 교환사채(EB) 잔액을 밝히세요.
- 전환가액, 전환청구 가능 기간, 리픽싱 조항 적용 여부를 확인하세요.
- 미상환 잔액이 시가총액 대비 어느 정도의 희석 부담인지 평가하세요.

### 4. 종합 결론
- 가장 확실한 상승 요인 1가지와 가장 치명적인 하락 요인 1가지를 고르세요.
- 최종적으로 '적극 매수', '관망', '매도(리스크 관리)' 중 어디에 가까운지 평가하세요.

---
[보고서 데이터]
{corpus}
"
    )
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    http: Client,
    settings: GeminiSettings,
}

impl GeminiSummarizer {
    pub fn new(settings: GeminiSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                FilingLensError::Upstream(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { http, settings })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Send one prompt and return the concatenated candidate text.
    #[instrument(skip_all, fields(model = %self.settings.model, prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:{GENERATE_METHOD}",
            self.settings.base_url, self.settings.model
        );
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| FilingLensError::Upstream(format!("gemini: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(FilingLensError::Upstream(format!(
                "gemini: HTTP {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| FilingLensError::parse(format!("gemini response: {}", e.without_url())))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(FilingLensError::NoContent("model returned no text".into()));
        }

        debug!(chars = text.len(), "generation complete");
        Ok(text)
    }

    /// List models that support `generateContent`, following pagination.
    #[instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.settings.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .query(&[("key", self.settings.api_key.as_str()), ("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| FilingLensError::Upstream(format!("gemini: {}", e.without_url())))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FilingLensError::Upstream(format!(
                    "gemini models: HTTP {status}"
                )));
            }

            let page: ModelList = response.json().await.map_err(|e| {
                FilingLensError::parse(format!("gemini models: {}", e.without_url()))
            })?;

            models.extend(page.models.into_iter().filter(|m| {
                m.supported_generation_methods
                    .iter()
                    .any(|method| method == GENERATE_METHOD)
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        info!(count = models.len(), "models listed");
        Ok(models)
    }
}

impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, corpus: &str, display_name: &str, trading_id: &str) -> String {
        let prompt = build_prompt(corpus, display_name, trading_id);
        match self.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, issuer = display_name, "summarizer failed, returning fallback");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}
