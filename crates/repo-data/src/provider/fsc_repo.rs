//! 금융위원회 REPO거래정보 Open API 클라이언트.
//!
//! 공공데이터포털(data.go.kr)의 `GetRepoTradInfoService/getCaseForTrad`
//! (건별거래조회) 엔드포인트를 기준일자 단위로 페이지 조회합니다.
//!
//! # 응답 형식
//!
//! ```json
//! {"response": {
//!   "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
//!   "body": {"numOfRows": 1000, "pageNo": 1, "totalCount": 2345,
//!            "items": {"item": [ {...}, {...} ]}}
//! }}
//! ```
//!
//! `items.item`은 배열, 단일 객체, 또는 (데이터가 없을 때) 빈 문자열일 수
//! 있습니다. 숫자 필드는 문자열/숫자 어느 쪽으로도 올 수 있습니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use repo_data::provider::fsc_repo::{FscApiSettings, FscRepoClient};
//!
//! let client = FscRepoClient::new(FscApiSettings::new("SERVICE_KEY"))?;
//! let page = client.fetch_page(base_date, 1, 1000).await?;
//! ```

use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use repo_core::{format_base_date, parse_base_date, RepoTrade, RepoTradePage};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// 건별거래조회 API 기본 URL.
pub const DEFAULT_BASE_URL: &str =
    "http://apis.data.go.kr/1160100/service/GetRepoTradInfoService/getCaseForTrad";

/// 정상 응답 결과 코드.
const SUCCESS_CODE: &str = "00";

/// 연결 확인용 페이지 크기.
const PING_PAGE_SIZE: u32 = 5;

/// 에러 메시지에 포함할 응답 본문 최대 길이 (문자 수).
const BODY_SNIPPET_CHARS: usize = 200;

/// API 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct FscApiSettings {
    /// 엔드포인트 URL
    pub base_url: String,
    /// 공공데이터포털 서비스키
    pub service_key: String,
    /// 요청당 타임아웃
    pub timeout: Duration,
    /// 총 시도 횟수 (최소 1)
    pub max_retries: u32,
    /// 재시도 간 대기
    pub retry_delay: Duration,
}

impl FscApiSettings {
    /// 기본값과 서비스키로 설정을 생성합니다.
    pub fn new(service_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            service_key: service_key.into(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// 기준일자별 REPO 거래 페이지 소스.
///
/// 수집 루프는 이 트레이트만 의존하므로 테스트에서 대체 구현을 쓸 수 있습니다.
#[async_trait]
pub trait RepoTradeSource: Send + Sync {
    /// 한 페이지 조회. 재시도 정책은 구현체가 책임집니다.
    async fn fetch_page(
        &self,
        base_date: NaiveDate,
        page_no: u32,
        num_rows: u32,
    ) -> Result<RepoTradePage>;
}

/// REPO거래정보 API 클라이언트.
#[derive(Clone)]
pub struct FscRepoClient {
    client: reqwest::Client,
    settings: FscApiSettings,
}

impl FscRepoClient {
    /// 새 클라이언트 생성.
    pub fn new(settings: FscApiSettings) -> Result<Self> {
        if settings.service_key.trim().is_empty() {
            return Err(DataError::ConfigError(
                "FSC API 서비스키가 비어 있습니다".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { client, settings })
    }

    /// 설정 조회.
    pub fn settings(&self) -> &FscApiSettings {
        &self.settings
    }

    /// 한 페이지 조회 (재시도 포함).
    ///
    /// 타임아웃, 전송 오류, HTTP 오류, 실패 결과 코드, 파싱 오류 모두
    /// `max_retries`회까지 시도하며, 마지막 오류를 반환합니다.
    pub async fn fetch_page(
        &self,
        base_date: NaiveDate,
        page_no: u32,
        num_rows: u32,
    ) -> Result<RepoTradePage> {
        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 1;

        loop {
            match self.request_page(base_date, page_no, num_rows).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < attempts => {
                    warn!(
                        base_date = %base_date,
                        page_no,
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "REPO API 요청 실패, 재시도"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(
                        base_date = %base_date,
                        page_no,
                        attempts,
                        error = %e,
                        "REPO API 요청 최종 실패"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// 연결 확인: 작은 페이지를 조회하여 해당 일자의 전체 건수를 반환합니다.
    pub async fn ping(&self, probe_date: NaiveDate) -> Result<u64> {
        let page = self.fetch_page(probe_date, 1, PING_PAGE_SIZE).await?;
        Ok(page.total_count)
    }

    /// 단일 요청 (재시도 없음).
    async fn request_page(
        &self,
        base_date: NaiveDate,
        page_no: u32,
        num_rows: u32,
    ) -> Result<RepoTradePage> {
        let bas_dt = format_base_date(base_date);
        let num_rows_str = num_rows.to_string();
        let page_no_str = page_no.to_string();

        debug!(base_date = %bas_dt, page_no, num_rows, "REPO API 요청");

        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&[
                ("serviceKey", self.settings.service_key.as_str()),
                ("numOfRows", num_rows_str.as_str()),
                ("pageNo", page_no_str.as_str()),
                ("resultType", "json"),
                ("basDt", bas_dt.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::FetchError(format!(
                "HTTP {} - {}",
                status,
                snippet(&body)
            )));
        }

        let text = response.text().await?;
        parse_page(&text, base_date, page_no, num_rows)
    }
}

#[async_trait]
impl RepoTradeSource for FscRepoClient {
    async fn fetch_page(
        &self,
        base_date: NaiveDate,
        page_no: u32,
        num_rows: u32,
    ) -> Result<RepoTradePage> {
        FscRepoClient::fetch_page(self, base_date, page_no, num_rows).await
    }
}

// =============================================================================
// 응답 파싱
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    response: Option<ApiResponse>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    header: ApiHeader,
    #[serde(default)]
    body: Option<ApiBody>,
}

#[derive(Debug, Deserialize)]
struct ApiHeader {
    #[serde(rename = "resultCode", default, deserialize_with = "lenient_string")]
    result_code: Option<String>,
    #[serde(rename = "resultMsg", default, deserialize_with = "lenient_string")]
    result_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBody {
    #[serde(rename = "totalCount", default, deserialize_with = "lenient_string")]
    total_count: Option<String>,
    #[serde(default)]
    items: Option<ItemsField>,
}

/// `items` 필드: `{"item": [...]}`, `{"item": {...}}`, 또는 `""`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemsField {
    Wrapped {
        #[serde(default)]
        item: Option<OneOrMany<RawRepoTrade>>,
    },
    Blank(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(v) => v,
            Self::One(t) => vec![t],
        }
    }
}

/// API 응답 원본 거래 항목 (전체 필드 매핑).
#[derive(Debug, Default, Deserialize)]
struct RawRepoTrade {
    #[serde(rename = "basDt", default, deserialize_with = "lenient_string")]
    bas_dt: Option<String>,
    #[serde(rename = "rpSqno", default, deserialize_with = "lenient_string")]
    rp_sqno: Option<String>,
    #[serde(rename = "rpBuyAplCurCd", default, deserialize_with = "lenient_string")]
    currency_code: Option<String>,
    #[serde(rename = "rpBuyAplCurCdNm", default, deserialize_with = "lenient_string")]
    currency_name: Option<String>,
    #[serde(rename = "rdptTermCcd", default, deserialize_with = "lenient_string")]
    term_code: Option<String>,
    #[serde(rename = "rdptTermCcdNm", default, deserialize_with = "lenient_string")]
    term_name: Option<String>,
    #[serde(rename = "rpRmngExprDcd", default, deserialize_with = "lenient_string")]
    remaining_expiry_code: Option<String>,
    #[serde(rename = "rpRmngExprDcdNm", default, deserialize_with = "lenient_string")]
    remaining_expiry_name: Option<String>,
    #[serde(rename = "rpInrt", default, deserialize_with = "lenient_string")]
    interest_rate: Option<String>,
    #[serde(rename = "slngShtrFinBzcDcd", default, deserialize_with = "lenient_string")]
    seller_sector_code: Option<String>,
    #[serde(rename = "slngShtrFinBzcDcdNm", default, deserialize_with = "lenient_string")]
    seller_sector_name: Option<String>,
    #[serde(rename = "buynShtrFinBzcDcd", default, deserialize_with = "lenient_string")]
    buyer_sector_code: Option<String>,
    #[serde(rename = "buynShtrFinBzcDcdNm", default, deserialize_with = "lenient_string")]
    buyer_sector_name: Option<String>,
    #[serde(rename = "rpOpngDt", default, deserialize_with = "lenient_string")]
    opening_date: Option<String>,
    #[serde(rename = "rpBuyAmt", default, deserialize_with = "lenient_string")]
    buy_amount: Option<String>,
    #[serde(rename = "rpMrgamRto", default, deserialize_with = "lenient_string")]
    margin_ratio: Option<String>,
    #[serde(rename = "scrsItmsKcd", default, deserialize_with = "lenient_string")]
    collateral_code: Option<String>,
    #[serde(rename = "scrsItmsKcdNm", default, deserialize_with = "lenient_string")]
    collateral_name: Option<String>,
    #[serde(rename = "isinCd", default, deserialize_with = "lenient_string")]
    isin_code: Option<String>,
    #[serde(rename = "isinCdNm", default, deserialize_with = "lenient_string")]
    isin_name: Option<String>,
    #[serde(rename = "buyScrtBuyAmt", default, deserialize_with = "lenient_string")]
    securities_buy_amount: Option<String>,
    #[serde(rename = "buyScrtEvlAmt", default, deserialize_with = "lenient_string")]
    securities_eval_amount: Option<String>,
}

impl RawRepoTrade {
    /// 도메인 거래로 변환.
    ///
    /// 일련번호가 없으면 키를 만들 수 없으므로 `None`. 기준일자가 없거나
    /// 잘못된 경우 요청한 기준일자를 사용합니다.
    fn into_trade(self, requested_date: NaiveDate) -> Option<RepoTrade> {
        let sequence_no = self.rp_sqno?;
        let base_date = self
            .bas_dt
            .as_deref()
            .and_then(|d| parse_base_date(d).ok())
            .unwrap_or(requested_date);

        Some(RepoTrade {
            base_date,
            sequence_no,
            currency_code: self.currency_code,
            currency_name: self.currency_name,
            term_code: self.term_code,
            term_name: self.term_name,
            remaining_expiry_code: self.remaining_expiry_code,
            remaining_expiry_name: self.remaining_expiry_name,
            interest_rate: parse_decimal_opt(&self.interest_rate),
            seller_sector_code: self.seller_sector_code,
            seller_sector_name: self.seller_sector_name,
            buyer_sector_code: self.buyer_sector_code,
            buyer_sector_name: self.buyer_sector_name,
            opening_date: self.opening_date,
            buy_amount: parse_decimal_opt(&self.buy_amount),
            margin_ratio: parse_decimal_opt(&self.margin_ratio),
            collateral_code: self.collateral_code,
            collateral_name: self.collateral_name,
            isin_code: self.isin_code,
            isin_name: self.isin_name,
            securities_buy_amount: parse_decimal_opt(&self.securities_buy_amount),
            securities_eval_amount: parse_decimal_opt(&self.securities_eval_amount),
        })
    }
}

/// 응답 본문을 페이지로 해석.
fn parse_page(
    text: &str,
    base_date: NaiveDate,
    page_no: u32,
    num_rows: u32,
) -> Result<RepoTradePage> {
    let envelope: ApiEnvelope = serde_json::from_str(text).map_err(|e| {
        DataError::ParseError(format!("JSON 파싱 실패: {} - {}", e, snippet(text)))
    })?;

    let response = envelope.response.ok_or_else(|| {
        DataError::ParseError(format!("response 필드 없음 - {}", snippet(text)))
    })?;

    let code = response.header.result_code.unwrap_or_default();
    if code != SUCCESS_CODE {
        return Err(DataError::ApiError {
            code,
            message: response.header.result_msg.unwrap_or_default(),
        });
    }

    let Some(body) = response.body else {
        return Ok(RepoTradePage {
            total_count: 0,
            page_no,
            num_of_rows: num_rows,
            trades: Vec::new(),
        });
    };

    let total_count = match body.total_count.as_deref() {
        Some(s) => s
            .parse::<u64>()
            .map_err(|_| DataError::ParseError(format!("totalCount 파싱 실패: {}", s)))?,
        None => 0,
    };

    let raw_items = match body.items {
        Some(ItemsField::Wrapped { item: Some(items) }) => items.into_vec(),
        _ => Vec::new(),
    };

    let raw_len = raw_items.len();
    let trades: Vec<RepoTrade> = raw_items
        .into_iter()
        .filter_map(|raw| raw.into_trade(base_date))
        .collect();

    if trades.len() < raw_len {
        warn!(
            base_date = %base_date,
            page_no,
            dropped = raw_len - trades.len(),
            "일련번호(rpSqno) 없는 항목 제외"
        );
    }

    Ok(RepoTradePage {
        total_count,
        page_no,
        num_of_rows: num_rows,
        trades,
    })
}

/// 문자열/숫자/null 어느 쪽이든 `Option<String>`으로 받습니다.
///
/// 빈 문자열과 공백은 `None`입니다.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// 금액/금리 문자열 파싱 (쉼표, % 제거).
fn parse_decimal_opt(s: &Option<String>) -> Option<Decimal> {
    let raw = s.as_deref()?.trim();
    if raw.is_empty() || raw == "-" {
        return None;
    }
    let cleaned = raw.replace([',', '%'], "");
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// 에러 메시지용 본문 앞부분.
fn snippet(text: &str) -> String {
    text.chars().take(BODY_SNIPPET_CHARS).collect()
}
