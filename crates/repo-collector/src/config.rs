//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono::{Datelike, Local, NaiveDate};
use repo_core::parse_base_date;
use repo_data::{FscApiSettings, DEFAULT_BASE_URL};
use std::time::Duration;

/// 기본 데이터베이스 위치
pub const DEFAULT_DATABASE_URL: &str = "sqlite://repo_trades.db";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL 또는 파일 경로
    pub database_url: String,
    /// Open API 설정
    pub api: ApiConfig,
    /// 거래 수집 설정
    pub collect: CollectConfig,
    /// 일별 금리 계산 설정
    pub rates: RatesConfig,
}

/// 금융위원회 Open API 설정
#[derive(Clone)]
pub struct ApiConfig {
    /// 엔드포인트 URL
    pub base_url: String,
    /// 공공데이터포털 서비스 키 (API를 쓰는 명령에서만 필요)
    pub service_key: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 요청당 최대 시도 횟수
    pub max_retries: u32,
    /// 재시도 간 대기 (밀리초)
    pub retry_delay_ms: u64,
    /// 연결 점검용 기준일자 (YYYYMMDD)
    pub probe_date: String,
}

/// 거래 수집 설정
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// 페이지당 행 수
    pub page_size: u32,
    /// 페이지 요청 간 딜레이 (밀리초)
    pub page_delay_ms: u64,
    /// 영업일 간 딜레이 (밀리초)
    pub date_delay_ms: u64,
    /// 수집 시작 날짜 (YYYYMMDD)
    pub start_date: Option<String>,
    /// 수집 종료 날짜 (YYYYMMDD)
    pub end_date: Option<String>,
}

/// 일별 금리 계산 필터 설정
#[derive(Debug, Clone)]
pub struct RatesConfig {
    /// 매입적용통화코드명
    pub currency_name: String,
    /// 환매기간구분코드명
    pub term_name: String,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env_var_string("REPO_DATABASE_URL", DEFAULT_DATABASE_URL),
            api: ApiConfig {
                base_url: env_var_string("FSC_API_BASE_URL", DEFAULT_BASE_URL),
                service_key: std::env::var("FSC_SERVICE_KEY")
                    .ok()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty()),
                timeout_secs: env_var_parse("FSC_TIMEOUT_SECS", 60),
                max_retries: env_var_parse("FSC_MAX_RETRIES", 3),
                retry_delay_ms: env_var_parse("FSC_RETRY_DELAY_MS", 2000),
                probe_date: env_var_string("COLLECT_PROBE_DATE", "20241220"),
            },
            collect: CollectConfig {
                page_size: env_var_parse("COLLECT_PAGE_SIZE", 1000),
                page_delay_ms: env_var_parse("COLLECT_PAGE_DELAY_MS", 500),
                date_delay_ms: env_var_parse("COLLECT_DATE_DELAY_MS", 500),
                start_date: std::env::var("COLLECT_START_DATE").ok(),
                end_date: std::env::var("COLLECT_END_DATE").ok(),
            },
            rates: RatesConfig {
                currency_name: env_var_string("RATES_CURRENCY_NAME", "대한민국 원"),
                term_name: env_var_string("RATES_TERM_NAME", "1영업일"),
            },
        })
    }
}

impl ApiConfig {
    /// 클라이언트 설정으로 변환. 서비스 키가 없으면 설정 에러.
    pub fn settings(&self) -> Result<FscApiSettings> {
        let service_key = self.service_key.clone().ok_or_else(|| {
            CollectorError::Config("FSC_SERVICE_KEY 환경변수가 설정되지 않았습니다".to_string())
        })?;

        Ok(FscApiSettings {
            base_url: self.base_url.clone(),
            service_key,
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        })
    }

    /// 연결 점검용 기준일자
    pub fn probe_date(&self) -> Result<NaiveDate> {
        Ok(parse_base_date(&self.probe_date)?)
    }
}

// 서비스 키가 로그에 남지 않도록 Debug를 직접 구현
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &self.service_key.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("probe_date", &self.probe_date)
            .finish()
    }
}

impl CollectConfig {
    /// 페이지 요청 간 딜레이를 Duration으로 반환
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// 영업일 간 딜레이를 Duration으로 반환
    pub fn date_delay(&self) -> Duration {
        Duration::from_millis(self.date_delay_ms)
    }

    /// 수집 기간 결정.
    ///
    /// 우선순위는 인자 > 환경변수 > 기본값(올해 1월 1일 ~ 오늘)입니다.
    pub fn date_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let today = Local::now().date_naive();

        let start = match (from, &self.start_date) {
            (Some(date), _) => date,
            (None, Some(s)) => parse_base_date(s)?,
            (None, None) => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        let end = match (to, &self.end_date) {
            (Some(date), _) => date,
            (None, Some(s)) => parse_base_date(s)?,
            (None, None) => today,
        };

        Ok((start, end))
    }
}

/// 환경변수 문자열 (없거나 비어 있으면 기본값)
fn env_var_string(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
