//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 값 해석 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 기준일자 형식 오류 (YYYYMMDD 기대)
    #[error("잘못된 기준일자: {0}")]
    InvalidDate(String),

    /// 알 수 없는 수집 상태 문자열
    #[error("알 수 없는 수집 상태: {0}")]
    UnknownStatus(String),

    /// 로깅 초기화 실패 (잘못된 필터, 중복 초기화)
    #[error("로깅 초기화 실패: {0}")]
    Logging(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
