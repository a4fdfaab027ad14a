//! 일자별 수집 원장.
//!
//! 기준일자마다 한 행을 유지하며, 중단 후 재실행 시 `Completed`인 날짜만
//! 건너뜁니다. `Partial`과 `NoData`는 다음 실행에서 다시 조회합니다.

use crate::error::CoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 기준일자 수집 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    /// 모든 페이지 수집 완료
    Completed,
    /// 일부 페이지 실패 (재수집 대상)
    Partial,
    /// 조회 성공, 데이터 없음 (휴일 등)
    NoData,
}

impl CollectionStatus {
    /// DB 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::NoData => "no_data",
        }
    }

    /// 다음 실행에서 건너뛸 상태인지.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for CollectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "partial" => Ok(Self::Partial),
            "no_data" => Ok(Self::NoData),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// 수집 원장 한 행.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRecord {
    pub base_date: NaiveDate,
    pub total_count: i64,
    pub collected_count: i64,
    /// RFC 3339 로컬 시각
    pub collected_at: String,
    pub status: CollectionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            CollectionStatus::Completed,
            CollectionStatus::Partial,
            CollectionStatus::NoData,
        ] {
            assert_eq!(status.as_str().parse::<CollectionStatus>().unwrap(), status);
        }
        assert_eq!(
            "running".parse::<CollectionStatus>(),
            Err(CoreError::UnknownStatus("running".to_string()))
        );
    }

    #[test]
    fn test_only_completed_is_final() {
        assert!(CollectionStatus::Completed.is_final());
        assert!(!CollectionStatus::Partial.is_final());
        assert!(!CollectionStatus::NoData.is_final());
    }
}
