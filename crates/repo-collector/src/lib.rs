//! 금융위원회 REPO 거래 수집기.
//!
//! 이 crate는 공공데이터포털 REPO 거래정보 API를 SQLite에 적재하는 바이너리와
//! 파생 작업을 제공합니다:
//! - 기준일자별 거래 수집 (주말/완료일 건너뜀, 중단 후 재개)
//! - 일별 가중평균(VWAP) 금리 테이블 생성 및 병합
//! - CSV 내보내기, 임의 SQL 조회

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
