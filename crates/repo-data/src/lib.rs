//! REPO 거래 데이터 소스 및 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 금융위원회 REPO거래정보 Open API 클라이언트 (재시도 포함)
//! - SQLite 거래 테이블 및 수집 원장 저장소
//! - 일별 금리 테이블 읽기/쓰기

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

// 데이터 소스 재내보내기
pub use provider::fsc_repo::{FscApiSettings, FscRepoClient, RepoTradeSource, DEFAULT_BASE_URL};

// 저장소 재내보내기
pub use storage::rates::{read_daily_rates, write_daily_rates, DAILY_RATES_TABLE};
pub use storage::repo_store::{RepoStore, StoreStats, VwapFilter, TRADE_COLUMNS};
pub use storage::open_sqlite;
